//! Relay server holding the removal and payment provider credentials

#[cfg(all(feature = "cli", feature = "server"))]
use bgremove_relay::cli;

#[cfg(all(feature = "cli", feature = "server"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::relay_main().await
}

#[cfg(not(all(feature = "cli", feature = "server")))]
fn main() {
    panic!("Relay needs the cli and server features. Please rebuild with --features cli,server");
}
