//! Background removal client
//!
//! Removes the background of one image through the free API or, after
//! payment, through the relay server.

#[cfg(feature = "cli")]
use bgremove_relay::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
