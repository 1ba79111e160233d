//! Background removal client
//!
//! Stages one image, removes its background through the chosen tier and
//! saves the result to the download directory.

use super::checkout::TerminalCheckout;
use super::config::CliConfigBuilder;
use super::progress::IndicatifProgressReporter;
use crate::{
    client::SubmissionClient,
    config::{Tier, DEFAULT_RELAY_URL},
    payment::{PaymentInitiator, RelayClient},
    processor::{DirectoryDownloadSink, RemovalProcessor},
    services::{time_taken_label, ConsoleProgressReporter, NoOpProgressReporter, ProgressReporter},
    tracing_config::{init_cli_tracing, spans},
};
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

/// Remove the background of an image through the free API or the paid relay
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove")]
pub struct Cli {
    /// Image to process
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Processing tier
    #[arg(short, long, value_enum, default_value_t = Tier::Free)]
    pub tier: Tier,

    /// Directory the result is saved to [default: the user's download directory]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// API key of the free removal API
    #[arg(long, env = "BGREMOVE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// URL of the free removal API
    #[arg(long, env = "BGREMOVE_API_URL")]
    pub api_url: Option<String>,

    /// Base URL of the relay server
    #[arg(long, env = "BGREMOVE_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    pub relay_url: String,

    /// Public checkout key id shown to the payment widget
    #[arg(long, default_value = "")]
    pub checkout_key: String,

    /// Payment id returned by the checkout (prompted for when missing)
    #[arg(long)]
    pub payment_id: Option<String>,

    /// Order id returned by the checkout [default: the order the relay created]
    #[arg(long)]
    pub order_id: Option<String>,

    /// Signature returned by the checkout (prompted for when missing)
    #[arg(long)]
    pub signature: Option<String>,

    /// JPEG quality of free-tier uploads (0-100)
    #[arg(long, default_value_t = 95)]
    pub jpeg_quality: u8,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    let client = SubmissionClient::new(config.clone()).context("Failed to create HTTP client")?;
    let sink = match &cli.output_dir {
        Some(dir) => DirectoryDownloadSink::new(dir.clone()),
        None => DirectoryDownloadSink::default_location(),
    };
    info!("Saving results to {}", sink.dir().display());

    let reporter: Arc<dyn ProgressReporter> = if cli.quiet {
        Arc::new(NoOpProgressReporter)
    } else if std::io::stderr().is_terminal() {
        Arc::new(IndicatifProgressReporter::new())
    } else {
        // Redirected output gets log lines instead of a redrawn bar
        Arc::new(ConsoleProgressReporter::new(cli.verbose > 0))
    };

    let mut processor = RemovalProcessor::new(client, Arc::new(sink)).with_progress_reporter(reporter);
    if cli.tier == Tier::Premium {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;
        let widget = TerminalCheckout {
            payment_id: cli.payment_id.clone(),
            order_id: cli.order_id.clone(),
            signature: cli.signature.clone(),
        };
        processor = processor.with_payment(PaymentInitiator::new(
            RelayClient::new(http, &config),
            Arc::new(widget),
            &config,
        ));
    }

    processor
        .stage_path(&cli.input)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;

    let span = spans::session(&session_id, &cli.tier.to_string());
    match processor.run(cli.tier).instrument(span).await {
        Ok(outcome) => {
            println!(
                "✅ Saved {} ({}x{} upload). {}",
                outcome.download.display(),
                outcome.width,
                outcome.height,
                time_taken_label(outcome.elapsed)
            );
            Ok(())
        },
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e.user_message());
            Err(e).context("Background removal failed")
        },
    }
}
