//! EQ Market Monitor CLI

use anyhow::Context;
use clap::{Parser, Subcommand};
use eq_market_monitor::{
    logging::{init_logging, LogFormat},
    AnnouncementDispatcher, CommandSpeaker, LogSpeaker, MarketDataProvider, MarketMonitor,
    MonitorConfig, Speaker, TlpAuctionsProvider,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "eq-market-monitor")]
#[command(about = "Spoken auction alerts: sales tracking and log-driven price checks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server the auction data is scoped to
    #[arg(long, global = true)]
    server: Option<String>,

    /// Auction service base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Console log format (pretty or json)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Track sales and answer price checks until Ctrl-C
    Run {
        /// Game log file to watch for `!pc <item>` commands
        #[arg(short, long)]
        log_file: Option<PathBuf>,

        /// Item to watch in the sales log (repeatable)
        #[arg(short, long = "track")]
        track: Vec<String>,

        /// TTS command line, e.g. "espeak -s 160"; announcements are only logged when omitted
        #[arg(short, long)]
        speech_command: Option<String>,
    },
    /// Check current prices for one item
    PriceCheck {
        /// Item name
        item: String,
    },
    /// Show the current exchange rate
    Rate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging("info", cli.log_format);

    let mut config = MonitorConfig::from_env();
    if let Some(server) = cli.server {
        config.server_name = server;
    }
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_string();
    }

    match cli.command {
        Commands::Run {
            log_file,
            track,
            speech_command,
        } => run(config, log_file, track, speech_command).await,
        Commands::PriceCheck { item } => {
            let dispatcher = log_only_dispatcher();
            let monitor = MarketMonitor::from_config(config, dispatcher)?;
            let result = monitor.price_check(&item).await;
            monitor.shutdown().await;
            result.map(|_| ()).context("price check failed")
        }
        Commands::Rate => {
            let provider = TlpAuctionsProvider::new(&config)?;
            let rate = provider.fetch_rate().await.context("rate lookup failed")?;
            tracing::info!(server = %config.server_name, "1 krono = {} platinum", rate);
            Ok(())
        }
    }
}

async fn run(
    config: MonitorConfig,
    log_file: Option<PathBuf>,
    track: Vec<String>,
    speech_command: Option<String>,
) -> anyhow::Result<()> {
    if log_file.is_none() && track.is_empty() {
        anyhow::bail!("nothing to do: pass --log-file and/or at least one --track item");
    }

    let dispatcher = match speech_command {
        Some(command_line) => AnnouncementDispatcher::start(move || {
            Ok(Box::new(CommandSpeaker::from_command_line(&command_line)?) as Box<dyn Speaker>)
        }),
        None => log_only_dispatcher(),
    };
    let monitor = MarketMonitor::from_config(config, dispatcher)?;

    let mut tasks = Vec::new();
    if !track.is_empty() {
        tasks.push(monitor.start_sales_tracking(&track));
    }
    if let Some(path) = log_file {
        tasks.push(monitor.start_log_monitoring(&path).await?);
    }

    tracing::info!(provider = monitor.provider_name(), "Monitoring, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down");
    for task in tasks {
        task.stop().await;
    }
    monitor.shutdown().await;
    Ok(())
}

fn log_only_dispatcher() -> AnnouncementDispatcher {
    AnnouncementDispatcher::start(|| Ok(Box::new(LogSpeaker) as Box<dyn Speaker>))
}
