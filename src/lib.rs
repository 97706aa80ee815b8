//! # EQ Market Monitor
//!
//! Watches an auction house for you while you play:
//!
//! - **Sales tracking**: polls the sales log for a list of items and announces
//!   each sale once, ignoring anything that sold before tracking started.
//! - **Log-driven price checks**: tails the game log and answers
//!   `!pc <item>` commands with the current average and lowest asking price.
//! - **Spoken alerts**: every announcement goes through one queue, so alerts
//!   never talk over each other.
//!
//! Prices are stored in the lower denomination and displayed in mixed form
//! (`2 krono 500 platinum`) using the exchange rate fetched right before
//! formatting.
//!
//! ## Usage
//!
//! ```no_run
//! use eq_market_monitor::{AnnouncementDispatcher, CommandSpeaker, MarketMonitor, MonitorConfig, Speaker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = AnnouncementDispatcher::start(|| {
//!     Ok(Box::new(CommandSpeaker::from_command_line("espeak")?) as Box<dyn Speaker>)
//! });
//! let monitor = MarketMonitor::from_config(MonitorConfig::from_env(), dispatcher)?;
//!
//! // One-shot check
//! monitor.price_check("Cloak of Flames").await?;
//!
//! // Background tasks
//! let tracking = monitor.start_sales_tracking(["Cloak of Flames"]);
//! tokio::signal::ctrl_c().await?;
//! tracking.stop().await;
//! monitor.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! LogTailer ──► CommandParser ──► MarketPoller ──┐
//!                                                ├──► AnnouncementDispatcher ──► Speaker
//! SalesTracker (polls every pass) ───────────────┘
//!        │                 │
//!        └──── MarketDataProvider (rate, quotes, sales) ────┘
//! ```
//!
//! ## Error Handling
//!
//! Upstream and file errors never stop a background task: they are logged,
//! published as [`MonitorEvent::CheckFailed`] where an item is involved, and
//! the loop moves on to the next item or line.

pub mod command;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod logging;
pub mod monitor;
pub mod poller;
pub mod provider;
pub mod providers;
pub mod speech;
pub mod tailer;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use command::CommandParser;
pub use config::MonitorConfig;
pub use dispatcher::AnnouncementDispatcher;
pub use error::{DispatchError, FileAccessError, ProviderError, SpeechError};
pub use format::{format_price, MixedAmount, PriceFormatter};
pub use monitor::{MarketMonitor, TaskHandle};
pub use poller::{MarketPoller, QuoteResult};
pub use provider::MarketDataProvider;
pub use providers::TlpAuctionsProvider;
pub use speech::{CommandSpeaker, LogSpeaker, Speaker};
pub use tailer::LogTailer;
pub use tracker::{SalesTracker, TrackingSession};
pub use types::{
    AnnouncementRequest, Auction, ExchangeRate, MonitorEvent, QuoteReport, SaleEvent, SaleId,
    TrackedItem,
};
