//! Market monitor service
//!
//! Wires the provider, the poller, the sales tracker and the log tailer into
//! two background tasks that share one announcement dispatcher.

use crate::{
    command::CommandParser,
    config::MonitorConfig,
    dispatcher::AnnouncementDispatcher,
    error::{FileAccessError, ProviderError},
    poller::{MarketPoller, QuoteResult},
    provider::MarketDataProvider,
    providers::TlpAuctionsProvider,
    tailer::LogTailer,
    tracker::{sleep_or_cancel, SalesTracker, TrackingSession},
    types::MonitorEvent,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Handle to a running background task
pub struct TaskHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Asks the task to stop at its next checkpoint
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the task and waits for it to finish
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Monitor task panicked");
        }
    }
}

/// Market monitor
///
/// # Example
/// ```no_run
/// use eq_market_monitor::{AnnouncementDispatcher, LogSpeaker, MarketMonitor, MonitorConfig, Speaker};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let dispatcher =
///     AnnouncementDispatcher::start(|| Ok(Box::new(LogSpeaker) as Box<dyn Speaker>));
/// let monitor = MarketMonitor::from_config(MonitorConfig::from_env(), dispatcher)?;
///
/// let tracking = monitor.start_sales_tracking(["Cloak of Flames", "Jboots"]);
/// let commands = monitor.start_log_monitoring("eqlog_Soandso_teek.txt").await?;
///
/// tokio::signal::ctrl_c().await?;
/// tracking.stop().await;
/// commands.stop().await;
/// monitor.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct MarketMonitor {
    config: MonitorConfig,
    provider: Arc<dyn MarketDataProvider>,
    poller: MarketPoller,
    dispatcher: AnnouncementDispatcher,
    events: broadcast::Sender<MonitorEvent>,
}

impl MarketMonitor {
    /// Creates a monitor backed by the live auction service
    pub fn from_config(
        config: MonitorConfig,
        dispatcher: AnnouncementDispatcher,
    ) -> Result<Self, ProviderError> {
        let provider = Arc::new(TlpAuctionsProvider::new(&config)?);
        Ok(Self::with_provider(config, provider, dispatcher))
    }

    /// Creates a monitor with a custom provider
    pub fn with_provider(
        config: MonitorConfig,
        provider: Arc<dyn MarketDataProvider>,
        dispatcher: AnnouncementDispatcher,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            poller: MarketPoller::new(provider.clone()),
            provider,
            dispatcher,
            events,
        }
    }

    /// Receives every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Runs a single price check and announces the result
    pub async fn price_check(&self, item_name: &str) -> Result<QuoteResult, ProviderError> {
        run_price_check(&self.poller, &self.dispatcher, &self.events, item_name).await
    }

    /// Starts a fresh tracking session over `names` in the background
    pub fn start_sales_tracking<I, S>(&self, names: I) -> TaskHandle
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let session = TrackingSession::new(names);
        let tracker = SalesTracker::new(
            self.provider.clone(),
            self.dispatcher.clone(),
            self.events.clone(),
            &self.config,
        );
        let token = CancellationToken::new();
        let handle = tokio::spawn(tracker.run(session, token.clone()));

        TaskHandle { token, handle }
    }

    /// Opens `path` and starts answering price check commands written to it
    ///
    /// The file is opened before this returns, so an unreadable path is
    /// reported to the caller instead of the background task.
    pub async fn start_log_monitoring(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<TaskHandle, FileAccessError> {
        let tailer = LogTailer::open(path).await?;
        let parser = CommandParser::new(self.config.command_marker.clone());
        let token = CancellationToken::new();

        let handle = tokio::spawn(run_log_monitor(
            tailer,
            parser,
            self.poller.clone(),
            self.dispatcher.clone(),
            self.events.clone(),
            self.config.tail_poll_interval,
            token.clone(),
        ));

        Ok(TaskHandle { token, handle })
    }

    /// Drains pending announcements and releases the speech engine
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}

async fn run_price_check(
    poller: &MarketPoller,
    dispatcher: &AnnouncementDispatcher,
    events: &broadcast::Sender<MonitorEvent>,
    item_name: &str,
) -> Result<QuoteResult, ProviderError> {
    match poller.check(item_name).await {
        Ok(result) => {
            if let Err(e) = dispatcher.announce(poller.announcement_text(&result)) {
                tracing::warn!(item = %item_name, error = %e, "Could not queue price announcement");
            }
            let event = match &result {
                QuoteResult::Found(report) => MonitorEvent::quote_checked(report.clone()),
                QuoteResult::Empty { item_name } => MonitorEvent::quote_empty(item_name),
            };
            let _ = events.send(event);
            Ok(result)
        }
        Err(e) => {
            tracing::error!(item = %item_name, error = %e, "Price check failed");
            let _ = events.send(MonitorEvent::check_failed(item_name, &e));
            Err(e)
        }
    }
}

async fn run_log_monitor(
    mut tailer: LogTailer,
    parser: CommandParser,
    poller: MarketPoller,
    dispatcher: AnnouncementDispatcher,
    events: broadcast::Sender<MonitorEvent>,
    poll_interval: std::time::Duration,
    token: CancellationToken,
) {
    tracing::info!(path = %tailer.path().display(), "Starting log monitoring");

    while !token.is_cancelled() {
        let line = match tailer.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                if !sleep_or_cancel(poll_interval, &token).await {
                    break;
                }
                continue;
            }
            Err(e) => {
                tracing::error!(error = %e, "Log read failed");
                if !sleep_or_cancel(poll_interval, &token).await {
                    break;
                }
                continue;
            }
        };

        let Some(item_name) = parser.parse(&line) else {
            continue;
        };
        tracing::info!(item = %item_name, "Price check requested");

        // Errors are already logged and published
        let _ = run_price_check(&poller, &dispatcher, &events, item_name).await;
    }

    tracing::info!(path = %tailer.path().display(), "Log monitoring cancelled");
}
