//! Sales tracking
//!
//! Polls the sales log for every item on a watch list and announces each
//! sale once. Only sales that happen after the session starts are reported.

use crate::{
    config::MonitorConfig,
    dispatcher::AnnouncementDispatcher,
    provider::MarketDataProvider,
    types::{MonitorEvent, SaleEvent, SaleId, TrackedItem},
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// State of one tracking run
///
/// The watch list is fixed at creation. Starting over means building a new
/// session, which also resets the processed ids and the start time.
#[derive(Debug)]
pub struct TrackingSession {
    start_time: DateTime<Utc>,
    watch_list: Arc<[TrackedItem]>,
    processed: HashSet<SaleId>,
}

impl TrackingSession {
    /// Starts a session now
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_start_time(names, Utc::now())
    }

    /// Starts a session with an explicit low-water mark
    pub fn with_start_time<I, S>(names: I, start_time: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut watch_list: Vec<TrackedItem> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || watch_list.iter().any(|item| item.name == name) {
                continue;
            }
            watch_list.push(TrackedItem::new(name));
        }

        Self {
            start_time,
            watch_list: watch_list.into(),
            processed: HashSet::new(),
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn watch_list(&self) -> &[TrackedItem] {
        &self.watch_list
    }

    /// Number of sales announced so far
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Records `sale` and returns true if it has not been seen and is newer
    /// than the session start
    pub fn admit(&mut self, sale: &SaleEvent) -> bool {
        if sale.occurred_at <= self.start_time {
            return false;
        }
        self.processed.insert(sale.id.clone())
    }
}

/// Result of one pass over the watch list
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub items_polled: usize,
    pub items_failed: usize,
    pub sales_announced: usize,
    pub cancelled: bool,
}

/// Sleeps for `duration` unless `token` fires first
///
/// Returns false when cancelled.
pub(crate) async fn sleep_or_cancel(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Drives the sales polling loop
pub struct SalesTracker {
    provider: Arc<dyn MarketDataProvider>,
    dispatcher: AnnouncementDispatcher,
    events: broadcast::Sender<MonitorEvent>,
    item_delay: Duration,
    pass_delay: Duration,
}

impl SalesTracker {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        dispatcher: AnnouncementDispatcher,
        events: broadcast::Sender<MonitorEvent>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            events,
            item_delay: config.item_delay,
            pass_delay: config.pass_delay,
        }
    }

    /// Polls every watched item once
    ///
    /// A failing item is logged and skipped; the rest of the pass continues.
    pub async fn run_pass(
        &self,
        session: &mut TrackingSession,
        token: &CancellationToken,
    ) -> PassSummary {
        let mut summary = PassSummary::default();
        let items = session.watch_list.clone();

        for (index, item) in items.iter().enumerate() {
            if index > 0 && !sleep_or_cancel(self.item_delay, token).await {
                summary.cancelled = true;
                return summary;
            }
            if token.is_cancelled() {
                summary.cancelled = true;
                return summary;
            }

            let result = self.provider.fetch_sales(&item.name).await;

            // The request may have been in flight when cancellation arrived
            if token.is_cancelled() {
                summary.cancelled = true;
                return summary;
            }
            summary.items_polled += 1;

            match result {
                Ok(sales) => {
                    for sale in sales {
                        if session.admit(&sale) {
                            self.announce_sale(sale);
                            summary.sales_announced += 1;
                        }
                    }
                }
                Err(e) => {
                    summary.items_failed += 1;
                    tracing::warn!(item = %item.name, error = %e, "Sales poll failed");
                    let _ = self.events.send(MonitorEvent::check_failed(&item.name, &e));
                }
            }
        }

        summary
    }

    fn announce_sale(&self, sale: SaleEvent) {
        tracing::info!(
            item = %sale.item_name,
            auctioneer = %sale.auctioneer,
            sale_id = %sale.id,
            occurred_at = %sale.occurred_at,
            "Item sold"
        );

        if let Err(e) = self.dispatcher.announce(format!("{} sold", sale.item_name)) {
            tracing::warn!(item = %sale.item_name, error = %e, "Could not queue sale announcement");
        }
        let _ = self.events.send(MonitorEvent::sale_detected(sale));
    }

    /// Runs passes until `token` is cancelled
    pub async fn run(self, mut session: TrackingSession, token: CancellationToken) {
        tracing::info!(
            provider = self.provider.provider_name(),
            items = session.watch_list().len(),
            start_time = %session.start_time(),
            item_delay_ms = self.item_delay.as_millis() as u64,
            pass_delay_secs = self.pass_delay.as_secs(),
            "Starting sales tracking"
        );

        loop {
            let summary = self.run_pass(&mut session, &token).await;
            if summary.cancelled {
                break;
            }
            tracing::debug!(
                polled = summary.items_polled,
                failed = summary.items_failed,
                announced = summary.sales_announced,
                processed_total = session.processed_count(),
                "Tracking pass complete"
            );

            if !sleep_or_cancel(self.pass_delay, &token).await {
                break;
            }
        }

        tracing::info!(
            announced = session.processed_count(),
            "Sales tracking cancelled"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::testing::RecordingSpeaker;
    use crate::error::ProviderError;
    use crate::provider::mock::MockProvider;
    use crate::providers::tlp::parse_sales_log;
    use chrono::{Duration as ChronoDuration, FixedOffset, TimeZone};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn sale(id: &str, item: &str, occurred_at: DateTime<Utc>) -> SaleEvent {
        SaleEvent {
            id: SaleId::new(id),
            item_name: item.to_string(),
            auctioneer: "Soandso".to_string(),
            occurred_at,
        }
    }

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            item_delay: Duration::ZERO,
            pass_delay: Duration::ZERO,
            ..MonitorConfig::default()
        }
    }

    fn tracker(
        provider: Arc<MockProvider>,
        speaker: &RecordingSpeaker,
        config: &MonitorConfig,
    ) -> (SalesTracker, AnnouncementDispatcher) {
        let dispatcher = AnnouncementDispatcher::start(speaker.factory());
        let (events, _) = broadcast::channel(64);
        (
            SalesTracker::new(provider, dispatcher.clone(), events, config),
            dispatcher,
        )
    }

    #[test]
    fn test_watch_list_dedup_and_blanks() {
        let session = TrackingSession::new([
            "Cloak of Flames",
            "",
            "  ",
            "cloak of flames",
            "Cloak of Flames",
        ]);
        let names: Vec<&str> = session.watch_list().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Cloak of Flames", "cloak of flames"]);
    }

    #[test]
    fn test_admit_filters_old_and_repeated() {
        let start = Utc::now();
        let mut session = TrackingSession::with_start_time(["Cloak of Flames"], start);

        assert!(!session.admit(&sale("1", "Cloak of Flames", start - ChronoDuration::minutes(5))));
        assert!(!session.admit(&sale("2", "Cloak of Flames", start)));
        assert!(session.admit(&sale("3", "Cloak of Flames", start + ChronoDuration::seconds(1))));
        assert!(!session.admit(&sale("3", "Cloak of Flames", start + ChronoDuration::seconds(1))));
        assert_eq!(session.processed_count(), 1);
    }

    #[tokio::test]
    async fn test_historical_sales_not_announced_on_first_poll() {
        let start = Utc::now();
        let provider = Arc::new(MockProvider::new());
        provider.set_sales(
            "Cloak of Flames",
            Ok(vec![
                sale("old", "Cloak of Flames", start - ChronoDuration::hours(3)),
                sale("edge", "Cloak of Flames", start),
                sale("new", "Cloak of Flames", start + ChronoDuration::seconds(30)),
            ]),
        );
        let speaker = RecordingSpeaker::new();
        let (tracker, dispatcher) = tracker(provider, &speaker, &fast_config());
        let mut session = TrackingSession::with_start_time(["Cloak of Flames"], start);

        let summary = tracker.run_pass(&mut session, &CancellationToken::new()).await;
        dispatcher.shutdown().await;

        assert_eq!(summary.sales_announced, 1);
        assert_eq!(speaker.spoken(), vec!["Cloak of Flames sold"]);
    }

    #[tokio::test]
    async fn test_same_sale_never_announced_twice() {
        let start = Utc::now();
        let later = start + ChronoDuration::minutes(1);
        let provider = Arc::new(MockProvider::new());
        provider.set_sales("Cloak of Flames", Ok(vec![sale("7", "Cloak of Flames", later)]));
        let speaker = RecordingSpeaker::new();
        let (tracker, dispatcher) = tracker(provider.clone(), &speaker, &fast_config());
        let mut session = TrackingSession::with_start_time(["Cloak of Flames"], start);
        let token = CancellationToken::new();

        for _ in 0..5 {
            tracker.run_pass(&mut session, &token).await;
        }
        provider.set_sales(
            "Cloak of Flames",
            Ok(vec![
                sale("7", "Cloak of Flames", later),
                sale("8", "Cloak of Flames", later + ChronoDuration::minutes(1)),
            ]),
        );
        tracker.run_pass(&mut session, &token).await;
        tracker.run_pass(&mut session, &token).await;
        dispatcher.shutdown().await;

        assert_eq!(provider.call_count("sales:Cloak of Flames"), 7);
        assert_eq!(
            speaker.spoken(),
            vec!["Cloak of Flames sold", "Cloak of Flames sold"]
        );
        assert_eq!(session.processed_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_item_does_not_stop_pass() {
        let start = Utc::now();
        let later = start + ChronoDuration::minutes(1);
        let provider = Arc::new(MockProvider::new());
        provider.set_sales("Rubicite Breastplate", Ok(vec![sale("1", "Rubicite Breastplate", later)]));
        provider.set_sales(
            "Cloak of Flames",
            Err(ProviderError::malformed("expected value at line 1 column 1")),
        );
        provider.set_sales("Jboots", Ok(vec![sale("2", "Jboots", later)]));
        let speaker = RecordingSpeaker::new();
        let (tracker, dispatcher) = tracker(provider.clone(), &speaker, &fast_config());
        let mut session = TrackingSession::with_start_time(
            ["Rubicite Breastplate", "Cloak of Flames", "Jboots"],
            start,
        );

        let summary = tracker.run_pass(&mut session, &CancellationToken::new()).await;
        dispatcher.shutdown().await;

        assert_eq!(
            provider.calls(),
            vec![
                "sales:Rubicite Breastplate",
                "sales:Cloak of Flames",
                "sales:Jboots"
            ]
        );
        assert_eq!(summary.items_polled, 3);
        assert_eq!(summary.items_failed, 1);
        assert_eq!(
            speaker.spoken(),
            vec!["Rubicite Breastplate sold", "Jboots sold"]
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_skips_only_that_item() {
        let start = Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap();
        let provider = Arc::new(MockProvider::new());
        provider.set_sales(
            "Cloak of Flames",
            parse_sales_log(r#"{"items": [{"id": 1, "item": "Cloak"#, utc()),
        );
        provider.set_sales(
            "Jboots",
            parse_sales_log(
                r#"{"items": [{"id": 5, "item": "Jboots", "auctioneer": "Soandso", "datetime": "2026-10-16T10:05:00"}]}"#,
                utc(),
            ),
        );
        let speaker = RecordingSpeaker::new();
        let (tracker, dispatcher) = tracker(provider.clone(), &speaker, &fast_config());
        let mut session = TrackingSession::with_start_time(["Cloak of Flames", "Jboots"], start);

        let summary = tracker.run_pass(&mut session, &CancellationToken::new()).await;
        dispatcher.shutdown().await;

        assert_eq!(summary.items_polled, 2);
        assert_eq!(summary.items_failed, 1);
        assert_eq!(speaker.spoken(), vec!["Jboots sold"]);
    }

    #[tokio::test]
    async fn test_bad_record_does_not_hide_new_sale() {
        let start = Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap();
        let body = r#"{"items": [
            {"id": 1, "item": "Cloak of Flames", "auctioneer": "Oldguy", "datetime": ""},
            {"id": 2, "item": "Cloak of Flames", "auctioneer": "Soandso", "datetime": "2026-10-16T10:15:30"}
        ]}"#;
        let provider = Arc::new(MockProvider::new());
        provider.set_sales("Cloak of Flames", parse_sales_log(body, utc()));
        let speaker = RecordingSpeaker::new();
        let (tracker, dispatcher) = tracker(provider.clone(), &speaker, &fast_config());
        let mut session = TrackingSession::with_start_time(["Cloak of Flames"], start);

        let summary = tracker.run_pass(&mut session, &CancellationToken::new()).await;
        dispatcher.shutdown().await;

        assert_eq!(summary.items_failed, 0);
        assert_eq!(speaker.spoken(), vec!["Cloak of Flames sold"]);
    }

    #[tokio::test]
    async fn test_cancelled_pass_announces_nothing() {
        let start = Utc::now();
        let provider = Arc::new(MockProvider::new());
        provider.set_sales(
            "Cloak of Flames",
            Ok(vec![sale("1", "Cloak of Flames", start + ChronoDuration::minutes(1))]),
        );
        let speaker = RecordingSpeaker::new();
        let (tracker, dispatcher) = tracker(provider.clone(), &speaker, &fast_config());
        let mut session = TrackingSession::with_start_time(["Cloak of Flames"], start);
        let token = CancellationToken::new();
        token.cancel();

        let summary = tracker.run_pass(&mut session, &token).await;
        dispatcher.shutdown().await;

        assert!(summary.cancelled);
        assert!(provider.calls().is_empty());
        assert!(speaker.spoken().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_repeats_passes_until_cancelled() {
        let start = Utc::now() - ChronoDuration::minutes(1);
        let provider = Arc::new(MockProvider::new());
        provider.set_sales("Cloak of Flames", Ok(vec![sale("1", "Cloak of Flames", Utc::now())]));
        let speaker = RecordingSpeaker::new();
        let (tracker, dispatcher) = tracker(provider.clone(), &speaker, &MonitorConfig::default());
        let session = TrackingSession::with_start_time(["Cloak of Flames", "Jboots"], start);
        let token = CancellationToken::new();

        let handle = tokio::spawn(tracker.run(session, token.clone()));
        tokio::time::sleep(Duration::from_secs(25)).await;
        token.cancel();
        handle.await.unwrap();

        let polled = provider.call_count("sales:Cloak of Flames");
        assert!(polled >= 2, "expected repeated passes, got {}", polled);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(provider.call_count("sales:Cloak of Flames"), polled);

        dispatcher.shutdown().await;
        assert_eq!(speaker.spoken(), vec!["Cloak of Flames sold"]);
    }
}
