use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::domain::{ChatId, Cursor, Renderer, Source, SourceStatus};
use crate::errors::{RelayError, RelayResult};
use crate::services::delivery_service::{Delivery, DeliveryService};
use crate::services::fetch_service::FetchService;
use crate::services::health::HealthBoard;
use crate::storage::traits::{CursorRepository, SourceRepository};

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    /// Pause between two sends
    pub item_delay: Duration,
    /// Pause between two sources
    pub source_delay: Duration,
    /// Deliver without ever moving a cursor
    pub dry_run: bool,
}

impl PollSettings {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            interval: config.poll_interval,
            item_delay: config.item_delay,
            source_delay: config.source_delay,
            dry_run,
        }
    }
}

/// Result of polling one source
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceOutcome {
    pub delivered: usize,
    pub fallbacks: usize,
    pub failed: usize,
}

/// Totals for one pass over the registry
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub sources: usize,
    pub skipped: usize,
    pub delivered: usize,
    /// Delivered as a permalink because native delivery failed
    pub fallbacks: usize,
    pub failed: usize,
}

pub struct PollService<S: SourceRepository, C: CursorRepository> {
    sources: S,
    cursors: C,
    fetcher: FetchService,
    renderer: Renderer,
    sender: DeliveryService,
    chat_id: ChatId,
    settings: PollSettings,
    health: HealthBoard,
}

impl<S: SourceRepository, C: CursorRepository> PollService<S, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sources: S,
        cursors: C,
        fetcher: FetchService,
        renderer: Renderer,
        sender: DeliveryService,
        chat_id: ChatId,
        settings: PollSettings,
        health: HealthBoard,
    ) -> Self {
        Self {
            sources,
            cursors,
            fetcher,
            renderer,
            sender,
            chat_id,
            settings,
            health,
        }
    }

    /// Poll every interval until `shutdown` is cancelled.
    /// The first cycle starts immediately; a slow cycle delays the next tick.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.settings.interval.as_secs(),
            dry_run = self.settings.dry_run,
            "poll loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.run_cycle(&shutdown).await {
                Ok(report) => info!(
                    sources = report.sources,
                    skipped = report.skipped,
                    delivered = report.delivered,
                    fallbacks = report.fallbacks,
                    failed = report.failed,
                    "poll cycle finished"
                ),
                Err(e) => error!(error = %e, "poll cycle failed"),
            }
        }

        info!("poll loop stopped");
    }

    /// One pass over a snapshot of the registry taken now
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> RelayResult<CycleReport> {
        let snapshot = self.sources.get_all()?;
        let mut report = CycleReport {
            sources: snapshot.len(),
            ..CycleReport::default()
        };

        if snapshot.is_empty() {
            debug!("no sources registered");
            return Ok(report);
        }

        for (i, source) in snapshot.iter().enumerate() {
            if shutdown.is_cancelled() {
                break;
            }
            if i > 0 {
                pause(self.settings.source_delay, shutdown).await;
            }

            let status = match self.poll_source(source, shutdown).await {
                Ok(outcome) => {
                    report.delivered += outcome.delivered;
                    report.fallbacks += outcome.fallbacks;
                    report.failed += outcome.failed;
                    SourceStatus::Healthy {
                        at: Utc::now(),
                        delivered: outcome.delivered,
                    }
                }
                Err(RelayError::SourceNotFound(reason)) => {
                    warn!(source = %source.name, reason = %reason, "source not found upstream");
                    report.skipped += 1;
                    SourceStatus::NotFound { at: Utc::now() }
                }
                Err(e) => {
                    warn!(source = %source.name, error = %e, "skipping source this cycle");
                    report.skipped += 1;
                    SourceStatus::Unavailable {
                        at: Utc::now(),
                        reason: e.to_string(),
                    }
                }
            };

            // A source removed during the cycle keeps no health entry
            if self.sources.exists(&source.name)? {
                self.health.record(&source.name, status);
            }
        }

        Ok(report)
    }

    /// Fetch, render and send everything new for one source, advancing its
    /// cursor after each successful delivery.
    pub async fn poll_source(
        &self,
        source: &Source,
        shutdown: &CancellationToken,
    ) -> RelayResult<SourceOutcome> {
        let cursor = self.cursors.get(&source.name)?;
        let items = self.fetcher.fetch(source, cursor.as_ref()).await?;

        let mut outcome = SourceOutcome::default();
        if items.is_empty() {
            debug!(source = %source.name, "nothing new");
            return Ok(outcome);
        }

        info!(source = %source.name, count = items.len(), "delivering new items");

        for (i, item) in items.iter().enumerate() {
            if shutdown.is_cancelled() {
                debug!(source = %source.name, "shutdown requested, stopping mid-source");
                break;
            }
            if i > 0 {
                pause(self.settings.item_delay, shutdown).await;
            }

            if !self.sources.exists(&source.name)? {
                warn!(source = %source.name, "source removed during the cycle, stopping");
                break;
            }

            let payload = self.renderer.render(item);
            match self.sender.send(&payload, self.chat_id).await {
                Ok(delivery) => {
                    outcome.delivered += 1;
                    if delivery == Delivery::Fallback {
                        outcome.fallbacks += 1;
                    }

                    if self.settings.dry_run {
                        continue;
                    }
                    if !self.cursors.advance(&Cursor::at_item(&source.name, item))? {
                        // Removed while this cycle was running
                        warn!(source = %source.name, item_id = %item.id, "cursor not advanced, stopping source");
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        source = %source.name,
                        item_id = %item.id,
                        error = %e,
                        "dropping item after failed delivery"
                    );
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }
}

/// Sleep unless shutdown comes first
async fn pause(duration: Duration, shutdown: &CancellationToken) {
    if duration.is_zero() {
        return;
    }
    tokio::select! {
        _ = sleep(duration) => {}
        _ = shutdown.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use chrono::DateTime;

    use crate::domain::{Item, RenderOptions, SortMode};
    use crate::messaging::port::MockMessagingPort;
    use crate::sources::traits::{MockContentProvider, MockVideoResolver};
    use crate::storage::sqlite::{SqliteCursorRepository, SqliteSourceRepository, SqliteStorage};

    const CHAT: ChatId = ChatId(99);

    type Service = PollService<SqliteSourceRepository, SqliteCursorRepository>;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_728_000_000 + seconds, 0).unwrap()
    }

    fn item(source: &str, id: &str, seconds: i64) -> Item {
        Item::new(
            id.to_string(),
            source.to_string(),
            format!("post {id}"),
            format!("https://reddit.com/r/{source}/comments/{id}/"),
            at(seconds),
        )
        .self_post(true)
    }

    fn settings(dry_run: bool) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(60),
            item_delay: Duration::ZERO,
            source_delay: Duration::ZERO,
            dry_run,
        }
    }

    struct Harness {
        storage: SqliteStorage,
        health: HealthBoard,
    }

    impl Harness {
        fn new(sources: &[&str]) -> Self {
            let storage = SqliteStorage::in_memory().unwrap();
            let repo = SqliteSourceRepository::new(storage.clone());
            for name in sources {
                repo.add(&Source::new(name.to_string(), SortMode::New)).unwrap();
            }
            Self {
                storage,
                health: HealthBoard::new(),
            }
        }

        fn cursors(&self) -> SqliteCursorRepository {
            SqliteCursorRepository::new(self.storage.clone())
        }

        fn service(
            &self,
            provider: MockContentProvider,
            messenger: MockMessagingPort,
            dry_run: bool,
        ) -> Service {
            PollService::new(
                SqliteSourceRepository::new(self.storage.clone()),
                self.cursors(),
                FetchService::new(Arc::new(provider), 25),
                Renderer::new(RenderOptions::default()),
                DeliveryService::new(Arc::new(messenger), Arc::new(MockVideoResolver::new()), 1_000),
                CHAT,
                settings(dry_run),
                self.health.clone(),
            )
        }
    }

    /// Messenger that records every text it is asked to send
    fn recording_messenger(sent: Arc<Mutex<Vec<String>>>) -> MockMessagingPort {
        let mut messenger = MockMessagingPort::new();
        messenger.expect_send_text().returning(move |_, html| {
            sent.lock().unwrap().push(html.to_string());
            Ok(())
        });
        messenger
    }

    #[tokio::test]
    async fn test_delivers_items_after_cursor_in_order() {
        let harness = Harness::new(&["python"]);
        harness
            .cursors()
            .advance(&Cursor::new("python".to_string(), "t1".to_string(), at(10)))
            .unwrap();

        let mut provider = MockContentProvider::new();
        provider.expect_list_new().returning(|_, _| {
            Ok(vec![
                item("python", "t1", 10),
                item("python", "t2", 20),
                item("python", "t3", 30),
            ])
        });
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = harness.service(provider, recording_messenger(sent.clone()), false);

        let report = service.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.delivered, 2);
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("post t2"));
        assert!(sent[1].contains("post t3"));

        let cursor = harness.cursors().get("python").unwrap().unwrap();
        assert_eq!(cursor.last_item_id, "t3");
        assert_eq!(cursor.last_seen_time, at(30));
    }

    #[tokio::test]
    async fn test_nothing_new_leaves_cursor_alone() {
        let harness = Harness::new(&["python"]);
        harness
            .cursors()
            .advance(&Cursor::new("python".to_string(), "t3".to_string(), at(30)))
            .unwrap();

        let mut provider = MockContentProvider::new();
        provider
            .expect_list_new()
            .returning(|_, _| Ok(vec![item("python", "t3", 30), item("python", "t2", 20)]));
        let mut messenger = MockMessagingPort::new();
        messenger.expect_send_text().never();

        let service = harness.service(provider, messenger, false);
        let report = service.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.delivered, 0);
        let cursor = harness.cursors().get("python").unwrap().unwrap();
        assert_eq!(cursor.last_item_id, "t3");
    }

    #[tokio::test]
    async fn test_second_cycle_sends_no_duplicates() {
        let harness = Harness::new(&["python"]);

        let mut provider = MockContentProvider::new();
        provider
            .expect_list_new()
            .times(2)
            .returning(|_, _| Ok(vec![item("python", "a", 1), item("python", "b", 2)]));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = harness.service(provider, recording_messenger(sent.clone()), false);

        let shutdown = CancellationToken::new();
        service.run_cycle(&shutdown).await.unwrap();
        service.run_cycle(&shutdown).await.unwrap();

        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_fallback_keeps_cursor_and_continues() {
        let harness = Harness::new(&["python"]);

        let mut provider = MockContentProvider::new();
        provider
            .expect_list_new()
            .returning(|_, _| Ok(vec![item("python", "t1", 10)]));
        let mut messenger = MockMessagingPort::new();
        messenger
            .expect_send_text()
            .times(2)
            .returning(|_, _| Err(RelayError::Messaging("chat not found".to_string())));

        let service = harness.service(provider, messenger, false);
        let report = service.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 0);
        assert!(harness.cursors().get("python").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_successful_fallback_advances_cursor() {
        let harness = Harness::new(&["python"]);

        let mut provider = MockContentProvider::new();
        provider.expect_list_new().returning(|_, _| {
            let video = Item::new(
                "v1".to_string(),
                "python".to_string(),
                "clip".to_string(),
                "https://reddit.com/r/python/comments/v1/".to_string(),
                at(10),
            )
            .with_url(Some("https://i.imgur.com/clip.mp4".to_string()));
            Ok(vec![video])
        });
        let mut messenger = MockMessagingPort::new();
        messenger
            .expect_send_video()
            .times(1)
            .returning(|_, _, _| Err(RelayError::Messaging("Request Entity Too Large".to_string())));
        messenger
            .expect_send_text()
            .withf(|_, html| html.contains("https://reddit.com/r/python/comments/v1/"))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = harness.service(provider, messenger, false);
        let report = service.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.delivered, 1);
        let cursor = harness.cursors().get("python").unwrap().unwrap();
        assert_eq!(cursor.last_item_id, "v1");
    }

    #[tokio::test]
    async fn test_one_failing_source_does_not_stop_others() {
        let harness = Harness::new(&["gone", "python"]);

        let mut provider = MockContentProvider::new();
        provider
            .expect_list_new()
            .withf(|source, _| source.name == "gone")
            .returning(|_, _| Err(RelayError::SourceNotFound("r/gone".to_string())));
        provider
            .expect_list_new()
            .withf(|source, _| source.name == "python")
            .returning(|_, _| Ok(vec![item("python", "t1", 10)]));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = harness.service(provider, recording_messenger(sent.clone()), false);

        let report = service.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.sources, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.delivered, 1);
        assert!(matches!(harness.health.get("gone"), SourceStatus::NotFound { .. }));
        assert!(matches!(
            harness.health.get("python"),
            SourceStatus::Healthy { delivered: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_recorded() {
        let harness = Harness::new(&["python"]);

        let mut provider = MockContentProvider::new();
        provider
            .expect_list_new()
            .returning(|_, _| Err(RelayError::ProviderUnavailable("429".to_string())));
        let service = harness.service(provider, MockMessagingPort::new(), false);

        let report = service.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert!(matches!(
            harness.health.get("python"),
            SourceStatus::Unavailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_dry_run_never_advances() {
        let harness = Harness::new(&["python"]);

        let mut provider = MockContentProvider::new();
        provider
            .expect_list_new()
            .returning(|_, _| Ok(vec![item("python", "t1", 10)]));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = harness.service(provider, recording_messenger(sent.clone()), true);

        service.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(sent.lock().unwrap().len(), 1);
        assert!(harness.cursors().get("python").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_registry_is_a_quiet_cycle() {
        let harness = Harness::new(&[]);
        let mut provider = MockContentProvider::new();
        provider.expect_list_new().never();

        let service = harness.service(provider, MockMessagingPort::new(), false);
        let report = service.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(report, CycleReport::default());
    }

    #[tokio::test]
    async fn test_cancel_during_send_finishes_that_item_only() {
        let harness = Harness::new(&["python"]);

        let mut provider = MockContentProvider::new();
        provider
            .expect_list_new()
            .returning(|_, _| Ok(vec![item("python", "t1", 10), item("python", "t2", 20)]));

        let shutdown = CancellationToken::new();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut messenger = MockMessagingPort::new();
        let (token, log) = (shutdown.clone(), sent.clone());
        messenger.expect_send_text().returning(move |_, html| {
            log.lock().unwrap().push(html.to_string());
            token.cancel();
            Ok(())
        });

        let service = harness.service(provider, messenger, false);
        let report = service.run_cycle(&shutdown).await.unwrap();

        assert_eq!(report.delivered, 1);
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("post t1"));
        let cursor = harness.cursors().get("python").unwrap().unwrap();
        assert_eq!(cursor.last_item_id, "t1");
    }

    #[tokio::test]
    async fn test_unregistered_source_sends_nothing() {
        let harness = Harness::new(&[]);

        let mut provider = MockContentProvider::new();
        provider
            .expect_list_new()
            .returning(|_, _| Ok(vec![item("python", "a", 1), item("python", "b", 2)]));
        let mut messenger = MockMessagingPort::new();
        messenger.expect_send_text().never();

        let service = harness.service(provider, messenger, false);
        let source = Source::new("python".to_string(), SortMode::New);
        let outcome = service
            .poll_source(&source, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, SourceOutcome::default());
        assert!(harness.cursors().get("python").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_source_removed_mid_cycle_is_dropped() {
        let harness = Harness::new(&["python"]);

        // The admin removes the source while its listing is being fetched
        let repo = SqliteSourceRepository::new(harness.storage.clone());
        let mut provider = MockContentProvider::new();
        provider.expect_list_new().returning(move |_, _| {
            repo.remove("python").unwrap();
            Ok(vec![item("python", "a", 1), item("python", "b", 2)])
        });
        let mut messenger = MockMessagingPort::new();
        messenger.expect_send_text().never();

        let service = harness.service(provider, messenger, false);
        let report = service.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.sources, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(harness.health.get("python"), SourceStatus::Pending);
        assert!(harness.cursors().get("python").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fallbacks_are_counted() {
        let harness = Harness::new(&["python"]);

        let mut provider = MockContentProvider::new();
        provider.expect_list_new().returning(|_, _| {
            let photo = item("python", "p1", 10)
                .self_post(false)
                .with_url(Some("https://i.redd.it/p1.jpg".to_string()));
            Ok(vec![photo, item("python", "t2", 20)])
        });
        let mut messenger = MockMessagingPort::new();
        messenger
            .expect_send_photo()
            .returning(|_, _, _| Err(RelayError::Messaging("wrong file identifier".to_string())));
        messenger.expect_send_text().times(2).returning(|_, _| Ok(()));

        let service = harness.service(provider, messenger, false);
        let report = service.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.delivered, 2);
        assert_eq!(report.fallbacks, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_run_returns_once_cancelled() {
        let harness = Harness::new(&[]);
        let service = harness.service(MockContentProvider::new(), MockMessagingPort::new(), false);

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        service.run(shutdown).await;
    }
}
