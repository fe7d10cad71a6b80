//! Recurring update scheduling.
//!
//! One [`FeedScheduler`] owns the repeating job that runs update cycles.
//! Cycles never overlap: each tick must take the flight gate, and a tick
//! arriving while the previous cycle still holds it is skipped outright
//! rather than queued.

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use pulsefeed_core::AppConfig;
use pulsefeed_db::EntityStore;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info, warn};

use crate::fetch::FeedFetcher;
use crate::fleet::{run_cycle, CycleSummary};

/// Drives recurring update cycles at a fixed interval.
pub struct FeedScheduler<S> {
    store: S,
    fetcher: Arc<FeedFetcher>,
    timezone: Tz,
    update_interval: Duration,
    freshness_window_hours: i64,
    inner: Option<JobScheduler>,
    gate: Arc<Mutex<()>>,
    notifier: Option<UnboundedSender<CycleSummary>>,
}

impl<S> FeedScheduler<S>
where
    S: EntityStore + Clone + 'static,
{
    #[must_use]
    pub fn new(
        store: S,
        fetcher: Arc<FeedFetcher>,
        timezone: Tz,
        update_interval: Duration,
        freshness_window_hours: i64,
    ) -> Self {
        Self {
            store,
            fetcher,
            timezone,
            update_interval,
            freshness_window_hours,
            inner: None,
            gate: Arc::new(Mutex::new(())),
            notifier: None,
        }
    }

    /// Builds a scheduler from the application configuration.
    #[must_use]
    pub fn from_config(store: S, fetcher: Arc<FeedFetcher>, config: &AppConfig) -> Self {
        Self::new(
            store,
            fetcher,
            config.timezone,
            Duration::from_secs(config.update_interval_minutes * 60),
            config.freshness_window_hours,
        )
    }

    /// Sends each finished cycle's summary to `tx`. Used by tests and by
    /// anything that wants to observe cycles without polling the database.
    pub fn set_notifier(&mut self, tx: UnboundedSender<CycleSummary>) {
        self.notifier = Some(tx);
    }

    /// Whether the repeating job is currently registered.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.is_some()
    }

    /// Registers and starts the repeating update job.
    ///
    /// Calling `start` on an already-running scheduler is a logged no-op.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the job runtime cannot be built or
    /// the job cannot be registered.
    pub async fn start(&mut self) -> Result<(), JobSchedulerError> {
        if self.inner.is_some() {
            warn!("scheduler: already running; ignoring start");
            return Ok(());
        }

        let scheduler = JobScheduler::new().await?;

        let store = self.store.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let timezone = self.timezone;
        let freshness_window_hours = self.freshness_window_hours;
        let gate = Arc::clone(&self.gate);
        let notifier = self.notifier.clone();

        let job = Job::new_repeated_async(self.update_interval, move |_uuid, _lock| {
            let store = store.clone();
            let fetcher = Arc::clone(&fetcher);
            let gate = Arc::clone(&gate);
            let notifier = notifier.clone();

            Box::pin(async move {
                let summary =
                    run_tick(&store, &fetcher, timezone, freshness_window_hours, &gate).await;
                if let (Some(summary), Some(tx)) = (summary, notifier) {
                    // Receiver may be gone; the summary was already logged.
                    let _ = tx.send(summary);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;
        self.inner = Some(scheduler);

        info!(
            interval_secs = self.update_interval.as_secs(),
            "scheduler: registered recurring feed update job"
        );
        Ok(())
    }

    /// Stops the repeating job. A cycle already in flight finishes on its
    /// own; no new ticks fire. Safe to call when not running.
    ///
    /// # Errors
    ///
    /// Returns [`JobSchedulerError`] if the job runtime fails to shut down.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        let Some(mut scheduler) = self.inner.take() else {
            warn!("scheduler: not running; ignoring shutdown");
            return Ok(());
        };
        scheduler.shutdown().await?;
        info!("scheduler: stopped");
        Ok(())
    }

    /// Runs one cycle immediately, subject to the same flight gate as
    /// scheduled ticks.
    pub async fn run_now(&self) -> Option<CycleSummary> {
        run_tick(
            &self.store,
            &self.fetcher,
            self.timezone,
            self.freshness_window_hours,
            &self.gate,
        )
        .await
    }
}

/// One scheduler tick. Returns `None` when the tick was skipped because a
/// cycle was still in flight, or when the cycle itself failed.
pub async fn run_tick<S: EntityStore>(
    store: &S,
    fetcher: &FeedFetcher,
    timezone: Tz,
    freshness_window_hours: i64,
    gate: &Mutex<()>,
) -> Option<CycleSummary> {
    let Ok(_flight) = gate.try_lock() else {
        warn!("scheduler: previous cycle still running; skipping tick");
        return None;
    };

    info!("scheduler: starting feed update cycle");
    match run_cycle(store, fetcher, timezone, freshness_window_hours).await {
        Ok(summary) => {
            info!(
                new_articles = summary.new_articles.len(),
                "scheduler: feed update cycle complete"
            );
            Some(summary)
        }
        Err(e) => {
            error!(error = %e, "scheduler: feed update cycle failed");
            None
        }
    }
}
