//! The poll loop, shared by the headless `poll` command and the display.
//!
//! A [`PollDriver`] owns everything a round needs. It runs rounds on a fixed
//! interval until told to stop; a round that is still in flight at shutdown
//! is abandoned and nothing of it is written.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, ServiceRegistry};
use crate::poller::{run_round, Poller, RoundClock, RoundReport};
use crate::source::HttpSource;
use crate::store::{Store, StoreError};

/// Upper bound on one service's fetch, covering sources that chain requests.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Options of the `poll` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollOptions {
    /// Run a single round and exit.
    pub once: bool,
    /// Log a summary line for every round.
    pub log: bool,
}

/// Runs polling rounds against one store.
#[derive(Debug)]
pub struct PollDriver {
    poller: Poller,
    services: ServiceRegistry,
    store: Store,
    clock: RoundClock,
    retention_hours: u32,
    log_rounds: bool,
}

impl PollDriver {
    /// Build a driver polling over HTTP, resuming after the newest round
    /// already in `store`.
    pub async fn connect(config: &AppConfig, store: Store) -> Result<Self> {
        let source = HttpSource::new().context("failed to build HTTP client")?;
        let poller = Poller::new(Arc::new(source), config.concurrency).with_fetch_timeout(FETCH_TIMEOUT);
        let last_round = store
            .last_round_timestamp()
            .await
            .context("failed to read the last poll time")?;

        Ok(Self::new(
            poller,
            config.services.clone(),
            store,
            config.retention_hours,
            RoundClock::resume(last_round),
        ))
    }

    pub fn new(
        poller: Poller,
        services: ServiceRegistry,
        store: Store,
        retention_hours: u32,
        clock: RoundClock,
    ) -> Self {
        Self {
            poller,
            services,
            store,
            clock,
            retention_hours,
            log_rounds: false,
        }
    }

    /// Log every round's summary at `info` instead of `debug`.
    pub fn log_rounds(mut self, enabled: bool) -> Self {
        self.log_rounds = enabled;
        self
    }

    /// Poll every service once and persist the round.
    pub async fn round(&mut self) -> Result<RoundReport, StoreError> {
        run_round(
            &self.poller,
            self.services.services(),
            &self.store,
            &mut self.clock,
            self.retention_hours,
        )
        .await
    }

    /// Run rounds every `interval` until `stop` turns true.
    ///
    /// The first round starts at once when `immediate` is set, otherwise
    /// after one interval. `poll_now` starts a round early and restarts the
    /// interval. Storage failures are logged and the loop carries on.
    pub async fn run(
        &mut self,
        interval: Duration,
        immediate: bool,
        poll_now: Arc<Notify>,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !immediate {
            ticker.tick().await;
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = poll_now.notified() => {
                    debug!("poll requested");
                    ticker.reset();
                }
                _ = stopped(&mut stop) => break,
            }

            let result = tokio::select! {
                result = self.round() => Some(result),
                _ = stopped(&mut stop) => None,
            };
            match result {
                Some(result) => self.report(result),
                None => {
                    info!("shutdown during a round; discarding it");
                    break;
                }
            }
        }
    }

    fn report(&self, result: Result<RoundReport, StoreError>) {
        match result {
            Ok(report) if self.log_rounds => info!(timestamp = report.timestamp, "{report}"),
            Ok(report) => debug!(timestamp = report.timestamp, "{report}"),
            Err(err) => error!(error = %err, "failed to persist poll round"),
        }
    }
}

/// Resolves once the stop flag is set. A dropped sender never stops.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    let closed = stop.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

/// A stop flag raised on Ctrl-C.
pub fn stop_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(true);
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}

/// Entry point of the `poll` command.
pub async fn run(config: AppConfig, options: PollOptions) -> Result<()> {
    let store = Store::open(&config.database_path)
        .await
        .with_context(|| format!("failed to open database {}", config.database_path.display()))?;
    let mut driver = PollDriver::connect(&config, store.clone())
        .await?
        .log_rounds(options.log);

    if options.once {
        let result = driver.round().await;
        store.close().await;
        let report = result.context("poll round failed")?;
        if options.log {
            info!(timestamp = report.timestamp, "{report}");
        }
        return Ok(());
    }

    info!(
        services = config.services.len(),
        interval_secs = config.poll_interval.as_secs(),
        database = %config.database_path.display(),
        "polling"
    );
    driver
        .run(config.poll_interval, true, Arc::new(Notify::new()), stop_on_ctrl_c())
        .await;
    store.close().await;
    info!("stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Map;
    use servicedash_types::NormalizedStatus;
    use tempfile::TempDir;

    use crate::source::{AdapterError, Service, SourceAdapter};

    struct Steady;

    #[async_trait]
    impl SourceAdapter for Steady {
        async fn fetch(&self, _service: &Service) -> Result<NormalizedStatus, AdapterError> {
            Ok(NormalizedStatus::operational("ok"))
        }
    }

    struct Hang;

    #[async_trait]
    impl SourceAdapter for Hang {
        async fn fetch(&self, _service: &Service) -> Result<NormalizedStatus, AdapterError> {
            std::future::pending().await
        }
    }

    async fn driver(dir: &TempDir, adapter: Arc<dyn SourceAdapter>) -> (Store, PollDriver) {
        let store = Store::open(dir.path().join("polls.sqlite3")).await.unwrap();
        let services = ServiceRegistry::from_services(vec![
            Service::new("a", "A", "fx_rate", Map::new()).unwrap(),
            Service::new("b", "B", "fx_rate", Map::new()).unwrap(),
        ])
        .unwrap();
        let driver = PollDriver::new(
            Poller::new(adapter, 2),
            services,
            store.clone(),
            24,
            RoundClock::new(),
        );
        (store, driver)
    }

    #[tokio::test]
    async fn test_round_persists_every_service() {
        let dir = TempDir::new().unwrap();
        let (store, mut driver) = driver(&dir, Arc::new(Steady)).await;

        let report = driver.round().await.unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(store.last_round_timestamp().await.unwrap(), Some(report.timestamp));
        assert!(store.latest("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_stops_on_signal() {
        let dir = TempDir::new().unwrap();
        let (store, mut driver) = driver(&dir, Arc::new(Steady)).await;
        let (tx, rx) = watch::channel(false);
        let poll_now = Arc::new(Notify::new());

        let handle = tokio::spawn(async move {
            driver.run(Duration::from_secs(3600), true, poll_now, rx).await;
        });
        while store.last_round_timestamp().await.unwrap().is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_in_flight_round_is_abandoned() {
        let dir = TempDir::new().unwrap();
        let (store, mut driver) = driver(&dir, Arc::new(Hang)).await;
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            driver
                .run(Duration::from_secs(3600), true, Arc::new(Notify::new()), rx)
                .await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(store.last_round_timestamp().await.unwrap(), None);
    }
}
