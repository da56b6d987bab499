//! One polling round: fetch every service under a concurrency cap.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use servicedash_types::{NormalizedStatus, PollRecord, Status};

use crate::source::{AdapterError, Service, SourceAdapter};
use crate::store::{Store, StoreError};

/// Default number of simultaneous fetches.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// The result of fetching one service in a round.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub service: Arc<Service>,
    pub status: NormalizedStatus,
}

impl PollOutcome {
    /// Stamp the outcome with its round timestamp.
    pub fn to_record(&self, timestamp: i64) -> PollRecord {
        PollRecord::new(
            timestamp,
            self.service.id.clone(),
            self.service.name.clone(),
            self.status.clone(),
        )
    }
}

/// Fans a round out over a [`SourceAdapter`].
///
/// Failures are isolated per service: an adapter error becomes an
/// `Unknown` outcome and never affects the other fetches.
#[derive(Clone)]
pub struct Poller {
    adapter: Arc<dyn SourceAdapter>,
    concurrency: usize,
    fetch_timeout: Option<Duration>,
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("concurrency", &self.concurrency)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl Poller {
    /// Create a poller running at most `concurrency` fetches at once
    /// (at least one).
    pub fn new(adapter: Arc<dyn SourceAdapter>, concurrency: usize) -> Self {
        Self {
            adapter,
            concurrency: concurrency.max(1),
            fetch_timeout: None,
        }
    }

    /// Bound every fetch, on top of whatever the adapter enforces itself.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch every service once.
    ///
    /// Returns exactly one outcome per input service, in input order.
    pub async fn poll_once(&self, services: &[Arc<Service>]) -> Vec<PollOutcome> {
        let permits = Semaphore::new(self.concurrency);

        let tasks = services.iter().map(|service| {
            let permits = &permits;
            async move {
                let status = match permits.acquire().await {
                    Ok(_permit) => match self.fetch(service).await {
                        Ok(status) => status,
                        Err(err) => {
                            warn!(service = %service.id, error = %err, "fetch failed");
                            NormalizedStatus::unknown(format!("Fetch error: {}", err.kind()))
                        }
                    },
                    Err(_) => NormalizedStatus::unknown("Fetch error: Cancelled"),
                };
                PollOutcome {
                    service: Arc::clone(service),
                    status,
                }
            }
        });

        join_all(tasks).await
    }

    async fn fetch(&self, service: &Service) -> Result<NormalizedStatus, AdapterError> {
        match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.adapter.fetch(service))
                .await
                .unwrap_or(Err(AdapterError::Timeout)),
            None => self.adapter.fetch(service).await,
        }
    }
}

/// Issues round timestamps that never go backwards.
///
/// A wall clock stepped back between rounds (NTP correction) repeats the
/// previous round's timestamp instead.
#[derive(Debug, Clone, Default)]
pub struct RoundClock {
    last: Option<i64>,
}

impl RoundClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after an existing history whose newest round is `last`.
    pub fn resume(last: Option<i64>) -> Self {
        Self { last }
    }

    /// Timestamp for a round polled at wall time `wall`.
    pub fn next(&mut self, wall: i64) -> i64 {
        let ts = self.last.map_or(wall, |last| wall.max(last));
        self.last = Some(ts);
        ts
    }

    /// Timestamp for a round polled now.
    pub fn tick(&mut self) -> i64 {
        self.next(crate::timeutil::now_ts())
    }
}

/// What one persisted round did.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub timestamp: i64,
    pub outcomes: Vec<PollOutcome>,
    pub pruned: u64,
}

impl RoundReport {
    /// The most severe outcome; the first one wins ties.
    pub fn worst(&self) -> Option<&PollOutcome> {
        self.outcomes
            .iter()
            .reduce(|worst, o| if o.status.status > worst.status.status { o } else { worst })
    }

    /// Count of outcomes per status.
    pub fn count(&self, status: Status) -> usize {
        self.outcomes.iter().filter(|o| o.status.status == status).count()
    }
}

impl fmt::Display for RoundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "polled {} services", self.outcomes.len())?;
        if let Some(worst) = self.worst() {
            write!(f, "; worst={}={}", worst.service.name, worst.status.status)?;
        }
        if self.pruned > 0 {
            write!(f, "; pruned={}", self.pruned)?;
        }
        Ok(())
    }
}

/// Poll, persist the round under one timestamp, then prune old history.
///
/// A storage failure fails the round; nothing is retried.
pub async fn run_round(
    poller: &Poller,
    services: &[Arc<Service>],
    store: &Store,
    clock: &mut RoundClock,
    retention_hours: u32,
) -> Result<RoundReport, StoreError> {
    let outcomes = poller.poll_once(services).await;
    let timestamp = clock.tick();
    let written = store.append(timestamp, &outcomes).await?;
    let pruned = store.prune(retention_hours).await?;
    debug!(timestamp, written, pruned, "round persisted");

    Ok(RoundReport {
        timestamp,
        outcomes,
        pruned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Map;

    fn service(id: &str) -> Arc<Service> {
        Arc::new(Service::new(id, id.to_uppercase(), "fx_rate", Map::new()).unwrap())
    }

    /// Fails for ids starting with `bad`, succeeds otherwise, and records
    /// the peak number of concurrent calls.
    #[derive(Default)]
    struct FakeAdapter {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SourceAdapter for FakeAdapter {
        async fn fetch(&self, service: &Service) -> Result<NormalizedStatus, AdapterError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if service.id.starts_with("bad") {
                Err(AdapterError::Connection("refused".into()))
            } else {
                Ok(NormalizedStatus::operational("ok").with_value(1.0))
            }
        }
    }

    struct Hang;

    #[async_trait]
    impl SourceAdapter for Hang {
        async fn fetch(&self, _service: &Service) -> Result<NormalizedStatus, AdapterError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(NormalizedStatus::operational("late"))
        }
    }

    #[tokio::test]
    async fn test_concurrency_cap() {
        let adapter = Arc::new(FakeAdapter::default());
        let poller = Poller::new(adapter.clone(), 3);
        let services: Vec<_> = (0..10).map(|i| service(&format!("svc{i}"))).collect();

        let outcomes = poller.poll_once(&services).await;
        assert_eq!(outcomes.len(), 10);
        assert_eq!(adapter.peak.load(Ordering::SeqCst), 3);
        assert!(outcomes.iter().all(|o| o.status.status == Status::Operational));
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let poller = Poller::new(Arc::new(FakeAdapter::default()), 2);
        let services = vec![service("good1"), service("bad1"), service("good2"), service("bad2")];

        let outcomes = poller.poll_once(&services).await;
        assert_eq!(outcomes.len(), 4);
        let ids: Vec<_> = outcomes.iter().map(|o| o.service.id.as_str()).collect();
        assert_eq!(ids, vec!["good1", "bad1", "good2", "bad2"]);

        assert_eq!(outcomes[0].status.status, Status::Operational);
        assert_eq!(outcomes[1].status.status, Status::Unknown);
        assert_eq!(outcomes[1].status.message, "Fetch error: ConnectError");
        assert_eq!(outcomes[2].status.status, Status::Operational);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout() {
        let poller = Poller::new(Arc::new(Hang), 4).with_fetch_timeout(Duration::from_secs(10));
        let outcomes = poller.poll_once(&[service("slow")]).await;
        assert_eq!(outcomes[0].status.status, Status::Unknown);
        assert_eq!(outcomes[0].status.message, "Fetch error: Timeout");
    }

    #[tokio::test]
    async fn test_empty_round() {
        let poller = Poller::new(Arc::new(FakeAdapter::default()), 0);
        assert_eq!(poller.concurrency(), 1);
        assert!(poller.poll_once(&[]).await.is_empty());
    }

    #[test]
    fn test_round_clock_never_goes_back() {
        let mut clock = RoundClock::new();
        assert_eq!(clock.next(100), 100);
        assert_eq!(clock.next(160), 160);
        assert_eq!(clock.next(90), 160);
        assert_eq!(clock.next(200), 200);

        let mut resumed = RoundClock::resume(Some(500));
        assert_eq!(resumed.next(400), 500);
    }

    #[test]
    fn test_report_summary() {
        let outcome = |id: &str, status: Status| PollOutcome {
            service: service(id),
            status: NormalizedStatus::new(status, ""),
        };
        let mut report = RoundReport {
            timestamp: 0,
            outcomes: vec![
                outcome("a", Status::Operational),
                outcome("b", Status::Outage),
                outcome("c", Status::Degraded),
            ],
            pruned: 0,
        };
        assert_eq!(report.to_string(), "polled 3 services; worst=B=outage");
        report.pruned = 4;
        assert_eq!(report.to_string(), "polled 3 services; worst=B=outage; pruned=4");
        assert_eq!(report.count(Status::Degraded), 1);
    }
}
