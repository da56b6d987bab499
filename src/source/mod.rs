//! Source adapters: turning one external API into a [`NormalizedStatus`].
//!
//! This module provides a trait-based abstraction over every kind of polled
//! source (status pages, incident feeds, price and forecast APIs). The
//! closed [`SourceKind`] set decides which payload interpreter runs; the
//! [`HttpSource`] adapter performs the requests.
//!
//! ## Submodules
//!
//! - `statuspage`, `slack`, `aws`, `gcp`: incident and status feeds
//! - `markets`, `bitcoin`: numeric market readings and network health
//! - `doomsday`, `forecast`: clocks counting toward a date or midnight
//!
//! Each submodule keeps its payload interpretation in a pure function so it
//! can be tested on fixtures without the network.

mod aws;
mod bitcoin;
mod doomsday;
mod error;
mod forecast;
mod gcp;
mod http;
mod markets;
mod service;
mod slack;
mod statuspage;

pub use error::AdapterError;
pub use http::{HttpSource, HttpSourceBuilder};
pub use service::{
    AwsRssSettings, BitcoinSettings, CoingeckoSettings, ComponentSettings, DoomsdaySettings,
    Family, FxSettings, GcpSettings, ManifoldSettings, MetaculusSettings, Service, SlackSettings,
    SourceKind, StatuspageSettings, StooqSettings, MEMPOOL_API,
};

use async_trait::async_trait;

use servicedash_types::NormalizedStatus;

/// Trait for fetching the current state of one service.
///
/// Implementations perform a single bounded attempt: no internal retries,
/// and a request must not outlive its own timeout. Any failure is returned
/// as an [`AdapterError`]; the poller turns it into an `Unknown` status.
///
/// # Example
///
/// ```no_run
/// use servicedash::source::{HttpSource, Service, SourceAdapter};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = serde_json::json!({"base_url": "https://www.githubstatus.com"});
/// let service = Service::new(
///     "github",
///     "GitHub",
///     "statuspage",
///     settings.as_object().cloned().unwrap_or_default(),
/// )?;
/// let status = HttpSource::new()?.fetch(&service).await?;
/// println!("{}: {}", status.status, status.message);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Fetch and normalize the service's current state.
    async fn fetch(&self, service: &Service) -> Result<NormalizedStatus, AdapterError>;
}
