//! The HTTP-backed source adapter.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use servicedash_types::NormalizedStatus;

use super::{
    aws, bitcoin, doomsday, forecast, gcp, markets, slack, statuspage, AdapterError, Service,
    SourceAdapter, SourceKind,
};

const USER_AGENT: &str = "servicedash/0.1";

/// Source adapter that talks to the real APIs over HTTP.
///
/// One shared [`Client`] serves every service; each request is bounded by
/// the client's connect and total timeouts.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Create an adapter with the default timeouts (connect 5s, total 10s).
    pub fn new() -> Result<Self, AdapterError> {
        Self::builder().build()
    }

    /// Create a new builder for configuring the adapter.
    pub fn builder() -> HttpSourceBuilder {
        HttpSourceBuilder::default()
    }

    /// GET a URL and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AdapterError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AdapterError::Status(response.status().as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))
    }

    /// GET a URL and return the body as text.
    pub(crate) async fn get_text(&self, url: &str) -> Result<String, AdapterError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AdapterError::Status(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SourceAdapter for HttpSource {
    async fn fetch(&self, service: &Service) -> Result<NormalizedStatus, AdapterError> {
        match &service.kind {
            SourceKind::Statuspage(s) => statuspage::fetch_overall(self, s).await,
            SourceKind::StatuspageComponent(s) => statuspage::fetch_components(self, s).await,
            SourceKind::Slack(s) => slack::fetch(self, s).await,
            SourceKind::AwsRss(s) => aws::fetch(self, s).await,
            SourceKind::GcpIncidents(s) => gcp::fetch(self, s).await,
            SourceKind::CoingeckoPrice(s) => markets::fetch_coingecko(self, s).await,
            SourceKind::FxRate(s) => markets::fetch_fx(self, s).await,
            SourceKind::StooqQuote(s) => markets::fetch_stooq(self, s).await,
            SourceKind::BitcoinNetworkHealth(s) => bitcoin::fetch(self, s).await,
            SourceKind::DoomsdayClock(s) => doomsday::fetch(self, s).await,
            SourceKind::MetaculusDate(s) => forecast::fetch_metaculus(self, s).await,
            SourceKind::ManifoldYearMarket(s) => forecast::fetch_manifold(self, s).await,
            SourceKind::Unsupported(tag) => Ok(NormalizedStatus::unknown(format!(
                "Unsupported service type: {tag}"
            ))),
        }
    }
}

/// Builder for [`HttpSource`].
#[derive(Debug, Default)]
pub struct HttpSourceBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl HttpSourceBuilder {
    /// Set the total request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connect timeout (default: 5 seconds).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the user agent (default: `servicedash/0.1`).
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<HttpSource, AdapterError> {
        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(10)))
            .connect_timeout(self.connect_timeout.unwrap_or(Duration::from_secs(5)))
            .user_agent(self.user_agent.unwrap_or_else(|| USER_AGENT.to_string()))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| AdapterError::Http(e.to_string()))?;

        Ok(HttpSource { client })
    }
}

/// Milliseconds elapsed since `started`.
pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
