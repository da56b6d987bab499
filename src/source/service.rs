//! Service descriptors and the closed set of source kinds.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Default mempool.space API base.
pub const MEMPOOL_API: &str = "https://mempool.space/api";

/// Broad family a source kind belongs to, used for grouping and headline counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Sources reporting service health.
    Status,
    /// Market readings (prices, rates, quotes).
    Market,
    /// Countdown-style readings (doomsday clock, forecast dates).
    Clock,
}

impl Family {
    pub fn label(self) -> &'static str {
        match self {
            Family::Status => "Status",
            Family::Market => "Markets",
            Family::Clock => "Clocks",
        }
    }
}

/// The kind of a source together with its typed settings.
///
/// Built once from configuration. An unrecognised `type` tag is kept as
/// [`SourceKind::Unsupported`] so the dashboard can still show the service.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Statuspage(StatuspageSettings),
    StatuspageComponent(ComponentSettings),
    Slack(SlackSettings),
    AwsRss(AwsRssSettings),
    GcpIncidents(GcpSettings),
    CoingeckoPrice(CoingeckoSettings),
    FxRate(FxSettings),
    StooqQuote(StooqSettings),
    BitcoinNetworkHealth(BitcoinSettings),
    DoomsdayClock(DoomsdaySettings),
    MetaculusDate(MetaculusSettings),
    ManifoldYearMarket(ManifoldSettings),
    Unsupported(String),
}

impl SourceKind {
    /// Build a kind from its configuration tag and settings bag.
    ///
    /// Fails when the settings do not fit the kind's typed settings.
    pub fn parse(tag: &str, settings: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let kind = match tag {
            "statuspage" => SourceKind::Statuspage(settings_of(settings)?),
            "statuspage_component" => SourceKind::StatuspageComponent(settings_of(settings)?),
            "slack" => SourceKind::Slack(settings_of(settings)?),
            "aws_rss" => SourceKind::AwsRss(settings_of(settings)?),
            "gcp_incidents" => SourceKind::GcpIncidents(settings_of(settings)?),
            "coingecko_price" => SourceKind::CoingeckoPrice(settings_of(settings)?),
            "fx_rate" => SourceKind::FxRate(settings_of(settings)?),
            "stooq_quote" => SourceKind::StooqQuote(settings_of(settings)?),
            "bitcoin_network_health" => SourceKind::BitcoinNetworkHealth(settings_of(settings)?),
            "doomsday_clock" => SourceKind::DoomsdayClock(settings_of(settings)?),
            "metaculus_date" => SourceKind::MetaculusDate(settings_of(settings)?),
            "manifold_year_market" => SourceKind::ManifoldYearMarket(settings_of(settings)?),
            other => SourceKind::Unsupported(other.to_string()),
        };
        Ok(kind)
    }

    /// The configuration tag of this kind.
    pub fn tag(&self) -> &str {
        match self {
            SourceKind::Statuspage(_) => "statuspage",
            SourceKind::StatuspageComponent(_) => "statuspage_component",
            SourceKind::Slack(_) => "slack",
            SourceKind::AwsRss(_) => "aws_rss",
            SourceKind::GcpIncidents(_) => "gcp_incidents",
            SourceKind::CoingeckoPrice(_) => "coingecko_price",
            SourceKind::FxRate(_) => "fx_rate",
            SourceKind::StooqQuote(_) => "stooq_quote",
            SourceKind::BitcoinNetworkHealth(_) => "bitcoin_network_health",
            SourceKind::DoomsdayClock(_) => "doomsday_clock",
            SourceKind::MetaculusDate(_) => "metaculus_date",
            SourceKind::ManifoldYearMarket(_) => "manifold_year_market",
            SourceKind::Unsupported(tag) => tag,
        }
    }

    pub fn family(&self) -> Family {
        match self {
            SourceKind::CoingeckoPrice(_) | SourceKind::FxRate(_) | SourceKind::StooqQuote(_) => {
                Family::Market
            }
            SourceKind::DoomsdayClock(_)
            | SourceKind::MetaculusDate(_)
            | SourceKind::ManifoldYearMarket(_) => Family::Clock,
            _ => Family::Status,
        }
    }

    /// Whether the source reports a numeric reading rather than health.
    pub fn is_metric(&self) -> bool {
        self.family() != Family::Status
    }

    /// Whether the reading is a forecast timestamp.
    pub fn is_date_clock(&self) -> bool {
        matches!(
            self,
            SourceKind::MetaculusDate(_) | SourceKind::ManifoldYearMarket(_)
        )
    }
}

fn settings_of<T: DeserializeOwned>(settings: &Map<String, Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(settings.clone()))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatuspageSettings {
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComponentSettings {
    pub base_url: String,
    #[serde(default)]
    pub component_match: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlackSettings {
    pub current_url: String,
    #[serde(default)]
    pub history_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AwsRssSettings {
    pub rss_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GcpSettings {
    pub incidents_url: String,
    #[serde(default)]
    pub product_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct CoingeckoSettings {
    pub asset_id: String,
    pub vs_currency: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct FxSettings {
    pub base: String,
    pub quote: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct StooqSettings {
    pub symbol: String,
}

/// Thresholds for the bitcoin network health check. Unset or zero values
/// fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct BitcoinSettings {
    pub api_base: Option<String>,
    pub stale_minutes_degraded: Option<i64>,
    pub stale_minutes_outage: Option<i64>,
    pub congestion_fee_sat_vb: Option<i64>,
    pub congestion_mempool_mb: Option<f64>,
}

impl BitcoinSettings {
    pub fn api_base(&self) -> &str {
        let base = self.api_base.as_deref().unwrap_or_default().trim();
        if base.is_empty() {
            MEMPOOL_API
        } else {
            base.trim_end_matches('/')
        }
    }

    pub fn stale_minutes_degraded(&self) -> i64 {
        positive_or(self.stale_minutes_degraded, 60)
    }

    pub fn stale_minutes_outage(&self) -> i64 {
        positive_or(self.stale_minutes_outage, 120)
    }

    pub fn congestion_fee_sat_vb(&self) -> i64 {
        positive_or(self.congestion_fee_sat_vb, 50)
    }

    pub fn congestion_mempool_mb(&self) -> f64 {
        self.congestion_mempool_mb
            .filter(|mb| *mb > 0.0)
            .unwrap_or(50.0)
    }
}

fn positive_or(value: Option<i64>, default: i64) -> i64 {
    value.filter(|v| *v > 0).unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct DoomsdaySettings {
    pub current_url: String,
    pub previous_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct MetaculusSettings {
    pub question_id: i64,
    pub aggregation: Option<String>,
    pub quantile: Option<f64>,
}

impl MetaculusSettings {
    pub fn aggregation(&self) -> &str {
        match self.aggregation.as_deref().map(str::trim) {
            Some(agg) if !agg.is_empty() => agg,
            _ => "recency_weighted",
        }
    }

    pub fn quantile(&self) -> f64 {
        self.quantile.filter(|q| *q != 0.0).unwrap_or(0.5)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ManifoldSettings {
    pub market_id: String,
}

/// An immutable descriptor of one polled source.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    /// Unique, stable key.
    pub id: String,
    /// Display name.
    pub name: String,
    pub kind: SourceKind,
    /// Every configuration key besides `id`, `name` and `type`.
    pub settings: Map<String, Value>,
}

impl Service {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        tag: &str,
        settings: Map<String, Value>,
    ) -> Result<Self, serde_json::Error> {
        let kind = SourceKind::parse(tag, &settings)?;
        Ok(Self {
            id: id.into(),
            name: name.into(),
            kind,
            settings,
        })
    }

    /// Explicit display group from the `group` setting.
    pub fn group(&self) -> Option<&str> {
        self.settings
            .get("group")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn parses_known_tags() {
        let kind = SourceKind::parse(
            "statuspage_component",
            &settings(json!({"base_url": "https://status.example.com", "component_match": ["API"]})),
        )
        .unwrap();
        assert_eq!(kind.tag(), "statuspage_component");
        assert_eq!(kind.family(), Family::Status);
        match kind {
            SourceKind::StatuspageComponent(s) => assert_eq!(s.component_match, vec!["API"]),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let kind = SourceKind::parse("carrier_pigeon", &Map::new()).unwrap();
        assert_eq!(kind, SourceKind::Unsupported("carrier_pigeon".to_string()));
        assert_eq!(kind.tag(), "carrier_pigeon");
        assert!(!kind.is_metric());
    }

    #[test]
    fn missing_required_setting_is_an_error() {
        assert!(SourceKind::parse("statuspage", &Map::new()).is_err());
        assert!(SourceKind::parse("aws_rss", &settings(json!({"rss_url": 5}))).is_err());
    }

    #[test]
    fn extra_keys_are_ignored() {
        let kind = SourceKind::parse(
            "fx_rate",
            &settings(json!({"base": "EUR", "quote": "USD", "group": "FX", "format": {"decimals": 4}})),
        )
        .unwrap();
        assert_eq!(kind.family(), Family::Market);
        assert!(kind.is_metric());
        assert!(!kind.is_date_clock());
    }

    #[test]
    fn bitcoin_defaults_apply_to_unset_and_zero() {
        let s: BitcoinSettings =
            serde_json::from_value(json!({"stale_minutes_outage": 0, "congestion_fee_sat_vb": 80}))
                .unwrap();
        assert_eq!(s.api_base(), MEMPOOL_API);
        assert_eq!(s.stale_minutes_degraded(), 60);
        assert_eq!(s.stale_minutes_outage(), 120);
        assert_eq!(s.congestion_fee_sat_vb(), 80);
        assert_eq!(s.congestion_mempool_mb(), 50.0);
    }

    #[test]
    fn metaculus_defaults() {
        let s = MetaculusSettings::default();
        assert_eq!(s.aggregation(), "recency_weighted");
        assert_eq!(s.quantile(), 0.5);
    }

    #[test]
    fn service_group_comes_from_settings() {
        let service = Service::new(
            "btc",
            "Bitcoin",
            "coingecko_price",
            settings(json!({"asset_id": "bitcoin", "vs_currency": "usd", "group": " Crypto "})),
        )
        .unwrap();
        assert_eq!(service.group(), Some("Crypto"));
        assert!(service.kind.is_metric());
    }
}
