//! Configuration loading and validation.
//!
//! The configuration file (JSON by default) is layered with environment
//! overrides prefixed `SERVICEDASH_`, e.g. `SERVICEDASH_POLL_INTERVAL_SECONDS=60`.
//!
//! ```json
//! {
//!   "poll_interval_seconds": 300,
//!   "history_hours": 24,
//!   "database_path": "data/servicedash.sqlite3",
//!   "services": [
//!     {"id": "github", "name": "GitHub", "type": "statuspage",
//!      "base_url": "https://www.githubstatus.com"}
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::source::Service;

const ENV_PREFIX: &str = "SERVICEDASH";
const DEFAULT_DATABASE: &str = "data/servicedash.sqlite3";
const MIN_RETENTION_HOURS: u32 = 24;

fn default_poll_interval() -> u64 {
    300
}

fn default_history_hours() -> u32 {
    24
}

fn default_concurrency() -> usize {
    crate::poller::DEFAULT_CONCURRENCY
}

fn default_trend_buckets() -> usize {
    20
}

/// The file as written, before validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_poll_interval")]
    poll_interval_seconds: u64,
    #[serde(default = "default_history_hours")]
    history_hours: u32,
    retention_hours: Option<u32>,
    database_path: Option<PathBuf>,
    #[serde(default = "default_concurrency")]
    concurrency: usize,
    #[serde(default = "default_trend_buckets")]
    trend_buckets: usize,
    #[serde(default)]
    services: Vec<RawService>,
}

#[derive(Debug, Deserialize)]
struct RawService {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    /// Everything else belongs to the source kind.
    #[serde(flatten)]
    settings: Map<String, Value>,
}

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub poll_interval: Duration,
    /// Window shown by the display and used for analytics.
    pub history_hours: u32,
    /// Records older than this are pruned; never shorter than the history.
    pub retention_hours: u32,
    pub database_path: PathBuf,
    pub concurrency: usize,
    pub trend_buckets: usize,
    pub services: ServiceRegistry,
}

impl AppConfig {
    /// Load and validate the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("config file not found: {}", path.display());
        }
        let file = match path.extension() {
            Some(_) => File::from(path),
            None => File::from(path).format(FileFormat::Json),
        };
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_builder(Config::builder().add_source(file), base_dir)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse a JSON document; relative paths resolve against `base_dir`.
    pub fn parse(json: &str, base_dir: &Path) -> Result<Self> {
        Self::from_builder(
            Config::builder().add_source(File::from_str(json, FileFormat::Json)),
            base_dir,
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        base_dir: &Path,
    ) -> Result<Self> {
        let raw: RawConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Self::validate(raw, base_dir)
    }

    fn validate(raw: RawConfig, base_dir: &Path) -> Result<Self> {
        if raw.poll_interval_seconds == 0 {
            bail!("poll_interval_seconds must be positive");
        }
        if raw.concurrency == 0 {
            bail!("concurrency must be positive");
        }
        if raw.trend_buckets == 0 {
            bail!("trend_buckets must be positive");
        }

        let history_hours = raw.history_hours;
        let mut retention_hours = raw
            .retention_hours
            .unwrap_or_else(|| history_hours.max(MIN_RETENTION_HOURS));
        if retention_hours < history_hours {
            warn!(
                retention_hours,
                history_hours, "retention shorter than the history window; raising it"
            );
            retention_hours = history_hours;
        }

        let database_path = raw
            .database_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));
        let database_path = if database_path.is_absolute() {
            database_path
        } else {
            base_dir.join(database_path)
        };

        if raw.services.is_empty() {
            bail!("config must include a non-empty 'services' list");
        }
        let services = raw
            .services
            .into_iter()
            .enumerate()
            .map(|(i, svc)| {
                let (id, name, kind) = (svc.id.trim(), svc.name.trim(), svc.kind.trim());
                if id.is_empty() || name.is_empty() || kind.is_empty() {
                    bail!("service at index {i} must include 'id', 'name' and 'type'");
                }
                Service::new(id, name, kind, svc.settings)
                    .with_context(|| format!("invalid settings for service '{id}' ({kind})"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            poll_interval: Duration::from_secs(raw.poll_interval_seconds),
            history_hours,
            retention_hours,
            database_path,
            concurrency: raw.concurrency,
            trend_buckets: raw.trend_buckets,
            services: ServiceRegistry::from_services(services)?,
        })
    }

    /// Log file used while the display owns the terminal.
    pub fn log_path(&self) -> PathBuf {
        self.database_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("servicedash.log")
    }
}

/// A non-empty list of services with unique ids, in configuration order.
///
/// The poller only accepts services from a registry, so nothing is polled
/// before the whole list has been validated.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Vec<Arc<Service>>,
}

impl ServiceRegistry {
    pub fn from_services(services: Vec<Service>) -> Result<Self> {
        if services.is_empty() {
            bail!("no services configured");
        }
        let mut seen = HashSet::new();
        for service in &services {
            if !seen.insert(service.id.as_str()) {
                bail!("duplicate service id '{}'", service.id);
            }
        }
        Ok(Self {
            services: services.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn services(&self) -> &[Arc<Service>] {
        &self.services
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Service>> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"{
        "services": [
            {"id": "github", "name": "GitHub", "type": "statuspage",
             "base_url": "https://www.githubstatus.com", "group": "Dev"},
            {"id": "btc_usd", "name": "BTC/USD", "type": "coingecko_price",
             "asset_id": "bitcoin", "vs_currency": "usd",
             "format": {"prefix": "$", "thousands": true}}
        ]
    }"#;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::parse(MINIMAL, Path::new("/etc/servicedash")).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(300));
        assert_eq!(cfg.history_hours, 24);
        assert_eq!(cfg.retention_hours, 24);
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.trend_buckets, 20);
        assert_eq!(
            cfg.database_path,
            Path::new("/etc/servicedash/data/servicedash.sqlite3")
        );
        assert_eq!(cfg.log_path(), Path::new("/etc/servicedash/data/servicedash.log"));

        assert_eq!(cfg.services.len(), 2);
        let github = cfg.services.get("github").unwrap();
        assert_eq!(github.group(), Some("Dev"));
        assert!(matches!(github.kind, SourceKind::Statuspage(_)));
        assert!(cfg.services.get("btc_usd").unwrap().settings.contains_key("format"));
    }

    #[test]
    fn test_retention_follows_history() {
        let json = MINIMAL.replacen('{', r#"{"history_hours": 48, "#, 1);
        let cfg = AppConfig::parse(&json, Path::new(".")).unwrap();
        assert_eq!(cfg.retention_hours, 48);

        let json = MINIMAL.replacen('{', r#"{"history_hours": 72, "retention_hours": 24, "#, 1);
        let cfg = AppConfig::parse(&json, Path::new(".")).unwrap();
        assert_eq!(cfg.retention_hours, 72);
    }

    #[test]
    fn test_rejects_invalid_services() {
        let base = Path::new(".");
        assert!(AppConfig::parse(r#"{"services": []}"#, base).is_err());
        assert!(AppConfig::parse(r#"{"poll_interval_seconds": 60}"#, base).is_err());

        let blank = r#"{"services": [{"id": " ", "name": "X", "type": "statuspage", "base_url": "u"}]}"#;
        assert!(AppConfig::parse(blank, base).is_err());

        let duplicate = r#"{"services": [
            {"id": "a", "name": "A", "type": "fx_rate"},
            {"id": "a", "name": "B", "type": "fx_rate"}
        ]}"#;
        let err = AppConfig::parse(duplicate, base).unwrap_err();
        assert!(err.to_string().contains("duplicate service id"));

        let missing_url = r#"{"services": [{"id": "a", "name": "A", "type": "statuspage"}]}"#;
        assert!(AppConfig::parse(missing_url, base).is_err());
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let json = r#"{"services": [{"id": "x", "name": "X", "type": "pagerduty"}]}"#;
        let cfg = AppConfig::parse(json, Path::new(".")).unwrap();
        let service = cfg.services.get("x").unwrap();
        assert_eq!(service.kind, SourceKind::Unsupported("pagerduty".to_string()));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let json = MINIMAL.replacen('{', r#"{"poll_interval_seconds": 0, "#, 1);
        assert!(AppConfig::parse(&json, Path::new(".")).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("servicedash.json");
        std::fs::write(&path, MINIMAL).unwrap();

        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.database_path, dir.path().join("data/servicedash.sqlite3"));
        assert!(AppConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
