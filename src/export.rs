//! JSON export of the current per-service digest.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::analytics::Digest;
use crate::app::{load_views, ServiceView};
use crate::config::AppConfig;
use crate::store::Store;
use crate::timeutil::now_ts;

/// The exported document.
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub generated_at: i64,
    pub last_poll: Option<i64>,
    pub services: Vec<ServiceExport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ServiceExport<'a> {
    pub id: &'a str,
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub group: &'a str,
    #[serde(flatten)]
    pub digest: &'a Digest,
}

impl<'a> ExportDocument<'a> {
    pub fn new(views: &'a [ServiceView], last_poll: Option<i64>, generated_at: i64) -> Self {
        Self {
            generated_at,
            last_poll,
            services: views
                .iter()
                .map(|v| ServiceExport {
                    id: &v.service.id,
                    name: &v.service.name,
                    kind: v.service.kind.tag(),
                    group: &v.group,
                    digest: &v.digest,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize export")
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Entry point of the `export` command.
pub async fn run(config: AppConfig, out: &Path) -> Result<()> {
    let store = Store::open(&config.database_path)
        .await
        .with_context(|| format!("failed to open database {}", config.database_path.display()))?;

    let now = now_ts();
    let loaded = async {
        let views = load_views(
            &store,
            &config.services,
            now,
            config.history_hours,
            config.trend_buckets,
        )
        .await?;
        let last_poll = store.last_round_timestamp().await?;
        Ok::<_, crate::store::StoreError>((views, last_poll))
    }
    .await;
    store.close().await;
    let (views, last_poll) = loaded.context("failed to read poll history")?;

    ExportDocument::new(&views, last_poll, now).write(out)?;
    info!(services = views.len(), path = %out.display(), "exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::{Map, Value};
    use servicedash_types::{NormalizedStatus, PollRecord};

    use crate::app::group_for;
    use crate::source::Service;

    #[test]
    fn test_document_shape() {
        let service = Arc::new(Service::new("btc", "BTC/USD", "coingecko_price", Map::new()).unwrap());
        let history = vec![
            PollRecord::new(100, "btc", "BTC/USD", NormalizedStatus::operational("CoinGecko").with_value(10.0)),
            PollRecord::new(200, "btc", "BTC/USD", NormalizedStatus::operational("CoinGecko").with_value(11.0)),
        ];
        let views = vec![ServiceView {
            group: group_for(&service),
            service,
            digest: Digest::derive(history.last().cloned(), &history, 300, 1, 2),
        }];

        let json = ExportDocument::new(&views, Some(200), 300).to_json().unwrap();
        let doc: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(doc["generated_at"], 300);
        assert_eq!(doc["last_poll"], 200);

        let btc = &doc["services"][0];
        assert_eq!(btc["id"], "btc");
        assert_eq!(btc["type"], "coingecko_price");
        assert_eq!(btc["group"], "Markets");
        assert_eq!(btc["samples"], 2);
        assert_eq!(btc["latest"]["status"], "operational");
        assert_eq!(btc["change"]["last"], 11.0);
        assert_eq!(btc["range"]["low"], 10.0);
    }
}
