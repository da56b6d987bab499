//! Bitcoin network health from a mempool.space-compatible API.

use std::time::Instant;

use serde_json::Value;

use servicedash_types::{NormalizedStatus, Status};

use super::http::{elapsed_ms, HttpSource};
use super::service::BitcoinSettings;
use super::AdapterError;
use crate::timeutil::now_ts;

pub(crate) async fn fetch(
    source: &HttpSource,
    settings: &BitcoinSettings,
) -> Result<NormalizedStatus, AdapterError> {
    let base = settings.api_base();
    let (blocks_url, mempool_url, fees_url) = (
        format!("{base}/blocks"),
        format!("{base}/mempool"),
        format!("{base}/v1/fees/recommended"),
    );

    let started = Instant::now();
    let fetched = tokio::try_join!(
        source.get_json::<Value>(&blocks_url),
        source.get_json::<Value>(&mempool_url),
        source.get_json::<Value>(&fees_url),
    );
    let latency_ms = elapsed_ms(started);

    let status = match fetched {
        Ok((blocks, mempool, fees)) => {
            let snapshot = NetworkSnapshot::from_payloads(&blocks, &mempool, &fees);
            assess(snapshot, now_ts(), settings)
        }
        Err(err) => {
            tracing::debug!(error = %err, "bitcoin fetch failed");
            NormalizedStatus::unknown("Bitcoin: fetch error")
        }
    };
    Ok(status.with_latency_ms(latency_ms))
}

/// The readings pulled out of the three API payloads.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NetworkSnapshot {
    BlocksUnparseable,
    BlockTimeMissing,
    Readings {
        tip_timestamp: i64,
        mempool_count: Option<i64>,
        mempool_vsize: Option<f64>,
        fastest_fee: Option<i64>,
    },
}

impl NetworkSnapshot {
    pub(crate) fn from_payloads(blocks: &Value, mempool: &Value, fees: &Value) -> Self {
        let Some(tip) = blocks.as_array().and_then(|b| b.first()).filter(|b| b.is_object()) else {
            return NetworkSnapshot::BlocksUnparseable;
        };
        let Some(tip_timestamp) = tip.get("timestamp").and_then(as_i64) else {
            return NetworkSnapshot::BlockTimeMissing;
        };
        NetworkSnapshot::Readings {
            tip_timestamp,
            mempool_count: mempool.get("count").and_then(as_i64),
            mempool_vsize: mempool.get("vsize").and_then(Value::as_f64),
            fastest_fee: fees.get("fastestFee").and_then(as_i64),
        }
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Grade the network: a stale tip degrades or takes the network down, and
/// congestion (high fees or a large mempool) degrades it.
pub(crate) fn assess(snapshot: NetworkSnapshot, now: i64, settings: &BitcoinSettings) -> NormalizedStatus {
    let (tip_timestamp, mempool_count, mempool_vsize, fastest_fee) = match snapshot {
        NetworkSnapshot::BlocksUnparseable => {
            return NormalizedStatus::unknown("Bitcoin: blocks parse error")
        }
        NetworkSnapshot::BlockTimeMissing => {
            return NormalizedStatus::unknown("Bitcoin: block time missing")
        }
        NetworkSnapshot::Readings {
            tip_timestamp,
            mempool_count,
            mempool_vsize,
            fastest_fee,
        } => (tip_timestamp, mempool_count, mempool_vsize, fastest_fee),
    };

    let age_min = ((now - tip_timestamp) / 60).max(0);
    let mempool_mb = mempool_vsize.map(|vsize| vsize / 1_000_000.0);

    let mut status = if age_min >= settings.stale_minutes_outage() {
        Status::Outage
    } else if age_min >= settings.stale_minutes_degraded() {
        Status::Degraded
    } else {
        Status::Operational
    };

    if status != Status::Outage {
        let fee_congested = fastest_fee.is_some_and(|fee| fee >= settings.congestion_fee_sat_vb());
        let mempool_congested = mempool_mb.is_some_and(|mb| mb >= settings.congestion_mempool_mb());
        if fee_congested || mempool_congested {
            status = Status::Degraded;
        }
    }

    let mut parts = vec![format!("blk {age_min}m")];
    match (mempool_mb, mempool_count) {
        (Some(mb), Some(count)) => parts.push(format!("mem {mb:.1}MB/{}k", count / 1000)),
        (Some(mb), None) => parts.push(format!("mem {mb:.1}MB")),
        _ => {}
    }
    if let Some(fee) = fastest_fee {
        parts.push(format!("fee {fee} sat/vB"));
    }
    NormalizedStatus::new(status, parts.join(" "))
}
