//! Market readings: CoinGecko prices, Frankfurter FX rates and Stooq quotes.

use std::time::Instant;

use chrono::{TimeZone, Utc};
use serde_json::Value;

use servicedash_types::NormalizedStatus;

use super::http::{elapsed_ms, HttpSource};
use super::service::{CoingeckoSettings, FxSettings, StooqSettings};
use super::AdapterError;

pub(crate) async fn fetch_coingecko(
    source: &HttpSource,
    settings: &CoingeckoSettings,
) -> Result<NormalizedStatus, AdapterError> {
    let asset_id = settings.asset_id.trim();
    let vs_currency = settings.vs_currency.trim().to_lowercase();
    if asset_id.is_empty() || vs_currency.is_empty() {
        return Ok(NormalizedStatus::unknown("Missing asset_id/vs_currency"));
    }

    let url = format!(
        "https://api.coingecko.com/api/v3/simple/price?ids={asset_id}&vs_currencies={vs_currency}&include_last_updated_at=true"
    );
    let started = Instant::now();
    let data: Value = source.get_json(&url).await?;
    Ok(coingecko_price(&data, asset_id, &vs_currency).with_latency_ms(elapsed_ms(started)))
}

pub(crate) fn coingecko_price(data: &Value, asset_id: &str, vs_currency: &str) -> NormalizedStatus {
    let Some(price) = data
        .get(asset_id)
        .and_then(|asset| asset.get(vs_currency))
        .and_then(Value::as_f64)
    else {
        return NormalizedStatus::unknown("Unexpected CoinGecko response");
    };

    let note = data
        .get(asset_id)
        .and_then(|asset| asset.get("last_updated_at"))
        .and_then(Value::as_i64)
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .map(|dt| {
            format!(
                "CoinGecko @ {}",
                dt.with_timezone(&chrono::Local).format("%H:%M:%S")
            )
        })
        .unwrap_or_else(|| "CoinGecko".to_string());

    NormalizedStatus::operational(note).with_value(price)
}

pub(crate) async fn fetch_fx(
    source: &HttpSource,
    settings: &FxSettings,
) -> Result<NormalizedStatus, AdapterError> {
    let base = settings.base.trim().to_uppercase();
    let quote = settings.quote.trim().to_uppercase();
    if base.is_empty() || quote.is_empty() {
        return Ok(NormalizedStatus::unknown("Missing base/quote"));
    }

    let url = format!("https://api.frankfurter.app/latest?from={base}&to={quote}");
    let started = Instant::now();
    let data: Value = source.get_json(&url).await?;
    Ok(fx_rate(&data, &quote).with_latency_ms(elapsed_ms(started)))
}

pub(crate) fn fx_rate(data: &Value, quote: &str) -> NormalizedStatus {
    let Some(rate) = data
        .get("rates")
        .and_then(|rates| rates.get(quote))
        .and_then(Value::as_f64)
    else {
        return NormalizedStatus::unknown("Unexpected FX response");
    };

    let note = match data.get("date").and_then(Value::as_str).map(str::trim) {
        Some(date) if !date.is_empty() => format!("Frankfurter {date}"),
        _ => "Frankfurter".to_string(),
    };
    NormalizedStatus::operational(note).with_value(rate)
}

pub(crate) async fn fetch_stooq(
    source: &HttpSource,
    settings: &StooqSettings,
) -> Result<NormalizedStatus, AdapterError> {
    let symbol = settings.symbol.trim();
    if symbol.is_empty() {
        return Ok(NormalizedStatus::unknown("Missing symbol"));
    }

    let url = format!("https://stooq.com/q/l/?s={symbol}&f=sd2t2ohlcv&h&e=csv");
    let started = Instant::now();
    let csv = source.get_text(&url).await?;
    Ok(stooq_quote(&csv).with_latency_ms(elapsed_ms(started)))
}

/// Read the close price from Stooq's single-row CSV (header + one row).
pub(crate) fn stooq_quote(csv: &str) -> NormalizedStatus {
    let mut lines = csv.lines().map(str::trim).filter(|l| !l.is_empty());
    let (Some(header), Some(row)) = (lines.next(), lines.next()) else {
        return NormalizedStatus::unknown("Stooq: empty");
    };

    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let values: Vec<&str> = row.split(',').map(str::trim).collect();
    let field = |name| csv_field(&columns, &values, name);

    let close = field("Close");
    if close.is_empty() || close.eq_ignore_ascii_case("N/D") {
        return NormalizedStatus::unknown("Stooq: N/D");
    }
    let Ok(value) = close.parse::<f64>() else {
        return NormalizedStatus::unknown("Stooq: parse error");
    };

    let (date, time) = (field("Date"), field("Time"));
    let note = if !date.is_empty()
        && !time.is_empty()
        && !date.eq_ignore_ascii_case("N/D")
        && !time.eq_ignore_ascii_case("N/D")
    {
        format!("Stooq {date} {time}")
    } else {
        "Stooq".to_string()
    };
    NormalizedStatus::operational(note).with_value(value)
}

fn csv_field<'a>(columns: &[&str], values: &[&'a str], name: &str) -> &'a str {
    columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .and_then(|i| values.get(i).copied())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use servicedash_types::Status;

    #[test]
    fn test_coingecko_price() {
        let data = json!({"bitcoin": {"usd": 64123.5}});
        let status = coingecko_price(&data, "bitcoin", "usd");
        assert_eq!(status.status, Status::Operational);
        assert_eq!(status.value, Some(64123.5));
        assert_eq!(status.message, "CoinGecko");

        let data = json!({"bitcoin": {"usd": 1, "last_updated_at": 1_700_000_000}});
        assert!(coingecko_price(&data, "bitcoin", "usd").message.starts_with("CoinGecko @ "));
    }

    #[test]
    fn test_coingecko_unexpected() {
        let status = coingecko_price(&json!({"bitcoin": {}}), "bitcoin", "usd");
        assert_eq!(status.status, Status::Unknown);
        assert!(status.value.is_none());
        let status = coingecko_price(&json!([]), "bitcoin", "usd");
        assert_eq!(status.message, "Unexpected CoinGecko response");
    }

    #[test]
    fn test_fx_rate() {
        let data = json!({"amount": 1.0, "base": "EUR", "date": "2024-05-01", "rates": {"USD": 1.0712}});
        let status = fx_rate(&data, "USD");
        assert_eq!(status.value, Some(1.0712));
        assert_eq!(status.message, "Frankfurter 2024-05-01");
        assert_eq!(fx_rate(&data, "JPY").status, Status::Unknown);
    }

    #[test]
    fn test_stooq_quote() {
        let csv = "Symbol,Date,Time,Open,High,Low,Close,Volume\r\n\
                   ^SPX,2024-05-01,22:00:00,5029.03,5096.12,5013.45,5018.39,2630190000\r\n";
        let status = stooq_quote(csv);
        assert_eq!(status.status, Status::Operational);
        assert_eq!(status.value, Some(5018.39));
        assert_eq!(status.message, "Stooq 2024-05-01 22:00:00");
    }

    #[test]
    fn test_stooq_missing_data() {
        let nd = "Symbol,Date,Time,Open,High,Low,Close,Volume\nXXX,N/D,N/D,N/D,N/D,N/D,N/D,N/D\n";
        assert_eq!(stooq_quote(nd).message, "Stooq: N/D");
        assert_eq!(stooq_quote("").message, "Stooq: empty");
        let bad = "Symbol,Close\nXXX,abc\n";
        assert_eq!(stooq_quote(bad).message, "Stooq: parse error");
    }
}
