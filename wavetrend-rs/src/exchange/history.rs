//! Historical kline backfill from the Binance REST API

use crate::data::{normalize_pair, Bar, Timeframe};
use crate::Result;
use anyhow::{anyhow, bail, Context};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Binance spot REST endpoint
pub const BINANCE_REST_URL: &str = "https://api.binance.com";

/// Binance caps a single klines request at this many bars
pub const MAX_KLINE_LIMIT: usize = 1000;

/// Binance kline interval name for a timeframe, if Binance offers it
pub fn binance_interval(timeframe: Timeframe) -> Option<&'static str> {
    const MINUTE: i64 = 60_000;
    let interval = match timeframe.interval_ms() {
        ms if ms == MINUTE => "1m",
        ms if ms == 3 * MINUTE => "3m",
        ms if ms == 5 * MINUTE => "5m",
        ms if ms == 15 * MINUTE => "15m",
        ms if ms == 30 * MINUTE => "30m",
        ms if ms == 60 * MINUTE => "1h",
        ms if ms == 120 * MINUTE => "2h",
        ms if ms == 240 * MINUTE => "4h",
        ms if ms == 360 * MINUTE => "6h",
        ms if ms == 480 * MINUTE => "8h",
        ms if ms == 720 * MINUTE => "12h",
        ms if ms == 1_440 * MINUTE => "1d",
        ms if ms == 4_320 * MINUTE => "3d",
        ms if ms == 10_080 * MINUTE => "1w",
        _ => return None,
    };
    Some(interval)
}

/// "BTC/USDT" → "BTCUSDT"
pub fn binance_symbol(instrument: &str) -> Option<String> {
    normalize_pair(instrument).map(|(base, quote)| format!("{}{}", base, quote))
}

/// Parse a klines response body into ascending bars.
///
/// Each row is `[open_time, "open", "high", "low", "close", "volume", close_time, ...]`.
pub fn parse_klines(body: &Value) -> Result<Vec<Bar>> {
    let rows = body.as_array().ok_or_else(|| anyhow!("klines response is not an array"))?;

    let mut bars = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let fields = row
            .as_array()
            .ok_or_else(|| anyhow!("kline row {} is not an array", i))?;
        if fields.len() < 6 {
            bail!("kline row {} has {} fields, expected at least 6", i, fields.len());
        }

        let timestamp = fields[0]
            .as_i64()
            .ok_or_else(|| anyhow!("kline row {} has a non-integer open time", i))?;
        let number = |idx: usize, name: &str| -> Result<f64> {
            match &fields[idx] {
                Value::String(s) => s
                    .parse::<f64>()
                    .with_context(|| format!("kline row {} has an invalid {}", i, name)),
                Value::Number(n) => n
                    .as_f64()
                    .ok_or_else(|| anyhow!("kline row {} has an invalid {}", i, name)),
                _ => bail!("kline row {} has an invalid {}", i, name),
            }
        };

        bars.push(Bar::new(
            timestamp,
            number(1, "open")?,
            number(2, "high")?,
            number(3, "low")?,
            number(4, "close")?,
            number(5, "volume")?,
        ));
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Binance kline REST client
#[derive(Debug, Clone)]
pub struct BinanceKlineClient {
    base_url: String,
    client: reqwest::Client,
}

impl BinanceKlineClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn klines_url(&self, symbol: &str, interval: &str, limit: usize) -> String {
        format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url.trim_end_matches('/'),
            symbol,
            interval,
            limit.clamp(1, MAX_KLINE_LIMIT)
        )
    }

    /// Fetch the most recent `limit` bars, oldest first.
    ///
    /// The last bar is usually still open; the live stream keeps mutating it.
    pub async fn fetch_klines(&self, instrument: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Bar>> {
        let symbol = binance_symbol(instrument).ok_or_else(|| anyhow!("unrecognized instrument '{}'", instrument))?;
        let interval =
            binance_interval(timeframe).ok_or_else(|| anyhow!("Binance has no {} kline interval", timeframe))?;
        let url = self.klines_url(&symbol, interval, limit);
        debug!("Fetching klines: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to request klines for {}", instrument))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Binance klines request failed with status {}: {}", status, text);
        }

        let body: Value = response.json().await.context("Failed to decode klines response")?;
        let bars = parse_klines(&body)?;
        info!("Fetched {} {} klines for {}", bars.len(), timeframe, instrument);
        Ok(bars)
    }
}
