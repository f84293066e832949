use anyhow::Context;
use dotenv::dotenv;
use std::str::FromStr;
use wavetrend_rs::config::{PipelineConfig, WaveTrendConfig};
use wavetrend_rs::data::Timeframe;
use wavetrend_rs::exchange::BINANCE_REST_URL;

pub struct Config {
    pub symbols: Vec<String>,
    pub pipeline: PipelineConfig,
    pub backfill_limit: usize,
    pub report_interval_secs: u64,
    pub binance_rest_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        let defaults = PipelineConfig::default();
        let wt_defaults = WaveTrendConfig::default();

        let symbols = list("SYMBOLS", "BTC/USDT,ETH/USDT");
        let timeframes = match std::env::var("TIMEFRAMES") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<Timeframe>().with_context(|| format!("TIMEFRAMES: bad timeframe '{}'", s)))
                .collect::<Result<Vec<_>, _>>()?,
            Err(_) => defaults.timeframes.clone(),
        };

        let wave_trend = WaveTrendConfig {
            channel_length: parse_or("WT_CHANNEL_LENGTH", wt_defaults.channel_length)?,
            average_length: parse_or("WT_AVERAGE_LENGTH", wt_defaults.average_length)?,
            overbought1: parse_or("WT_OVERBOUGHT1", wt_defaults.overbought1)?,
            overbought2: parse_or("WT_OVERBOUGHT2", wt_defaults.overbought2)?,
            oversold1: parse_or("WT_OVERSOLD1", wt_defaults.oversold1)?,
            oversold2: parse_or("WT_OVERSOLD2", wt_defaults.oversold2)?,
        };

        let pipeline = PipelineConfig {
            wave_trend,
            timeframes,
            window: parse_or("WINDOW", defaults.window)?,
            max_bars: parse_or("MAX_BARS", defaults.max_bars)?,
            ..defaults
        };
        pipeline.validate()?;

        Ok(Config {
            symbols,
            pipeline,
            backfill_limit: parse_or("BACKFILL_LIMIT", 500)?,
            report_interval_secs: parse_or("REPORT_INTERVAL_SECS", 60)?,
            binance_rest_url: std::env::var("BINANCE_REST_URL").unwrap_or_else(|_| BINANCE_REST_URL.to_string()),
        })
    }
}

fn list(key: &str, default: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or<T>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("{}: invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
