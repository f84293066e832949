use anyhow::Result;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;
use wavetrend_rs::prelude::*;

mod config;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting Wave Trend signal bot...");

    let config = Config::from_env()?;
    let store = Arc::new(SeriesStore::with_max_bars(config.pipeline.max_bars));
    let pipeline = SignalPipeline::new(store, config.pipeline.clone(), Box::new(LogSink))?;

    let mut instruments = Vec::with_capacity(config.symbols.len());
    for symbol in &config.symbols {
        instruments.push(pipeline.register(symbol)?);
    }
    tracing::info!(
        "Tracking {} on {}",
        instruments.join(", "),
        config
            .pipeline
            .timeframes
            .iter()
            .map(|tf| tf.label())
            .collect::<Vec<_>>()
            .join(", ")
    );

    // Backfill before the live stream so the first ticks land on a warm series
    let client = BinanceKlineClient::new(&config.binance_rest_url, 30)?;
    for instrument in &instruments {
        for timeframe in &config.pipeline.timeframes {
            match client.fetch_klines(instrument, *timeframe, config.backfill_limit).await {
                Ok(bars) => {
                    if let Err(e) = pipeline.load_history(instrument, *timeframe, bars) {
                        tracing::warn!("Failed to load history for {} {}: {}", instrument, timeframe, e);
                    }
                }
                Err(e) => tracing::warn!("Backfill failed for {} {}: {:#}", instrument, timeframe, e),
            }
        }
    }

    let (streamer, mut ticks) = TickStreamer::binance(&instruments, DEFAULT_TICK_BUFFER)?;
    tracing::info!("Started {} trade streams", streamer.len());

    let mut summary = interval(Duration::from_secs(config.report_interval_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            tick = ticks.recv() => {
                match tick {
                    Some(tick) => {
                        pipeline.on_tick(&tick);
                    }
                    None => {
                        tracing::warn!("All trade streams ended, exiting...");
                        break;
                    }
                }
            }
            _ = summary.tick() => {
                log_summary(&pipeline);
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    log_summary(&pipeline);
    Ok(())
}

fn log_summary(pipeline: &SignalPipeline) {
    let now = chrono::Utc::now().format("%H:%M:%S");
    for report in pipeline.reports() {
        let wt = &report.wave_trend;
        let trend = report
            .moving_averages
            .map(|ma| if ma.fast_above_slow { "up" } else { "down" })
            .unwrap_or("n/a");
        tracing::info!(
            "[{}] {} {}: wt1 {:.2} wt2 {} rsi {} trend {}",
            now,
            report.instrument,
            report.timeframe,
            wt.wt1,
            wt.wt2.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "n/a".to_string()),
            report.rsi.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "n/a".to_string()),
            trend
        );
    }
}
