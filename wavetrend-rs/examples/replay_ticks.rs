//! Example: replay a synthetic tick stream through the signal pipeline

use std::sync::Arc;
use tracing::info;
use wavetrend_rs::prelude::*;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = PipelineConfig {
        timeframes: vec![Timeframe::minutes(1), Timeframe::minutes(5)],
        ..PipelineConfig::default()
    };
    let sink = Arc::new(CollectingSink::new());
    let pipeline = SignalPipeline::new(Arc::new(SeriesStore::new()), config, Box::new(sink.clone()))?;
    let instrument = pipeline.register("btcusdt")?;

    // Four hours of a slow sine wave, one tick every 5 seconds
    let ticks = (0..2_880i64).map(|i| {
        let price = 42_000.0 + 400.0 * (i as f64 / 240.0).sin() + 25.0 * (i as f64 / 7.0).cos();
        Tick::new(instrument.clone(), i * 5_000, price)
    });
    let events = pipeline.replay(ticks);
    info!("Replay produced {} signal events", events.len());

    for event in events.iter().filter(|e| e.kinds.iter().any(|k| k.is_cross())) {
        let kinds: Vec<String> = event.kinds.iter().map(|k| k.to_string()).collect();
        info!(
            "{} {} bar {}: {} (wt1 {:.2})",
            event.instrument,
            event.timeframe,
            event.bar_timestamp,
            kinds.join(", "),
            event.report.wave_trend.wt1
        );
    }

    for report in pipeline.reports() {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
