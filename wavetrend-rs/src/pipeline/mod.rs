//! Signal pipeline
//!
//! Wires the pieces together for every tick:
//! tick → [`CandleAggregator`] → [`SeriesStore`] → [`WaveTrendEngine`]
//! → [`SignalEvaluator`] → [`SignalSink`].
//!
//! Each series has its own lock, held from the store mutation through the
//! report and signal for that update, so concurrent callers never publish a
//! report older than the bars already in the store.
//!
//! Errors for a single tick are logged and skipped; nothing here stops the
//! hosting process.

use crate::config::{PipelineConfig, WaveTrendConfig};
use crate::data::{canonical_instrument, AggregationOutcome, Bar, CandleAggregator, SeriesKey, SeriesStore, Tick, Timeframe};
use crate::error::CoreError;
use crate::indicators::{compute_moving_averages, compute_rsi_divergences, latest_rsi, WaveTrendEngine};
use crate::signal::{IndicatorReport, SignalEvaluator, SignalEvent, SignalKind, SignalSink};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Streaming Wave Trend signal pipeline
pub struct SignalPipeline {
    store: Arc<SeriesStore>,
    aggregator: CandleAggregator,
    config: RwLock<PipelineConfig>,
    engine: RwLock<WaveTrendEngine>,
    sink: Box<dyn SignalSink>,
    /// One mutator per series
    series_locks: Mutex<HashMap<SeriesKey, Arc<Mutex<()>>>>,
    reports: RwLock<HashMap<SeriesKey, IndicatorReport>>,
    /// Last emitted signal set per series, keyed by bar
    last_emitted: Mutex<HashMap<SeriesKey, (i64, Vec<SignalKind>)>>,
}

impl SignalPipeline {
    pub fn new(store: Arc<SeriesStore>, config: PipelineConfig, sink: Box<dyn SignalSink>) -> Result<Self, CoreError> {
        config.validate()?;
        if store.max_bars() < config.window {
            warn!(
                "Store keeps {} bars per series, fewer than the {}-bar window",
                store.max_bars(),
                config.window
            );
        }
        let engine = WaveTrendEngine::new(config.wave_trend.clone())?;

        Ok(Self {
            aggregator: CandleAggregator::new(store.clone()),
            store,
            config: RwLock::new(config),
            engine: RwLock::new(engine),
            sink,
            series_locks: Mutex::new(HashMap::new()),
            reports: RwLock::new(HashMap::new()),
            last_emitted: Mutex::new(HashMap::new()),
        })
    }

    pub fn store(&self) -> &Arc<SeriesStore> {
        &self.store
    }

    pub fn config(&self) -> PipelineConfig {
        self.config.read().clone()
    }

    /// Register an instrument on every configured timeframe.
    ///
    /// Returns the canonical "BASE/QUOTE" name that ticks are matched against.
    pub fn register(&self, instrument: &str) -> Result<String, CoreError> {
        let name = canonical_instrument(instrument)
            .ok_or_else(|| CoreError::InvalidConfig(format!("unrecognized instrument '{}'", instrument)))?;
        for timeframe in self.config.read().timeframes.iter().copied() {
            self.store.register(&name, timeframe);
        }
        Ok(name)
    }

    /// Seed a series from history and compute its first report without emitting
    pub fn load_history(&self, instrument: &str, timeframe: Timeframe, bars: Vec<Bar>) -> Result<usize, CoreError> {
        let name = canonical_instrument(instrument).unwrap_or_else(|| instrument.to_string());
        let lock = self.series_lock(&name, timeframe);
        let _guard = lock.lock();

        let kept = self.store.upsert_historical(&name, timeframe, bars)?;
        match self.recompute_locked(&name, timeframe) {
            Ok(_) => {}
            Err(e) if e.is_warm_up() => debug!("{} {} still warming up: {}", name, timeframe, e),
            Err(e) => return Err(e),
        }
        Ok(kept)
    }

    /// Replace the Wave Trend parameters; applies to the next computation
    pub fn update_wave_trend_config(&self, wave_trend: WaveTrendConfig) -> Result<(), CoreError> {
        let mut config = self.config.write();
        let candidate = PipelineConfig {
            wave_trend: wave_trend.clone(),
            ..config.clone()
        };
        candidate.validate()?;
        self.engine.write().set_config(wave_trend)?;
        *config = candidate;
        info!("Wave Trend configuration updated");
        Ok(())
    }

    /// Feed one tick through every timeframe; returns the events emitted
    pub fn on_tick(&self, tick: &Tick) -> Vec<SignalEvent> {
        let instrument = canonical_instrument(&tick.instrument).unwrap_or_else(|| tick.instrument.clone());
        let tick = Tick {
            instrument,
            ..tick.clone()
        };
        let timeframes = self.config.read().timeframes.clone();

        let mut events = Vec::new();
        for timeframe in timeframes {
            let lock = self.series_lock(&tick.instrument, timeframe);
            let _guard = lock.lock();

            match self.aggregator.apply(&tick, timeframe) {
                Ok(AggregationOutcome::Dropped { .. }) => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!("Skipping tick for {} {}: {}", tick.instrument, timeframe, e);
                    continue;
                }
            }

            let report = match self.recompute_locked(&tick.instrument, timeframe) {
                Ok(report) => report,
                Err(e) if e.is_warm_up() => {
                    debug!("{} {} warming up: {}", tick.instrument, timeframe, e);
                    continue;
                }
                Err(e) => {
                    warn!("Indicator computation failed for {} {}: {}", tick.instrument, timeframe, e);
                    continue;
                }
            };

            if let Some(event) = self.evaluate(&report) {
                events.push(event);
            }
        }
        events
    }

    /// Feed a sequence of ticks in order; returns every event emitted
    pub fn replay<I>(&self, ticks: I) -> Vec<SignalEvent>
    where
        I: IntoIterator<Item = Tick>,
    {
        ticks.into_iter().flat_map(|tick| self.on_tick(&tick)).collect()
    }

    /// Recompute indicators for one series from its trailing window
    pub fn recompute(&self, instrument: &str, timeframe: Timeframe) -> Result<IndicatorReport, CoreError> {
        let lock = self.series_lock(instrument, timeframe);
        let _guard = lock.lock();
        self.recompute_locked(instrument, timeframe)
    }

    fn series_lock(&self, instrument: &str, timeframe: Timeframe) -> Arc<Mutex<()>> {
        self.series_locks
            .lock()
            .entry(SeriesKey::new(instrument, timeframe))
            .or_default()
            .clone()
    }

    /// Caller holds the series lock
    fn recompute_locked(&self, instrument: &str, timeframe: Timeframe) -> Result<IndicatorReport, CoreError> {
        let (window, sma_fast, sma_slow, rsi_period) = {
            let config = self.config.read();
            (config.window, config.sma_fast, config.sma_slow, config.rsi_period)
        };
        let engine = self.engine.read().clone();

        // newest first; the engine orders it itself
        let mut bars = self.store.snapshot(instrument, timeframe, Some(window))?;
        let wave_trend = engine.compute(&bars)?;

        bars.reverse();
        let moving_averages = match compute_moving_averages(&bars, sma_fast, sma_slow) {
            Ok(state) => Some(state),
            Err(e) if e.is_warm_up() => None,
            Err(e) => return Err(e),
        };
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let rsi = latest_rsi(&closes, rsi_period)?;
        let divergences = match compute_rsi_divergences(&bars, rsi_period) {
            Ok(found) => Some(found),
            Err(e) if e.is_warm_up() => None,
            Err(e) => return Err(e),
        };

        let report = IndicatorReport {
            instrument: instrument.to_string(),
            timeframe,
            wave_trend,
            moving_averages,
            rsi,
            divergences,
        };
        self.reports
            .write()
            .insert(SeriesKey::new(instrument, timeframe), report.clone());
        Ok(report)
    }

    /// Last computed report for a series
    pub fn latest_report(&self, instrument: &str, timeframe: Timeframe) -> Option<IndicatorReport> {
        let name = canonical_instrument(instrument).unwrap_or_else(|| instrument.to_string());
        self.reports.read().get(&SeriesKey::new(name, timeframe)).cloned()
    }

    /// All computed reports
    pub fn reports(&self) -> Vec<IndicatorReport> {
        let mut reports: Vec<IndicatorReport> = self.reports.read().values().cloned().collect();
        reports.sort_by(|a, b| {
            a.instrument
                .cmp(&b.instrument)
                .then(a.timeframe.cmp(&b.timeframe))
        });
        reports
    }

    fn evaluate(&self, report: &IndicatorReport) -> Option<SignalEvent> {
        let event = SignalEvaluator::evaluate(report)?;
        let key = SeriesKey::new(&event.instrument, event.timeframe);

        {
            let mut last = self.last_emitted.lock();
            if let Some((bar, kinds)) = last.get(&key) {
                if *bar == event.bar_timestamp && *kinds == event.kinds {
                    return None;
                }
            }
            last.insert(key, (event.bar_timestamp, event.kinds.clone()));
        }

        if let Err(e) = self.sink.emit(event.clone()) {
            warn!("Signal sink rejected event {}: {}", event.id, e);
        }
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::CollectingSink;
    use anyhow::anyhow;

    const MINUTE: i64 = 60_000;

    fn pipeline_with(sink: Arc<CollectingSink>) -> SignalPipeline {
        let config = PipelineConfig {
            timeframes: vec![Timeframe::minutes(1)],
            ..PipelineConfig::default()
        };
        let pipeline = SignalPipeline::new(Arc::new(SeriesStore::new()), config, Box::new(sink)).unwrap();
        pipeline.register("BTCUSDT").unwrap();
        pipeline
    }

    fn ticks(closes: &[f64]) -> Vec<Tick> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &price)| Tick::new("BTC/USDT", i as i64 * MINUTE + 1_000, price))
            .collect()
    }

    fn up_then_down() -> Vec<f64> {
        (0..40)
            .map(|i| 100.0 + i as f64)
            .chain((0..40).map(|i| 139.0 - i as f64))
            .collect()
    }

    #[test]
    fn test_register_normalizes() {
        let sink = Arc::new(CollectingSink::new());
        let pipeline = pipeline_with(sink);
        assert!(pipeline.store().is_registered("BTC/USDT", Timeframe::minutes(1)));
        assert!(pipeline.register("???").is_err());
    }

    #[test]
    fn test_warm_up_is_silent() {
        let sink = Arc::new(CollectingSink::new());
        let pipeline = pipeline_with(sink.clone());
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();

        assert!(pipeline.replay(ticks(&closes)).is_empty());
        assert!(sink.is_empty());
        assert!(pipeline.latest_report("BTC/USDT", Timeframe::minutes(1)).is_none());
    }

    #[test]
    fn test_zone_events() {
        let sink = Arc::new(CollectingSink::new());
        let pipeline = pipeline_with(sink.clone());

        let events = pipeline.replay(ticks(&up_then_down()));
        assert_eq!(events.len(), 42);
        assert_eq!(sink.len(), 42);

        assert_eq!(events[0].kinds, vec![SignalKind::StrongOverbought]);
        assert_eq!(events[0].bar_timestamp, 20 * MINUTE);
        let overbought = events.iter().find(|e| e.kinds == vec![SignalKind::Overbought]).unwrap();
        assert_eq!(overbought.bar_timestamp, 43 * MINUTE);
        let oversold = events.iter().find(|e| e.kinds == vec![SignalKind::Oversold]).unwrap();
        assert_eq!(oversold.bar_timestamp, 62 * MINUTE);
        assert_eq!(events.last().unwrap().kinds, vec![SignalKind::StrongOversold]);

        let report = pipeline.latest_report("btcusdt", Timeframe::minutes(1)).unwrap();
        assert_eq!(report.wave_trend.timestamp, 79 * MINUTE);
        assert!(report.wave_trend.oversold1);
        assert!(report.rsi.is_some());
        assert!(report.moving_averages.is_none());
        assert!(report.divergences.is_some());
    }

    #[test]
    fn test_cross_events() {
        let sink = Arc::new(CollectingSink::new());
        let pipeline = pipeline_with(sink);
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + 10.0 * (i as f64 * 2.0 * std::f64::consts::PI / 30.0).sin())
            .collect();

        let events = pipeline.replay(ticks(&closes));
        let bars_with = |kind: SignalKind| -> Vec<i64> {
            events
                .iter()
                .filter(|e| e.kinds.contains(&kind))
                .map(|e| e.bar_timestamp / MINUTE)
                .collect()
        };

        assert_eq!(bars_with(SignalKind::BullishCross), vec![26, 55, 85, 115]);
        assert_eq!(bars_with(SignalKind::BearishCross), vec![40, 70, 100]);
    }

    #[test]
    fn test_duplicate_tick_not_reemitted() {
        let sink = Arc::new(CollectingSink::new());
        let pipeline = pipeline_with(sink.clone());
        let all = ticks(&up_then_down()[..30]);
        let last = all[all.len() - 1].clone();

        pipeline.replay(all);
        let before = sink.len();
        assert!(before > 0);

        assert!(pipeline.on_tick(&last).is_empty());
        assert_eq!(sink.len(), before);
    }

    #[test]
    fn test_late_and_invalid_ticks_are_skipped() {
        let sink = Arc::new(CollectingSink::new());
        let pipeline = pipeline_with(sink);
        pipeline.replay(ticks(&up_then_down()[..25]));
        let tail = pipeline.store().current_bar("BTC/USDT", Timeframe::minutes(1)).unwrap();

        assert!(pipeline.on_tick(&Tick::new("BTC/USDT", 1_000, 1.0)).is_empty());
        assert!(pipeline.on_tick(&Tick::new("BTC/USDT", 30 * MINUTE, f64::NAN)).is_empty());
        assert!(pipeline.on_tick(&Tick::new("ETH/USDT", 30 * MINUTE, 10.0)).is_empty());
        assert_eq!(
            pipeline.store().current_bar("BTC/USDT", Timeframe::minutes(1)).unwrap(),
            tail
        );
    }

    #[test]
    fn test_load_history_reports_without_emitting() {
        let sink = Arc::new(CollectingSink::new());
        let pipeline = pipeline_with(sink.clone());
        let bars: Vec<Bar> = up_then_down()
            .into_iter()
            .enumerate()
            .map(|(i, c)| Bar::new(i as i64 * MINUTE, c, c + 0.5, c - 0.5, c, 1.0))
            .collect();

        assert_eq!(pipeline.load_history("BTC/USDT", Timeframe::minutes(1), bars).unwrap(), 80);
        assert!(sink.is_empty());
        let report = pipeline.latest_report("BTC/USDT", Timeframe::minutes(1)).unwrap();
        assert_eq!(report.wave_trend.timestamp, 79 * MINUTE);
    }

    #[test]
    fn test_update_wave_trend_config() {
        let sink = Arc::new(CollectingSink::new());
        let pipeline = pipeline_with(sink);
        let config = WaveTrendConfig {
            channel_length: 5,
            average_length: 8,
            ..WaveTrendConfig::default()
        };
        pipeline.update_wave_trend_config(config.clone()).unwrap();
        assert_eq!(pipeline.config().wave_trend, config);

        let bad = WaveTrendConfig {
            channel_length: 0,
            ..WaveTrendConfig::default()
        };
        assert!(pipeline.update_wave_trend_config(bad).is_err());
        assert_eq!(pipeline.config().wave_trend, config);

        // shorter lengths warm up sooner
        let closes: Vec<f64> = (0..9).map(|i| 100.0 + i as f64).collect();
        pipeline.replay(ticks(&closes));
        assert!(pipeline.latest_report("BTC/USDT", Timeframe::minutes(1)).is_some());
    }

    #[test]
    fn test_concurrent_ticks_keep_latest_report_current() {
        use std::sync::atomic::{AtomicI64, Ordering};
        use std::thread;

        let sink = Arc::new(CollectingSink::new());
        let pipeline = Arc::new(pipeline_with(sink));
        let m1 = Timeframe::minutes(1);
        let history: Vec<Bar> = (0..60)
            .map(|i| {
                let c = 100.0 + 10.0 * (i as f64 / 5.0).sin();
                Bar::new(i as i64 * MINUTE, c, c + 0.5, c - 0.5, c, 1.0)
            })
            .collect();
        pipeline.load_history("BTC/USDT", m1, history).unwrap();

        // 15 s apart, so a bar seals every fourth tick
        let clock = Arc::new(AtomicI64::new(60 * MINUTE));
        let workers: Vec<_> = (0..4)
            .map(|w| {
                let pipeline = pipeline.clone();
                let clock = clock.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        let ts = clock.fetch_add(15_000, Ordering::SeqCst);
                        let price = 100.0 + ((w * 200 + i) % 37) as f64;
                        pipeline.on_tick(&Tick::new("BTC/USDT", ts, price));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let window = pipeline.config().window;
        let bars = pipeline.store().snapshot("BTC/USDT", m1, Some(window)).unwrap();
        let expected = WaveTrendEngine::default().compute(&bars).unwrap();
        let report = pipeline.latest_report("BTC/USDT", m1).unwrap();

        assert_eq!(report.wave_trend.timestamp, expected.timestamp);
        assert_eq!(report.wave_trend.wt1, expected.wt1);
        assert_eq!(report.wave_trend, expected);
    }

    struct FailingSink;

    impl SignalSink for FailingSink {
        fn emit(&self, _event: SignalEvent) -> anyhow::Result<()> {
            Err(anyhow!("unavailable"))
        }
    }

    #[test]
    fn test_sink_failure_does_not_stop_pipeline() {
        let config = PipelineConfig {
            timeframes: vec![Timeframe::minutes(1)],
            ..PipelineConfig::default()
        };
        let pipeline = SignalPipeline::new(Arc::new(SeriesStore::new()), config, Box::new(FailingSink)).unwrap();
        pipeline.register("BTC/USDT").unwrap();

        let events = pipeline.replay(ticks(&up_then_down()));
        assert_eq!(events.len(), 42);
    }

    #[test]
    fn test_pipeline_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SignalPipeline>();
    }
}
