//! Series storage and retrieval

use crate::data::{Bar, BarSeries, Timeframe};
use crate::error::CoreError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of bars retained per series
pub const DEFAULT_MAX_BARS: usize = 500;

/// Storage key: instrument and timeframe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub instrument: String,
    pub timeframe: Timeframe,
}

impl SeriesKey {
    pub fn new(instrument: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            instrument: instrument.into(),
            timeframe,
        }
    }
}

/// In-memory bar storage, one independently locked series per key.
///
/// Mutation of a series happens under that series' write guard only, and
/// snapshots are copied under its read guard, so readers never observe a
/// half-updated bar. Distinct series never contend.
#[derive(Debug)]
pub struct SeriesStore {
    series: RwLock<HashMap<SeriesKey, Arc<RwLock<BarSeries>>>>,
    max_bars: usize,
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesStore {
    /// Create new storage
    pub fn new() -> Self {
        Self::with_max_bars(DEFAULT_MAX_BARS)
    }

    /// Create new storage retaining at most `max_bars` bars per series
    pub fn with_max_bars(max_bars: usize) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            max_bars,
        }
    }

    /// Retention cap applied to newly registered series
    pub fn max_bars(&self) -> usize {
        self.max_bars
    }

    /// Register a series. Registering an existing series is a no-op.
    pub fn register(&self, instrument: &str, timeframe: Timeframe) {
        let key = SeriesKey::new(instrument, timeframe);
        let mut series = self.series.write();
        if !series.contains_key(&key) {
            info!("Registered series {} {}", instrument, timeframe);
            series.insert(
                key,
                Arc::new(RwLock::new(BarSeries::new(instrument, timeframe, self.max_bars))),
            );
        }
    }

    pub fn is_registered(&self, instrument: &str, timeframe: Timeframe) -> bool {
        self.series
            .read()
            .contains_key(&SeriesKey::new(instrument, timeframe))
    }

    /// All registered keys
    pub fn keys(&self) -> Vec<SeriesKey> {
        self.series.read().keys().cloned().collect()
    }

    fn handle(&self, instrument: &str, timeframe: Timeframe) -> Result<Arc<RwLock<BarSeries>>, CoreError> {
        self.series
            .read()
            .get(&SeriesKey::new(instrument, timeframe))
            .cloned()
            .ok_or_else(|| CoreError::UnknownSeries {
                instrument: instrument.to_string(),
                timeframe: timeframe.label(),
            })
    }

    /// Run `f` with exclusive access to one series
    pub fn with_series_mut<R>(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        f: impl FnOnce(&mut BarSeries) -> R,
    ) -> Result<R, CoreError> {
        let handle = self.handle(instrument, timeframe)?;
        let mut series = handle.write();
        Ok(f(&mut series))
    }

    /// Run `f` with shared access to one series
    pub fn with_series<R>(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        f: impl FnOnce(&BarSeries) -> R,
    ) -> Result<R, CoreError> {
        let handle = self.handle(instrument, timeframe)?;
        let series = handle.read();
        Ok(f(&series))
    }

    /// Seed or replace a series with historical bars. Returns the number kept.
    pub fn upsert_historical(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> Result<usize, CoreError> {
        let received = bars.len();
        let kept = self.with_series_mut(instrument, timeframe, |series| series.replace_all(bars))?;
        info!(
            "Loaded {} historical bars for {} {} ({} received)",
            kept, instrument, timeframe, received
        );
        Ok(kept)
    }

    /// Most recent bar of a series
    pub fn current_bar(&self, instrument: &str, timeframe: Timeframe) -> Result<Option<Bar>, CoreError> {
        self.with_series(instrument, timeframe, |series| series.current_bar().copied())
    }

    /// Insert a new tail bar or merge into the current bar
    pub fn append_or_mutate(&self, instrument: &str, timeframe: Timeframe, bar: Bar) -> Result<(), CoreError> {
        self.with_series_mut(instrument, timeframe, |series| series.append_or_mutate(bar))??;
        debug!("Stored bar {} for {} {}", bar.timestamp, instrument, timeframe);
        Ok(())
    }

    /// Point-in-time copy of a series, newest first, capped at `max_len`
    pub fn snapshot(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        max_len: Option<usize>,
    ) -> Result<Vec<Bar>, CoreError> {
        self.with_series(instrument, timeframe, |series| series.snapshot(max_len))
    }

    /// Number of bars in a series
    pub fn series_len(&self, instrument: &str, timeframe: Timeframe) -> Result<usize, CoreError> {
        self.with_series(instrument, timeframe, |series| series.len())
    }

    /// Get number of stored bars across all series
    pub fn len(&self) -> usize {
        self.series.read().values().map(|s| s.read().len()).sum()
    }

    /// Check if storage holds no bars
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const M1: Timeframe = Timeframe::minutes(1);

    #[test]
    fn test_storage() {
        let store = SeriesStore::new();
        store.register("BTC/USDT", M1);

        store
            .append_or_mutate("BTC/USDT", M1, Bar::new(0, 100.0, 110.0, 95.0, 105.0, 1000.0))
            .unwrap();
        assert_eq!(store.len(), 1);

        let current = store.current_bar("BTC/USDT", M1).unwrap();
        assert_eq!(current.unwrap().close, 105.0);
    }

    #[test]
    fn test_unknown_series() {
        let store = SeriesStore::new();
        let err = store.current_bar("ETH/USDT", M1).unwrap_err();
        assert_eq!(
            err,
            CoreError::UnknownSeries {
                instrument: "ETH/USDT".to_string(),
                timeframe: "1m".to_string()
            }
        );
        assert!(store.snapshot("ETH/USDT", M1, None).is_err());
        assert!(store.upsert_historical("ETH/USDT", M1, Vec::new()).is_err());
    }

    #[test]
    fn test_register_is_idempotent() {
        let store = SeriesStore::new();
        store.register("BTC/USDT", M1);
        store
            .append_or_mutate("BTC/USDT", M1, Bar::from_price(0, 1.0))
            .unwrap();
        store.register("BTC/USDT", M1);
        assert_eq!(store.series_len("BTC/USDT", M1).unwrap(), 1);
    }

    #[test]
    fn test_upsert_historical_then_snapshot_newest_first() {
        let store = SeriesStore::new();
        store.register("BTC/USDT", M1);
        let bars = (0..10).rev().map(|i| Bar::from_price(i * 60_000, i as f64 + 1.0)).collect();
        assert_eq!(store.upsert_historical("BTC/USDT", M1, bars).unwrap(), 10);

        let snapshot = store.snapshot("BTC/USDT", M1, Some(4)).unwrap();
        let timestamps: Vec<i64> = snapshot.iter().map(|b| b.timestamp).collect();
        assert_eq!(timestamps, vec![540_000, 480_000, 420_000, 360_000]);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = SeriesStore::new();
        store.register("BTC/USDT", M1);
        store
            .append_or_mutate("BTC/USDT", M1, Bar::from_price(0, 10.0))
            .unwrap();
        let before = store.snapshot("BTC/USDT", M1, None).unwrap();
        store
            .append_or_mutate("BTC/USDT", M1, Bar::new(0, 10.0, 12.0, 10.0, 12.0, 0.0))
            .unwrap();
        assert_eq!(before[0].close, 10.0);
        assert_eq!(store.snapshot("BTC/USDT", M1, None).unwrap()[0].close, 12.0);
    }

    #[test]
    fn test_series_are_independent() {
        let store = SeriesStore::with_max_bars(10);
        store.register("BTC/USDT", M1);
        store.register("BTC/USDT", Timeframe::minutes(5));
        store
            .append_or_mutate("BTC/USDT", M1, Bar::from_price(120_000, 1.0))
            .unwrap();
        store
            .append_or_mutate("BTC/USDT", Timeframe::minutes(5), Bar::from_price(0, 1.0))
            .unwrap();
        assert_eq!(store.keys().len(), 2);
        assert_eq!(store.len(), 2);
    }
}
