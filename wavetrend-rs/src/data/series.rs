//! Ordered bar series for one (instrument, timeframe)

use crate::data::{Bar, Timeframe};
use crate::error::CoreError;
use std::collections::VecDeque;
use tracing::warn;

/// Bars of one instrument and timeframe, oldest first.
///
/// Timestamps are unique and strictly ascending. Only the last bar (the
/// current bar) may change; every earlier bar is sealed.
#[derive(Debug, Clone)]
pub struct BarSeries {
    instrument: String,
    timeframe: Timeframe,
    bars: VecDeque<Bar>,
    max_bars: usize,
}

impl BarSeries {
    /// Create new empty series keeping at most `max_bars` bars
    pub fn new(instrument: impl Into<String>, timeframe: Timeframe, max_bars: usize) -> Self {
        Self {
            instrument: instrument.into(),
            timeframe,
            bars: VecDeque::new(),
            max_bars: max_bars.max(1),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Get number of bars
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Check if series is empty
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent (still open) bar
    pub fn current_bar(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Bar opened at `timestamp`, if any
    pub fn get(&self, timestamp: i64) -> Option<&Bar> {
        self.bars
            .binary_search_by_key(&timestamp, |b| b.timestamp)
            .ok()
            .and_then(|idx| self.bars.get(idx))
    }

    /// Replace the whole series with historical bars.
    ///
    /// Sorts ascending and de-duplicates by timestamp with the last write
    /// winning, so an unordered or repeated batch still yields a valid series.
    /// Bars that fail validation are skipped. Returns the number kept.
    pub fn replace_all(&mut self, bars: Vec<Bar>) -> usize {
        let mut bars: Vec<Bar> = bars
            .into_iter()
            .filter(|bar| match bar.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping historical bar for {} {}: {}", self.instrument, self.timeframe, e);
                    false
                }
            })
            .collect();
        // stable: equal timestamps keep input order
        bars.sort_by_key(|b| b.timestamp);

        let mut deduped: VecDeque<Bar> = VecDeque::with_capacity(bars.len());
        for bar in bars {
            match deduped.back_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => deduped.push_back(bar),
            }
        }

        self.bars = deduped;
        self.enforce_retention();
        self.bars.len()
    }

    /// Insert `bar` as the new tail, or merge it into the current bar.
    pub fn append_or_mutate(&mut self, bar: Bar) -> Result<(), CoreError> {
        bar.validate()?;

        let Some(tail) = self.bars.back_mut() else {
            self.bars.push_back(bar);
            return Ok(());
        };

        if bar.timestamp > tail.timestamp {
            let gap = bar.timestamp - tail.timestamp;
            if gap > self.timeframe.interval_ms() {
                warn!(
                    "Gap in {} {}: {} missing bar(s) before {}",
                    self.instrument,
                    self.timeframe,
                    gap / self.timeframe.interval_ms() - 1,
                    bar.timestamp
                );
            }
            self.bars.push_back(bar);
            self.enforce_retention();
            return Ok(());
        }

        if bar.timestamp == tail.timestamp {
            tail.merge(&bar);
            return Ok(());
        }

        let tail_timestamp = tail.timestamp;
        if self.get(bar.timestamp).is_some() {
            Err(CoreError::SealedBar {
                instrument: self.instrument.clone(),
                timeframe: self.timeframe.label(),
                timestamp: bar.timestamp,
            })
        } else {
            Err(CoreError::StaleTimestamp {
                instrument: self.instrument.clone(),
                timeframe: self.timeframe.label(),
                timestamp: bar.timestamp,
                tail: tail_timestamp,
            })
        }
    }

    /// Copy of the last `max_len` bars (all when `None`), newest first
    pub fn snapshot(&self, max_len: Option<usize>) -> Vec<Bar> {
        let take = max_len.unwrap_or(self.bars.len());
        self.bars.iter().rev().take(take).copied().collect()
    }

    /// Copy of the last `max_len` bars (all when `None`), oldest first
    pub fn snapshot_chronological(&self, max_len: Option<usize>) -> Vec<Bar> {
        let take = max_len.unwrap_or(self.bars.len()).min(self.bars.len());
        self.bars.iter().skip(self.bars.len() - take).copied().collect()
    }

    /// Iterate bars oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    fn enforce_retention(&mut self) {
        while self.bars.len() > self.max_bars {
            self.bars.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> BarSeries {
        BarSeries::new("BTC/USDT", Timeframe::minutes(1), 500)
    }

    #[test]
    fn test_append_and_merge_tail() {
        let mut s = series();
        s.append_or_mutate(Bar::from_price(0, 10.0)).unwrap();
        s.append_or_mutate(Bar::new(0, 10.0, 12.0, 10.0, 11.0, 0.0)).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.current_bar().unwrap().high, 12.0);
        assert_eq!(s.current_bar().unwrap().close, 11.0);

        s.append_or_mutate(Bar::from_price(60_000, 11.0)).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.current_bar().unwrap().timestamp, 60_000);
    }

    #[test]
    fn test_stale_and_sealed() {
        let mut s = series();
        s.append_or_mutate(Bar::from_price(0, 10.0)).unwrap();
        s.append_or_mutate(Bar::from_price(120_000, 10.0)).unwrap();

        let err = s.append_or_mutate(Bar::from_price(60_000, 10.0)).unwrap_err();
        assert!(matches!(err, CoreError::StaleTimestamp { timestamp: 60_000, tail: 120_000, .. }));

        let err = s.append_or_mutate(Bar::from_price(0, 99.0)).unwrap_err();
        assert!(matches!(err, CoreError::SealedBar { timestamp: 0, .. }));
        assert_eq!(s.get(0).unwrap().close, 10.0);
    }

    #[test]
    fn test_gap_is_tolerated() {
        let mut s = series();
        s.append_or_mutate(Bar::from_price(0, 10.0)).unwrap();
        s.append_or_mutate(Bar::from_price(300_000, 10.0)).unwrap();
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_replace_all_sorts_and_dedups_last_wins() {
        let mut s = series();
        let kept = s.replace_all(vec![
            Bar::from_price(120_000, 3.0),
            Bar::from_price(0, 1.0),
            Bar::from_price(60_000, 2.0),
            Bar::from_price(60_000, 2.5),
            Bar::new(180_000, 1.0, 0.5, 2.0, 1.0, 0.0), // invalid, skipped
        ]);
        assert_eq!(kept, 3);
        let timestamps: Vec<i64> = s.iter().map(|b| b.timestamp).collect();
        assert_eq!(timestamps, vec![0, 60_000, 120_000]);
        assert_eq!(s.get(60_000).unwrap().close, 2.5);
    }

    #[test]
    fn test_retention() {
        let mut s = BarSeries::new("BTC/USDT", Timeframe::minutes(1), 3);
        for i in 0..5 {
            s.append_or_mutate(Bar::from_price(i * 60_000, 1.0)).unwrap();
        }
        assert_eq!(s.len(), 3);
        assert_eq!(s.iter().next().unwrap().timestamp, 120_000);
    }

    #[test]
    fn test_snapshots() {
        let mut s = series();
        for i in 0..5 {
            s.append_or_mutate(Bar::from_price(i * 60_000, i as f64 + 1.0)).unwrap();
        }
        let newest_first: Vec<i64> = s.snapshot(Some(3)).iter().map(|b| b.timestamp).collect();
        assert_eq!(newest_first, vec![240_000, 180_000, 120_000]);

        let oldest_first: Vec<i64> = s
            .snapshot_chronological(Some(3))
            .iter()
            .map(|b| b.timestamp)
            .collect();
        assert_eq!(oldest_first, vec![120_000, 180_000, 240_000]);

        assert_eq!(s.snapshot(None).len(), 5);
        assert_eq!(s.snapshot_chronological(Some(50)).len(), 5);
    }
}
