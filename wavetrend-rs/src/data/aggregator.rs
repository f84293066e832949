//! Tick → bar aggregation

use crate::data::{Bar, SeriesStore, Tick, Timeframe};
use crate::error::CoreError;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a tick did to a series
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationOutcome {
    /// A new bar opened; `sealed` is the bar it closed, if any
    Opened { bar: Bar, sealed: Option<Bar> },
    /// The current bar absorbed the tick
    Updated { bar: Bar },
    /// The tick belongs to an interval that is already sealed
    Dropped { bucket_start: i64, current: i64 },
}

impl AggregationOutcome {
    /// Whether the series tail changed
    pub fn changed_tail(&self) -> bool {
        !matches!(self, AggregationOutcome::Dropped { .. })
    }
}

/// Folds ticks into the current bar of each (instrument, timeframe) series.
///
/// Bar sealing is monotonic: once a later bucket opens, ticks for earlier
/// buckets are dropped and never reopen a sealed bar.
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    store: Arc<SeriesStore>,
}

impl CandleAggregator {
    pub fn new(store: Arc<SeriesStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SeriesStore> {
        &self.store
    }

    /// Apply one tick to one timeframe of its instrument.
    ///
    /// The boundary decision and the mutation run under a single write guard
    /// of the series.
    pub fn apply(&self, tick: &Tick, timeframe: Timeframe) -> Result<AggregationOutcome, CoreError> {
        tick.validate()?;
        let bucket_start = timeframe.bucket_start(tick.timestamp);

        let outcome = self
            .store
            .with_series_mut(&tick.instrument, timeframe, |series| -> Result<_, CoreError> {
                match series.current_bar().copied() {
                    Some(current) if bucket_start < current.timestamp => {
                        Ok(AggregationOutcome::Dropped {
                            bucket_start,
                            current: current.timestamp,
                        })
                    }
                    Some(current) if bucket_start == current.timestamp => {
                        let mut bar = current;
                        bar.apply_price(tick.price);
                        series.append_or_mutate(bar)?;
                        Ok(AggregationOutcome::Updated { bar })
                    }
                    sealed => {
                        let bar = Bar::from_price(bucket_start, tick.price);
                        series.append_or_mutate(bar)?;
                        Ok(AggregationOutcome::Opened { bar, sealed })
                    }
                }
            })??;

        match &outcome {
            AggregationOutcome::Opened { bar, sealed } => debug!(
                "Opened {} {} bar at {} (sealed {:?})",
                tick.instrument,
                timeframe,
                bar.timestamp,
                sealed.map(|b| b.timestamp)
            ),
            AggregationOutcome::Updated { bar } => debug!(
                "Updated {} {} bar at {}: close {}",
                tick.instrument, timeframe, bar.timestamp, bar.close
            ),
            AggregationOutcome::Dropped { bucket_start, current } => warn!(
                "Dropped late tick for {} {}: bucket {} is behind current bar {}",
                tick.instrument, timeframe, bucket_start, current
            ),
        }

        Ok(outcome)
    }

    /// Apply one tick to every timeframe; each timeframe is decided independently
    pub fn apply_all(
        &self,
        tick: &Tick,
        timeframes: &[Timeframe],
    ) -> Vec<(Timeframe, Result<AggregationOutcome, CoreError>)> {
        timeframes
            .iter()
            .map(|&timeframe| (timeframe, self.apply(tick, timeframe)))
            .collect()
    }
}
