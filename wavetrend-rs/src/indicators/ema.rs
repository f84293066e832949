//! EMA (Exponential Moving Average) indicator

use crate::error::CoreError;
use crate::indicators::Indicator;

/// Recursive EMA seeded with the first input.
///
/// `ema[0] = x[0]`, `ema[i] = ema[i-1] + α·(x[i] − ema[i-1])` with
/// `α = 2/(period+1)`. This is `α·x + (1−α)·ema` rearranged so that a
/// constant input is an exact fixed point.
///
/// Not backed by `ta::indicators::ExponentialMovingAverage`: its
/// `k·x + (1−k)·prev` form drifts off a constant input by an ulp, which
/// turns a flat series into a non-zero deviation.
#[derive(Debug, Clone)]
pub struct EMA {
    period: usize,
    alpha: f64,
    current: Option<f64>,
    update_count: usize,
}

impl EMA {
    /// Create new EMA indicator
    pub fn new(period: usize) -> Result<Self, CoreError> {
        if period == 0 {
            return Err(CoreError::InvalidConfig("EMA period must be at least 1".to_string()));
        }
        Ok(Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            current: None,
            update_count: 0,
        })
    }

    /// Get EMA period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Smoothing factor
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Feed one value and return the updated average
    pub fn next(&mut self, value: f64) -> f64 {
        let ema = match self.current {
            None => value,
            Some(prev) => prev + self.alpha * (value - prev),
        };
        self.current = Some(ema);
        self.update_count += 1;
        ema
    }
}

impl Indicator for EMA {
    fn name(&self) -> &str {
        "EMA"
    }

    fn update(&mut self, value: f64) {
        self.next(value);
    }

    fn value(&self) -> Option<f64> {
        if self.is_ready() {
            self.current
        } else {
            None
        }
    }

    fn is_ready(&self) -> bool {
        self.update_count >= self.period
    }
}

/// EMA of every position of `values`, seeded with `values[0]`
pub fn ema_series(values: &[f64], period: usize) -> Result<Vec<f64>, CoreError> {
    let mut ema = EMA::new(period)?;
    Ok(values.iter().map(|&v| ema.next(v)).collect())
}
