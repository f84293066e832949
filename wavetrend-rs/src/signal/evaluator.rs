//! Wave Trend state → consumer-facing signals

use crate::data::Timeframe;
use crate::indicators::{MovingAverageState, RsiDivergences, WaveTrendState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Signal classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// WT1 crossed above WT2
    BullishCross,
    /// WT1 crossed below WT2
    BearishCross,
    /// WT1 at or above overbought level 1
    StrongOverbought,
    /// WT1 at or above overbought level 2
    Overbought,
    /// WT1 at or below oversold level 1
    StrongOversold,
    /// WT1 at or below oversold level 2
    Oversold,
}

impl SignalKind {
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::BullishCross => "bullish cross",
            SignalKind::BearishCross => "bearish cross",
            SignalKind::StrongOverbought => "strongly overbought",
            SignalKind::Overbought => "overbought",
            SignalKind::StrongOversold => "strongly oversold",
            SignalKind::Oversold => "oversold",
        }
    }

    pub fn is_cross(&self) -> bool {
        matches!(self, SignalKind::BullishCross | SignalKind::BearishCross)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything computed for one series after one update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReport {
    pub instrument: String,
    pub timeframe: Timeframe,
    pub wave_trend: WaveTrendState,
    /// `None` until the slow SMA has enough bars
    pub moving_averages: Option<MovingAverageState>,
    /// `None` until RSI has enough bars
    pub rsi: Option<f64>,
    /// `None` below the divergence minimum
    pub divergences: Option<RsiDivergences>,
}

/// Signal delivered to a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub id: Uuid,
    pub instrument: String,
    pub timeframe: Timeframe,
    /// Open time of the bar that produced the signal
    pub bar_timestamp: i64,
    pub kinds: Vec<SignalKind>,
    pub report: IndicatorReport,
    pub created_at: DateTime<Utc>,
}

/// Stateless mapping from indicator output to signals
pub struct SignalEvaluator;

impl SignalEvaluator {
    /// Classify a reading: a cross first, then at most one zone, strongest first
    pub fn classify(state: &WaveTrendState) -> Vec<SignalKind> {
        let mut kinds = Vec::with_capacity(2);

        if state.cross_over {
            kinds.push(SignalKind::BullishCross);
        } else if state.cross_under {
            kinds.push(SignalKind::BearishCross);
        }

        if state.overbought1 {
            kinds.push(SignalKind::StrongOverbought);
        } else if state.overbought2 {
            kinds.push(SignalKind::Overbought);
        } else if state.oversold1 {
            kinds.push(SignalKind::StrongOversold);
        } else if state.oversold2 {
            kinds.push(SignalKind::Oversold);
        }

        kinds
    }

    /// Build an event for a report, or `None` when nothing is signalled
    pub fn evaluate(report: &IndicatorReport) -> Option<SignalEvent> {
        let kinds = Self::classify(&report.wave_trend);
        if kinds.is_empty() {
            return None;
        }

        Some(SignalEvent {
            id: Uuid::new_v4(),
            instrument: report.instrument.clone(),
            timeframe: report.timeframe,
            bar_timestamp: report.wave_trend.timestamp,
            kinds,
            report: report.clone(),
            created_at: Utc::now(),
        })
    }
}
