//! Canonical bar data
//!
//! [`Bar`] is the normalized OHLCV record the engine consumes and
//! [`BarSeries`] is the validated, time-ordered sequence of bars for one symbol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, OHLCVExt, Result, OHLCV};

/// One OHLCV bar with a UTC timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.timestamp)
    }
}

/// Validated, strictly time-ordered bars for a single symbol.
///
/// Construction rejects duplicate or out-of-order timestamps and bars whose
/// prices are not finite or not internally consistent. The series is
/// immutable afterwards; the engine only ever borrows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                EngineError::InvalidSeries { reason, .. } => {
                    EngineError::InvalidSeries { index: i, reason }
                }
                other => other,
            })?;
        }

        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp == pair[0].timestamp {
                return Err(EngineError::InvalidSeries {
                    index: i + 1,
                    reason: "duplicate timestamp",
                });
            }
            if pair[1].timestamp < pair[0].timestamp {
                return Err(EngineError::InvalidSeries {
                    index: i + 1,
                    reason: "timestamps not increasing",
                });
            }
        }

        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Fails with `InsufficientData` unless the series holds at least `need` bars.
    pub fn require(&self, need: usize) -> Result<()> {
        if self.bars.len() < need {
            return Err(EngineError::InsufficientData {
                need,
                got: self.bars.len(),
            });
        }
        Ok(())
    }

    /// The trailing `n` bars (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }
}

// ============================================================
// TESTS
// ============================================================
