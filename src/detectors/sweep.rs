//! Liquidity sweep (stop hunt) detector
//!
//! The current bar wicks beyond the most extreme high/low of the lookback
//! window and closes back inside it. Only the `lookback` bars right before the
//! current bar are consulted; older history never changes the outcome.

use crate::{config::DetectionConfig, Direction, EngineError, OHLCVExt, Result, OHLCV};

use super::{
  helpers::{self, swing_high, swing_low},
  SignalDetail, SignalKind, StructureDetector, StructureSignal, Zone,
};

/// Liquidity sweep detector
#[derive(Debug, Clone)]
pub struct LiquiditySweepDetector {
  /// Bars before the current bar used for the swing extremes
  pub lookback: usize,
}

impl Default for LiquiditySweepDetector {
  fn default() -> Self {
    Self { lookback: 15 }
  }
}

impl LiquiditySweepDetector {
  pub fn with_defaults() -> Self {
    Self::default()
  }

  pub fn from_config(config: &DetectionConfig) -> Self {
    Self { lookback: config.sweep_lookback.get() }
  }
}

impl StructureDetector for LiquiditySweepDetector {
  fn kind(&self) -> SignalKind {
    SignalKind::LiquiditySweep
  }

  fn min_bars(&self) -> usize {
    self.lookback + 1
  }

  fn validate_config(&self) -> Result<()> {
    if self.lookback == 0 {
      return Err(EngineError::InvalidValue("sweep lookback must be > 0"));
    }
    Ok(())
  }

  fn detect<T: OHLCV>(&self, bars: &[T], direction: Direction) -> Option<StructureSignal> {
    if self.lookback == 0 || bars.len() < self.min_bars() {
      return None;
    }
    let index = bars.len() - 1;
    let current = &bars[index];

    // Zero-range bar: nothing to measure
    if current.is_degenerate() {
      return None;
    }

    let offset = index - self.lookback;
    let window = &bars[offset..index];
    let range = current.range();

    let (swing_index, level, excursion, zone) = match direction {
      Direction::Bearish => {
        let (i, level) = swing_high(window)?;
        if !(current.high() > level && current.close() < level) {
          return None;
        }
        (i, level, current.high() - level, Zone::between(level, current.high()))
      },
      Direction::Bullish => {
        let (i, level) = swing_low(window)?;
        if !(current.low() < level && current.close() > level) {
          return None;
        }
        (i, level, level - current.low(), Zone::between(current.low(), level))
      },
    };

    Some(StructureSignal {
      direction,
      anchor_index: index,
      anchor_time: current.timestamp(),
      zone,
      strength: helpers::unit(excursion / range),
      detail: SignalDetail::LiquiditySweep { swing_level: level, swing_index: offset + swing_index },
    })
  }
}

// ============================================================
// TESTS
// ============================================================
