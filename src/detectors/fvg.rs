//! Fair value gap detector
//!
//! Three-bar imbalance: bar[i-2] and bar[i] do not overlap, leaving a price
//! range only the displacement bar bar[i-1] traded through. A gap is filled
//! once a later close trades back through its far edge; filled gaps are never
//! surfaced again.

use crate::{config::DetectionConfig, Direction, OHLCVExt, OHLCV};

use super::{helpers, SignalDetail, SignalKind, StructureDetector, StructureSignal, Zone};

/// A gap found in the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
  pub direction: Direction,
  /// Index of the third bar of the triplet
  pub index: usize,
  pub zone: Zone,
  pub filled: bool,
}

/// Fair value gap detector
#[derive(Debug, Clone)]
pub struct FairValueGapDetector {
  pub lookback: usize,
}

impl Default for FairValueGapDetector {
  fn default() -> Self {
    Self { lookback: 60 }
  }
}

impl FairValueGapDetector {
  pub fn with_defaults() -> Self {
    Self::default()
  }

  pub fn from_config(config: &DetectionConfig) -> Self {
    Self { lookback: config.fvg_lookback.get() }
  }

  #[inline]
  fn window_start(&self, len: usize) -> usize {
    len.saturating_sub(self.lookback)
  }

  /// Every gap whose triplet lies inside the window, oldest first.
  pub fn gaps<T: OHLCV>(&self, bars: &[T]) -> Vec<Gap> {
    let start = self.window_start(bars.len());
    (start + 2..bars.len()).filter_map(|i| self.gap_at(bars, i)).collect()
  }

  fn gap_at<T: OHLCV>(&self, bars: &[T], i: usize) -> Option<Gap> {
    let (first, middle, third) = (&bars[i - 2], &bars[i - 1], &bars[i]);
    if first.is_degenerate() || middle.is_degenerate() || third.is_degenerate() {
      return None;
    }

    let (direction, zone) = if first.high() < third.low() {
      (Direction::Bullish, Zone { low: first.high(), high: third.low() })
    } else if first.low() > third.high() {
      (Direction::Bearish, Zone { low: third.high(), high: first.low() })
    } else {
      return None;
    };

    let filled = bars[i + 1..].iter().any(|later| match direction {
      Direction::Bullish => later.close() <= zone.low,
      Direction::Bearish => later.close() >= zone.high,
    });

    Some(Gap { direction, index: i, zone, filled })
  }
}

impl StructureDetector for FairValueGapDetector {
  fn kind(&self) -> SignalKind {
    SignalKind::FairValueGap
  }

  fn min_bars(&self) -> usize {
    3
  }

  fn detect<T: OHLCV>(&self, bars: &[T], direction: Direction) -> Option<StructureSignal> {
    if self.lookback < 3 || bars.len() < self.min_bars() {
      return None;
    }
    let start = self.window_start(bars.len());

    // Most recent unfilled gap on this side
    let gap = (start + 2..bars.len())
      .rev()
      .filter_map(|i| self.gap_at(bars, i))
      .find(|g| g.direction == direction && !g.filled)?;

    let atr = helpers::average_true_range(bars, start)?;
    if atr <= f64::EPSILON {
      return None;
    }

    let anchor_index = gap.index - 1;
    Some(StructureSignal {
      direction,
      anchor_index,
      anchor_time: bars[anchor_index].timestamp(),
      zone: gap.zone,
      strength: helpers::unit(gap.zone.height() / atr),
      detail: SignalDetail::FairValueGap { atr },
    })
  }
}

// ============================================================
// TESTS
// ============================================================
