//! Order block + retest detector
//!
//! A displacement bar has a body larger than `displacement_multiplier` times
//! the average body of the lookback window. The order block is the nearest
//! earlier bar of the opposite colour; its range (or body, per
//! [`ZoneConvention`]) is the zone. Retest proximity measures how close the
//! latest close sits to that zone.

use crate::{
  config::{DetectionConfig, ZoneConvention},
  Direction, EngineError, OHLCVExt, Result, OHLCV,
};

use super::{helpers, SignalDetail, SignalKind, StructureDetector, StructureSignal, Zone};

/// An identified order block, independent of the current price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderBlock {
  pub direction: Direction,
  /// Index of the opposite-colour candle that forms the zone
  pub block_index: usize,
  pub displacement_index: usize,
  pub zone: Zone,
  /// How far the displacement body cleared the threshold, 0.0..=1.0
  pub strength: f64,
}

impl OrderBlock {
  /// 1 - distance to the nearest edge / zone height, clamped; 1.0 inside the zone.
  pub fn proximity(&self, price: f64) -> f64 {
    if self.zone.contains(price) {
      return 1.0;
    }
    let height = self.zone.height();
    if height <= f64::EPSILON {
      return 0.0;
    }
    helpers::unit(1.0 - self.zone.distance(price) / height)
  }
}

/// Order block detector
#[derive(Debug, Clone)]
pub struct OrderBlockDetector {
  pub lookback: usize,
  pub displacement_multiplier: f64,
  pub zone_convention: ZoneConvention,
}

impl Default for OrderBlockDetector {
  fn default() -> Self {
    Self { lookback: 30, displacement_multiplier: 2.0, zone_convention: ZoneConvention::Wick }
  }
}

impl OrderBlockDetector {
  pub fn with_defaults() -> Self {
    Self::default()
  }

  pub fn from_config(config: &DetectionConfig) -> Self {
    Self {
      lookback: config.order_block_lookback.get(),
      displacement_multiplier: config.displacement_multiplier,
      zone_convention: config.zone_convention,
    }
  }

  fn zone_of<T: OHLCV>(&self, bar: &T) -> Zone {
    match self.zone_convention {
      ZoneConvention::Wick => Zone::between(bar.low(), bar.high()),
      ZoneConvention::Body => Zone::between(bar.open(), bar.close()),
    }
  }

  /// Locate the order block behind the most recent displacement in the window.
  ///
  /// When the newest displacement has no opposite-colour bar before it inside
  /// the window, older displacements are tried in turn.
  pub fn locate<T: OHLCV>(&self, bars: &[T]) -> Option<OrderBlock> {
    if self.lookback < 2 || bars.len() < self.lookback {
      return None;
    }
    let start = bars.len() - self.lookback;
    let window = &bars[start..];

    let avg_body = helpers::average_body(window)?;
    if avg_body <= f64::EPSILON {
      return None;
    }
    let threshold = avg_body * self.displacement_multiplier;

    for d in (start + 1..bars.len()).rev() {
      let displacement = &bars[d];
      let body = displacement.body();
      if body <= threshold {
        continue;
      }

      let direction = if displacement.is_bullish() { Direction::Bullish } else { Direction::Bearish };
      let opposite = |bar: &T| match direction {
        Direction::Bullish => bar.is_bearish(),
        Direction::Bearish => bar.is_bullish(),
      };

      if let Some(block_index) = (start..d).rev().find(|&j| opposite(&bars[j])) {
        return Some(OrderBlock {
          direction,
          block_index,
          displacement_index: d,
          zone: self.zone_of(&bars[block_index]),
          strength: helpers::unit(1.0 - threshold / body),
        });
      }
    }

    None
  }
}

impl StructureDetector for OrderBlockDetector {
  fn kind(&self) -> SignalKind {
    SignalKind::OrderBlockRetest
  }

  fn min_bars(&self) -> usize {
    self.lookback
  }

  fn validate_config(&self) -> Result<()> {
    if self.lookback < 2 {
      return Err(EngineError::InvalidValue("order block lookback must be >= 2"));
    }
    if !(self.displacement_multiplier.is_finite() && self.displacement_multiplier > 0.0) {
      return Err(EngineError::InvalidValue("displacement multiplier must be positive"));
    }
    Ok(())
  }

  fn detect<T: OHLCV>(&self, bars: &[T], direction: Direction) -> Option<StructureSignal> {
    let block = self.locate(bars)?;
    if block.direction != direction {
      return None;
    }
    let close = bars.last()?.close();

    Some(StructureSignal {
      direction,
      anchor_index: block.block_index,
      anchor_time: bars[block.block_index].timestamp(),
      zone: block.zone,
      strength: block.strength,
      detail: SignalDetail::OrderBlockRetest {
        proximity: block.proximity(close),
        displacement_index: block.displacement_index,
      },
    })
  }
}

// ============================================================
// TESTS
// ============================================================
