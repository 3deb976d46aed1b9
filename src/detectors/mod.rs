//! Price-structure detectors
//!
//! Three independent detectors, each a pure function of one symbol's bars
//! evaluated at the latest bar:
//!
//! - **Liquidity sweep**: wick through a recent swing extreme, close back inside.
//! - **Order block + retest**: last opposite candle before a displacement, and
//!   how close price is to revisiting it.
//! - **Fair value gap**: three-bar imbalance that no later close has filled.
//!
//! Every detector answers per [`Direction`]; the engine asks for both sides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{config::DetectionConfig, Direction, Result, OHLCV};

pub mod fvg;
pub mod helpers;
pub mod order_block;
pub mod sweep;

pub use fvg::*;
pub use order_block::*;
pub use sweep::*;

// ============================================================
// SIGNAL TYPES
// ============================================================

/// Kind of structural signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalKind {
  LiquiditySweep,
  OrderBlockRetest,
  FairValueGap,
}

impl SignalKind {
  pub fn as_str(self) -> &'static str {
    match self {
      SignalKind::LiquiditySweep => "LIQUIDITY_SWEEP",
      SignalKind::OrderBlockRetest => "ORDER_BLOCK_RETEST",
      SignalKind::FairValueGap => "FAIR_VALUE_GAP",
    }
  }
}

/// Inclusive price range `[low, high]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
  pub low: f64,
  pub high: f64,
}

impl Zone {
  /// Builds a zone from two edges in either order.
  pub fn between(a: f64, b: f64) -> Self {
    Self { low: a.min(b), high: a.max(b) }
  }

  #[inline]
  pub fn height(&self) -> f64 {
    self.high - self.low
  }

  #[inline]
  pub fn contains(&self, price: f64) -> bool {
    self.low <= price && price <= self.high
  }

  /// Distance from `price` to the nearest edge; zero inside the zone.
  #[inline]
  pub fn distance(&self, price: f64) -> f64 {
    if price < self.low {
      self.low - price
    } else if price > self.high {
      price - self.high
    } else {
      0.0
    }
  }
}

/// Kind-specific payload of a [`StructureSignal`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SignalDetail {
  LiquiditySweep {
    /// Swing extreme that was swept
    swing_level: f64,
    swing_index: usize,
  },
  OrderBlockRetest {
    /// 1.0 = latest close inside the zone
    proximity: f64,
    displacement_index: usize,
  },
  FairValueGap {
    /// Mean true range the gap width was measured against
    atr: f64,
  },
}

/// A detected structure at the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureSignal {
  pub direction: Direction,
  /// Index (into the evaluated bars) of the bar that defines the signal
  pub anchor_index: usize,
  pub anchor_time: Option<DateTime<Utc>>,
  pub zone: Zone,
  /// Quality score 0.0..=1.0
  pub strength: f64,
  pub detail: SignalDetail,
}

impl StructureSignal {
  #[inline]
  pub fn kind(&self) -> SignalKind {
    match self.detail {
      SignalDetail::LiquiditySweep { .. } => SignalKind::LiquiditySweep,
      SignalDetail::OrderBlockRetest { .. } => SignalKind::OrderBlockRetest,
      SignalDetail::FairValueGap { .. } => SignalKind::FairValueGap,
    }
  }

  /// Retest proximity, only for order block signals
  #[inline]
  pub fn proximity(&self) -> Option<f64> {
    match self.detail {
      SignalDetail::OrderBlockRetest { proximity, .. } => Some(proximity),
      _ => None,
    }
  }
}

// ============================================================
// DETECTOR TRAIT
// ============================================================

/// A structure detector evaluated at the last bar of `bars`
pub trait StructureDetector: Send + Sync {
  fn kind(&self) -> SignalKind;

  /// Bars required before the detector can run
  fn min_bars(&self) -> usize;

  fn detect<T: OHLCV>(&self, bars: &[T], direction: Direction) -> Option<StructureSignal>;

  fn validate_config(&self) -> Result<()> {
    Ok(())
  }

  /// Both directions, bullish first
  fn detect_both<T: OHLCV>(&self, bars: &[T]) -> Vec<StructureSignal> {
    Direction::BOTH.iter().filter_map(|&d| self.detect(bars, d)).collect()
  }
}

// ============================================================
// BUILTIN DETECTORS - enum dispatch
// ============================================================

macro_rules! define_builtin_detectors {
  (
    $(
      $variant:ident($detector:ty)
    ),* $(,)?
  ) => {
    /// All builtin detectors - static dispatch via enum
    #[derive(Debug, Clone)]
    pub enum BuiltinDetector {
      $($variant($detector)),*
    }

    impl BuiltinDetector {
      #[inline]
      pub fn detect_both<T: OHLCV>(&self, bars: &[T]) -> Vec<StructureSignal> {
        match self {
          $(Self::$variant(d) => StructureDetector::detect_both(d, bars)),*
        }
      }

      #[inline]
      pub fn kind(&self) -> SignalKind {
        match self {
          $(Self::$variant(d) => StructureDetector::kind(d)),*
        }
      }

      #[inline]
      pub fn min_bars(&self) -> usize {
        match self {
          $(Self::$variant(d) => StructureDetector::min_bars(d)),*
        }
      }

      pub fn validate_config(&self) -> Result<()> {
        match self {
          $(Self::$variant(d) => StructureDetector::validate_config(d)),*
        }
      }
    }
  };
}

define_builtin_detectors! {
  LiquiditySweep(LiquiditySweepDetector),
  OrderBlock(OrderBlockDetector),
  FairValueGap(FairValueGapDetector),
}

impl BuiltinDetector {
  /// The three detectors configured from `config`, in evaluation order.
  pub fn from_config(config: &DetectionConfig) -> [BuiltinDetector; 3] {
    [
      BuiltinDetector::LiquiditySweep(LiquiditySweepDetector::from_config(config)),
      BuiltinDetector::OrderBlock(OrderBlockDetector::from_config(config)),
      BuiltinDetector::FairValueGap(FairValueGapDetector::from_config(config)),
    ]
  }
}

// ============================================================
// TESTS
// ============================================================
