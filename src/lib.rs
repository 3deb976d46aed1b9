//! # scalpscan - structure scanner for intraday scalping
//!
//! Converts intraday bars into typed structural signals (liquidity sweeps,
//! order block retests, fair value gaps), folds them together with EMA20/EMA50
//! trend context into a per-symbol composite score, ranks the watchlist and
//! decides whether an alert fires given time-of-day and cooldown rules.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use scalpscan::prelude::*;
//!
//! let engine = EngineBuilder::new().mode(Mode::Pro).build().unwrap();
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 9, 14, 30, 0).unwrap();
//! let bars: Vec<Bar> = (0..60)
//!     .map(|i| {
//!         let c = 100.0 + (i % 5) as f64 * 0.1;
//!         Bar::new(start + chrono::Duration::minutes(i), c, c + 0.2, c - 0.2, c, 1_000.0)
//!     })
//!     .collect();
//! let series = BarSeries::new("AAPL", bars).unwrap();
//!
//! let mut book = CooldownBook::new();
//! let now = start + chrono::Duration::minutes(60);
//! let batch = engine.scan([&series], &mut book, now);
//! assert!(batch.skipped.is_empty());
//! ```

pub mod bar;
pub mod composer;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod gate;
pub mod params;
pub mod trend;

pub mod prelude {
    pub use crate::{
        // Bars
        bar::{Bar, BarSeries},
        // Composer
        composer::{compose, rank, Exclusion, RankedEntry},
        // Config
        config::{DetectionConfig, Mode, TimeWindow, Weights, ZoneConvention},
        // Detectors
        detectors::*,
        // Engine
        engine::{evaluate, EngineBuilder, Evaluation, ScalpEngine, ScanBatch, SkippedSymbol, Watchlist},
        // Gate
        gate::{
            Alert, AlertGate, AlertLog, CooldownBook, CooldownState, GatePhase, Session, Suppression,
            TradePlan, DEFAULT_MAX_ALERTS_KEPT,
        },
        // Parameters
        params::{ParamMeta, ParamType, CONFIG_PARAMS},
        // Trend
        trend::{ema, ema_series, Trend, TrendContext},
        Direction,
        // Errors
        EngineError,
        OHLCVExt,
        Period,
        Ratio,
        Result,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the engine.
///
/// `InvalidValue`, `OutOfRange` and `InvalidConfig` are configuration errors:
/// they surface when a config is loaded or an engine is built, never mid-scan.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Invalid series at index {index}: {reason}")]
    InvalidSeries { index: usize, reason: &'static str },
}

impl EngineError {
    /// True for errors that can only come from a bad configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidValue(_)
                | EngineError::OutOfRange { .. }
                | EngineError::InvalidConfig(_)
        )
    }
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(EngineError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(EngineError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(EngineError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn body_low(&self) -> f64 {
        self.open().min(self.close())
    }

    #[inline]
    fn body_high(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Zero-range bar (high == low within epsilon)
    #[inline]
    fn is_degenerate(&self) -> bool {
        self.range() <= f64::EPSILON
    }

    /// True range against the previous close
    #[inline]
    fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => self
                .range()
                .max((self.high() - pc).abs())
                .max((self.low() - pc).abs()),
            None => self.range(),
        }
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let values = [self.open(), self.high(), self.low(), self.close(), self.volume()];
        if values.iter().any(|v| v.is_nan()) {
            return Err(EngineError::InvalidSeries {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(EngineError::InvalidSeries {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(EngineError::InvalidSeries {
                index: 0,
                reason: "high < low",
            });
        }
        if self.body_high() > self.high() || self.body_low() < self.low() {
            return Err(EngineError::InvalidSeries {
                index: 0,
                reason: "open/close outside [low, high]",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// DIRECTION
// ============================================================

/// Directional bias of a signal or alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }

    pub const BOTH: [Direction; 2] = [Direction::Bullish, Direction::Bearish];
}

// ============================================================
// TESTS
// ============================================================
