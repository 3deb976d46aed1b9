//! Detection configuration
//!
//! All knobs carry defaults; [`DetectionConfig::validate`] is the single
//! place configuration errors are raised, so a config that made it into an
//! engine can never fail mid-scan.

use std::collections::HashMap;

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    params::{self, get_period, get_ratio, get_scalar},
    EngineError, Period, Ratio, Result,
};

/// Signal mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Any nonzero composite score is eligible
    #[default]
    Basic,
    /// Requires a liquidity sweep or qualifying order block retest
    Pro,
}

/// Which part of the order block candle defines the zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneConvention {
    /// Full candle range: [low, high]
    #[default]
    Wick,
    /// Candle body only: [min(open, close), max(open, close)]
    Body,
}

/// Composite score weights; all non-negative, not all zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub trend: f64,
    pub sweep: f64,
    pub retest: f64,
    pub fvg: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            trend: 1.0,
            sweep: 1.0,
            retest: 1.0,
            fvg: 1.0,
        }
    }
}

impl Weights {
    #[inline]
    pub fn total(&self) -> f64 {
        self.trend + self.sweep + self.retest + self.fvg
    }
}

const fn at(hour: u32, min: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, min, 0) {
        Some(t) => t,
        None => panic!("invalid preset time"),
    }
}

/// Half-open exchange-local time-of-day window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(EngineError::InvalidConfig(format!(
                "time window start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Opening 90 minutes, 09:30-11:00
    pub const OPENING: Self = Self::hm((9, 30), (11, 0));
    /// Midday chop, 11:00-15:00
    pub const MIDDAY: Self = Self::hm((11, 0), (15, 0));
    /// Power hour, 15:00-16:00
    pub const POWER: Self = Self::hm((15, 0), (16, 0));

    // Only used in const items, so a bad preset fails to compile.
    const fn hm(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start: at(start.0, start.1),
            end: at(end.0, end.1),
        }
    }

    pub fn opening() -> Self {
        Self::OPENING
    }

    pub fn midday() -> Self {
        Self::MIDDAY
    }

    pub fn power() -> Self {
        Self::POWER
    }

    #[inline]
    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t < self.end
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Bars before the current bar searched for swing extremes
    pub sweep_lookback: Period,
    pub order_block_lookback: Period,
    pub fvg_lookback: Period,
    pub atr_period: Period,
    /// Relative EMA spread below which the trend is flat (0.0005 = 0.05%)
    pub trend_epsilon: f64,
    pub displacement_multiplier: f64,
    pub zone_convention: ZoneConvention,
    pub retest_threshold: Ratio,
    pub min_composite_score: Ratio,
    pub cooldown_secs: u64,
    pub exchange_tz: Tz,
    /// Suppress alerts on Saturdays and Sundays (exchange-local)
    pub trading_days_only: bool,
    pub mode: Mode,
    pub weights: Weights,
    /// Exchange-local windows in which alerts may fire
    pub windows: Vec<TimeWindow>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sweep_lookback: Period::new_const(15),
            order_block_lookback: Period::new_const(30),
            fvg_lookback: Period::new_const(60),
            atr_period: Period::new_const(14),
            trend_epsilon: 0.0005,
            displacement_multiplier: 2.0,
            zone_convention: ZoneConvention::Wick,
            retest_threshold: Ratio::new_const(0.6),
            min_composite_score: Ratio::new_const(0.0),
            cooldown_secs: 420,
            exchange_tz: chrono_tz::America::New_York,
            trading_days_only: true,
            mode: Mode::Basic,
            weights: Weights::default(),
            windows: vec![TimeWindow::opening(), TimeWindow::power()],
        }
    }
}

impl DetectionConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| EngineError::InvalidConfig(format!("parse config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::InvalidConfig(format!("serialize config: {e}")))
    }

    #[inline]
    pub fn cooldown(&self) -> Duration {
        i64::try_from(self.cooldown_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Numeric parameters by name, in the order of [`params::CONFIG_PARAMS`].
    pub fn numeric_params(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("sweep_lookback", self.sweep_lookback.get() as f64),
            ("order_block_lookback", self.order_block_lookback.get() as f64),
            ("fvg_lookback", self.fvg_lookback.get() as f64),
            ("atr_period", self.atr_period.get() as f64),
            ("trend_epsilon", self.trend_epsilon),
            ("displacement_multiplier", self.displacement_multiplier),
            ("retest_threshold", self.retest_threshold.get()),
            ("weight_trend", self.weights.trend),
            ("weight_sweep", self.weights.sweep),
            ("weight_retest", self.weights.retest),
            ("weight_fvg", self.weights.fvg),
            ("min_composite_score", self.min_composite_score.get()),
            ("cooldown_secs", self.cooldown_secs as f64),
        ]
    }

    /// Reject out-of-range values, an all-zero weight vector and malformed windows.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.numeric_params() {
            let meta = params::find(name)
                .ok_or_else(|| EngineError::InvalidConfig(format!("unknown parameter {name}")))?;
            meta.validate(value)?;
        }

        let w = &self.weights;
        for (name, weight) in [("trend", w.trend), ("sweep", w.sweep), ("retest", w.retest), ("fvg", w.fvg)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "weight {name} must be a non-negative number, got {weight}"
                )));
            }
        }
        if self.weights.total() <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "at least one composite weight must be positive".into(),
            ));
        }

        if self.windows.is_empty() {
            return Err(EngineError::InvalidConfig(
                "at least one time-of-day window is required".into(),
            ));
        }
        for w in &self.windows {
            TimeWindow::new(w.start, w.end)?;
        }

        Ok(())
    }

    /// Override numeric parameters by name. Unknown names are rejected.
    pub fn with_params(self, overrides: &HashMap<&str, f64>) -> Result<Self> {
        if let Some(unknown) = overrides.keys().find(|k| params::find(k).is_none()) {
            return Err(EngineError::InvalidConfig(format!(
                "unknown parameter {unknown}"
            )));
        }

        let cooldown = get_scalar(overrides, "cooldown_secs", self.cooldown_secs as f64);
        params::find("cooldown_secs")
            .map(|meta| meta.validate(cooldown))
            .transpose()?;

        let config = Self {
            sweep_lookback: get_period(overrides, "sweep_lookback", self.sweep_lookback.get())?,
            order_block_lookback: get_period(
                overrides,
                "order_block_lookback",
                self.order_block_lookback.get(),
            )?,
            fvg_lookback: get_period(overrides, "fvg_lookback", self.fvg_lookback.get())?,
            atr_period: get_period(overrides, "atr_period", self.atr_period.get())?,
            trend_epsilon: get_scalar(overrides, "trend_epsilon", self.trend_epsilon),
            displacement_multiplier: get_scalar(
                overrides,
                "displacement_multiplier",
                self.displacement_multiplier,
            ),
            retest_threshold: get_ratio(
                overrides,
                "retest_threshold",
                self.retest_threshold.get(),
            )?,
            weights: Weights {
                trend: get_scalar(overrides, "weight_trend", self.weights.trend),
                sweep: get_scalar(overrides, "weight_sweep", self.weights.sweep),
                retest: get_scalar(overrides, "weight_retest", self.weights.retest),
                fvg: get_scalar(overrides, "weight_fvg", self.weights.fvg),
            },
            min_composite_score: get_ratio(
                overrides,
                "min_composite_score",
                self.min_composite_score.get(),
            )?,
            cooldown_secs: cooldown as u64,
            ..self
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================
// TESTS
// ============================================================
