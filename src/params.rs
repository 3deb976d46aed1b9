//! Parameter metadata for the detection config
//!
//! Every numeric knob of [`DetectionConfig`](crate::config::DetectionConfig) is
//! described here once: its kind, default and the range a config value must
//! fall in. Config validation and by-name overrides both read this table.
//!
//! # Example
//!
//! ```rust
//! use scalpscan::params::CONFIG_PARAMS;
//!
//! for param in CONFIG_PARAMS {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{EngineError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0
  Ratio,
  /// Period value (positive integer)
  Period,
  /// Non-negative real (weights, multipliers, seconds)
  Scalar,
}

/// Metadata for a single config parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name as it appears in the config (e.g., "retest_threshold")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted range: (min, max), inclusive
  pub range: (f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(name: &'static str, default: f64, description: &'static str) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range: (0.0, 1.0), description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn scalar(
    name: &'static str,
    default: f64,
    range: (f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Scalar, default, range, description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    if !value.is_finite() {
      return Err(EngineError::InvalidConfig(format!("{} must be finite, got {value}", self.name)));
    }
    let (min, max) = self.range;
    if value < min || value > max {
      return Err(EngineError::OutOfRange { field: self.name, value, min, max });
    }
    if self.param_type == ParamType::Period && value.fract() != 0.0 {
      return Err(EngineError::InvalidValue("Period must be a positive integer"));
    }
    Ok(())
  }
}

/// Looks up the metadata for a parameter name.
pub fn find(name: &str) -> Option<&'static ParamMeta> {
  CONFIG_PARAMS.iter().find(|p| p.name == name)
}

// ============================================================
// PARAMETER TABLE
// ============================================================

pub const CONFIG_PARAMS: &[ParamMeta] = &[
  ParamMeta::period("sweep_lookback", 15.0, (2.0, 200.0), "Bars before the current bar searched for swing extremes"),
  ParamMeta::period("order_block_lookback", 30.0, (3.0, 300.0), "Bars searched for a displacement and its order block"),
  ParamMeta::period("fvg_lookback", 60.0, (3.0, 500.0), "Bars searched for unfilled fair value gaps"),
  ParamMeta::period("atr_period", 14.0, (1.0, 200.0), "True-range averaging period for gap strength and stops"),
  ParamMeta::scalar("trend_epsilon", 0.0005, (0.0, 0.1), "Relative EMA20/EMA50 spread below which the trend is flat"),
  ParamMeta::scalar("displacement_multiplier", 2.0, (1.0, 20.0), "Body multiple of the average body that marks a displacement bar"),
  ParamMeta::ratio("retest_threshold", 0.6, "Minimum retest proximity for an order block to count"),
  ParamMeta::scalar("weight_trend", 1.0, (0.0, 100.0), "Weight of trend alignment in the composite score"),
  ParamMeta::scalar("weight_sweep", 1.0, (0.0, 100.0), "Weight of liquidity sweep strength"),
  ParamMeta::scalar("weight_retest", 1.0, (0.0, 100.0), "Weight of order block retest proximity"),
  ParamMeta::scalar("weight_fvg", 1.0, (0.0, 100.0), "Weight of fair value gap strength"),
  ParamMeta::ratio("min_composite_score", 0.0, "Composite score floor for eligibility"),
  ParamMeta::scalar("cooldown_secs", 420.0, (0.0, 86_400.0), "Minimum seconds between alerts for one symbol"),
];

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 1.0 || value.fract() != 0.0 {
    return Err(EngineError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to get a non-negative scalar from params with default fallback
pub fn get_scalar(params: &HashMap<&str, f64>, key: &str, default: f64) -> f64 {
  params.get(key).copied().unwrap_or(default)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_meta_ratio() {
    let meta = ParamMeta::ratio("test_ratio", 0.5, "Test ratio parameter");

    assert_eq!(meta.name, "test_ratio");
    assert_eq!(meta.param_type, ParamType::Ratio);
    assert_eq!(meta.range, (0.0, 1.0));
  }

  #[test]
  fn test_validate_ratio() {
    let meta = ParamMeta::ratio("test", 0.5, "Test");

    assert!(meta.validate(0.0).is_ok());
    assert!(meta.validate(1.0).is_ok());
    assert!(meta.validate(-0.01).is_err());
    assert!(meta.validate(1.01).is_err());
    assert!(meta.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_validate_period() {
    let meta = ParamMeta::period("test", 14.0, (2.0, 20.0), "Test");

    assert!(meta.validate(14.0).is_ok());
    assert!(meta.validate(1.0).is_err());
    assert!(meta.validate(14.5).is_err());
  }

  #[test]
  fn test_table_defaults_validate() {
    for param in CONFIG_PARAMS {
      assert!(param.validate(param.default).is_ok(), "default of {} out of range", param.name);
    }
  }

  #[test]
  fn test_table_names_unique() {
    for (i, a) in CONFIG_PARAMS.iter().enumerate() {
      for b in &CONFIG_PARAMS[i + 1..] {
        assert_ne!(a.name, b.name);
      }
    }
  }

  #[test]
  fn test_find() {
    assert_eq!(find("retest_threshold").map(|p| p.default), Some(0.6));
    assert!(find("nope").is_none());
  }

  #[test]
  fn test_get_helpers() {
    let mut params = HashMap::new();
    params.insert("retest_threshold", 0.7);
    params.insert("sweep_lookback", 12.0);

    assert_eq!(get_ratio(&params, "retest_threshold", 0.6).unwrap().get(), 0.7);
    assert_eq!(get_ratio(&params, "missing", 0.6).unwrap().get(), 0.6);
    assert_eq!(get_period(&params, "sweep_lookback", 15).unwrap().get(), 12);
    assert_eq!(get_scalar(&params, "weight_fvg", 1.0), 1.0);

    params.insert("sweep_lookback", 0.0);
    assert!(get_period(&params, "sweep_lookback", 15).is_err());
  }
}
