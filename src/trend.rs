//! EMA20/EMA50 trend context

use serde::{Deserialize, Serialize};

use crate::{Direction, EngineError, Result, OHLCV};

/// Fast EMA period
pub const EMA_FAST: usize = 20;
/// Slow EMA period; also the minimum series length for trend context
pub const EMA_SLOW: usize = 50;

/// Trend classification at the latest bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    #[default]
    Flat,
}

impl Trend {
    /// Direction implied by the trend, `None` when flat.
    #[inline]
    pub fn direction(self) -> Option<Direction> {
        match self {
            Trend::Up => Some(Direction::Bullish),
            Trend::Down => Some(Direction::Bearish),
            Trend::Flat => None,
        }
    }

    #[inline]
    pub fn agrees_with(self, direction: Direction) -> bool {
        self.direction() == Some(direction)
    }
}

/// EMA values and trend class at the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendContext {
    pub ema20: f64,
    pub ema50: f64,
    pub trend: Trend,
}

impl TrendContext {
    /// Compute trend context at the last bar.
    ///
    /// `trend_epsilon` is relative: Up requires `(ema20 - ema50) / |ema50| >= epsilon`.
    pub fn compute<T: OHLCV>(bars: &[T], trend_epsilon: f64) -> Result<Self> {
        if bars.len() < EMA_SLOW {
            return Err(EngineError::InsufficientData {
                need: EMA_SLOW,
                got: bars.len(),
            });
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
        let ema20 = ema(&closes, EMA_FAST)?;
        let ema50 = ema(&closes, EMA_SLOW)?;

        Ok(Self {
            ema20,
            ema50,
            trend: classify(ema20, ema50, trend_epsilon),
        })
    }
}

fn classify(ema20: f64, ema50: f64, epsilon: f64) -> Trend {
    let scale = ema50.abs();
    if scale <= f64::EPSILON {
        return Trend::Flat;
    }
    let spread = (ema20 - ema50) / scale;
    if spread >= epsilon && spread > 0.0 {
        Trend::Up
    } else if -spread >= epsilon && spread < 0.0 {
        Trend::Down
    } else {
        Trend::Flat
    }
}

/// EMA of `values` at the final element, seeded with the SMA of the first `period` values.
pub fn ema(values: &[f64], period: usize) -> Result<f64> {
    ema_series(values, period)?
        .last()
        .copied()
        .flatten()
        .ok_or(EngineError::InsufficientData {
            need: period,
            got: values.len(),
        })
}

/// Full EMA path. Entries before index `period - 1` are `None` (no seed yet).
pub fn ema_series(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    if period == 0 {
        return Err(EngineError::InvalidValue("EMA period must be > 0"));
    }
    if values.len() < period {
        return Err(EngineError::InsufficientData {
            need: period,
            got: values.len(),
        });
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = vec![None; values.len()];

    let seed = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(seed);

    let mut prev = seed;
    for (i, &price) in values.iter().enumerate().skip(period) {
        prev = price * k + prev * (1.0 - k);
        out[i] = Some(prev);
    }

    Ok(out)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Close(f64);

    impl OHLCV for Close {
        fn open(&self) -> f64 {
            self.0
        }

        fn high(&self) -> f64 {
            self.0
        }

        fn low(&self) -> f64 {
            self.0
        }

        fn close(&self) -> f64 {
            self.0
        }

        fn volume(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let values = [1.0, 2.0, 3.0];
        let series = ema_series(&values, 3).unwrap();
        assert_eq!(series, vec![None, None, Some(2.0)]);
    }

    #[test]
    fn test_ema_recursion() {
        // k = 2 / (3 + 1) = 0.5
        let values = [1.0, 2.0, 3.0, 6.0];
        let last = ema(&values, 3).unwrap();
        assert!((last - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_ema_needs_period_values() {
        assert_eq!(
            ema(&[1.0, 2.0], 3),
            Err(EngineError::InsufficientData { need: 3, got: 2 })
        );
        assert!(ema_series(&[1.0], 0).is_err());
    }

    #[test]
    fn test_trend_requires_fifty_bars() {
        let bars: Vec<Close> = (0..49).map(|i| Close(100.0 + i as f64)).collect();
        assert_eq!(
            TrendContext::compute(&bars, 0.0005),
            Err(EngineError::InsufficientData { need: 50, got: 49 })
        );
    }

    #[test]
    fn test_trend_up_and_down() {
        let rising: Vec<Close> = (0..80).map(|i| Close(100.0 + i as f64 * 0.5)).collect();
        let ctx = TrendContext::compute(&rising, 0.0005).unwrap();
        assert_eq!(ctx.trend, Trend::Up);
        assert!(ctx.ema20 > ctx.ema50);

        let falling: Vec<Close> = (0..80).map(|i| Close(200.0 - i as f64 * 0.5)).collect();
        let ctx = TrendContext::compute(&falling, 0.0005).unwrap();
        assert_eq!(ctx.trend, Trend::Down);
    }

    #[test]
    fn test_trend_flat_within_epsilon() {
        let flat: Vec<Close> = (0..80).map(|_| Close(100.0)).collect();
        let ctx = TrendContext::compute(&flat, 0.0005).unwrap();
        assert_eq!(ctx.trend, Trend::Flat);
        assert!((ctx.ema20 - 100.0).abs() < 1e-9);

        // Tiny drift stays below a wide epsilon
        let drift: Vec<Close> = (0..80).map(|i| Close(100.0 + i as f64 * 0.001)).collect();
        let ctx = TrendContext::compute(&drift, 0.01).unwrap();
        assert_eq!(ctx.trend, Trend::Flat);
    }

    #[test]
    fn test_trend_direction_mapping() {
        assert_eq!(Trend::Up.direction(), Some(Direction::Bullish));
        assert_eq!(Trend::Down.direction(), Some(Direction::Bearish));
        assert_eq!(Trend::Flat.direction(), None);
        assert!(Trend::Down.agrees_with(Direction::Bearish));
        assert!(!Trend::Flat.agrees_with(Direction::Bullish));
    }
}
