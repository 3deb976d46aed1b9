//! Shared window statistics for the structure detectors

use crate::{OHLCVExt, OHLCV};

/// Highest high in `bars` as `(index, value)`. Ties resolve to the most recent bar.
#[inline]
pub fn swing_high<T: OHLCV>(bars: &[T]) -> Option<(usize, f64)> {
  bars.iter().enumerate().fold(None, |best, (i, bar)| match best {
    Some((_, v)) if bar.high() < v => best,
    _ => Some((i, bar.high())),
  })
}

/// Lowest low in `bars` as `(index, value)`. Ties resolve to the most recent bar.
#[inline]
pub fn swing_low<T: OHLCV>(bars: &[T]) -> Option<(usize, f64)> {
  bars.iter().enumerate().fold(None, |best, (i, bar)| match best {
    Some((_, v)) if bar.low() > v => best,
    _ => Some((i, bar.low())),
  })
}

/// Most recent fractal low: a bar whose low is the lowest of the `left` bars
/// before it and the `right` bars after it (equal lows still count).
pub fn fractal_low<T: OHLCV>(bars: &[T], left: usize, right: usize) -> Option<(usize, f64)> {
  let end = bars.len().checked_sub(right)?;
  (left..end)
    .rev()
    .find(|&i| bars[i - left..=i + right].iter().all(|b| b.low() >= bars[i].low()))
    .map(|i| (i, bars[i].low()))
}

/// Most recent fractal high, mirroring [`fractal_low`].
pub fn fractal_high<T: OHLCV>(bars: &[T], left: usize, right: usize) -> Option<(usize, f64)> {
  let end = bars.len().checked_sub(right)?;
  (left..end)
    .rev()
    .find(|&i| bars[i - left..=i + right].iter().all(|b| b.high() <= bars[i].high()))
    .map(|i| (i, bars[i].high()))
}

/// Mean body size over `bars`; `None` when empty.
#[inline]
pub fn average_body<T: OHLCV>(bars: &[T]) -> Option<f64> {
  if bars.is_empty() {
    return None;
  }
  Some(bars.iter().map(|b| b.body()).sum::<f64>() / bars.len() as f64)
}

/// Mean true range over `bars[start..]`.
///
/// The first bar of the window still uses the close before it (when there is
/// one), so the value does not depend on where the caller's slice begins.
#[inline]
pub fn average_true_range<T: OHLCV>(bars: &[T], start: usize) -> Option<f64> {
  if start >= bars.len() {
    return None;
  }
  let sum: f64 = (start..bars.len())
    .map(|i| {
      let prev = (i > 0).then(|| bars[i - 1].close());
      bars[i].true_range(prev)
    })
    .sum();
  Some(sum / (bars.len() - start) as f64)
}

/// Clamp to the unit interval; NaN becomes 0.
#[inline]
pub fn unit(value: f64) -> f64 {
  if value.is_nan() {
    0.0
  } else {
    value.clamp(0.0, 1.0)
  }
}
