//! Signal composer and ranker
//!
//! Folds the trend context and detected structures of one symbol into a
//! composite score and a direction, applies mode gating, and orders the
//! eligible symbols of a tick.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::{DetectionConfig, Mode},
    detectors::{SignalKind, StructureSignal},
    trend::TrendContext,
    Direction,
};

/// Why a symbol produced no ranked entry this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Exclusion {
    /// Signals split evenly and the trend is flat
    DirectionTie,
    /// Nothing contributed to the score
    ZeroScore,
    /// Score below `min_composite_score`
    BelowMinScore,
    /// Pro mode without a sweep or qualifying retest in the alert direction
    MissingProTrigger,
}

/// One eligible symbol for this tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub symbol: String,
    /// 0.0..=1.0, weight-normalized
    pub composite_score: f64,
    pub direction: Direction,
    /// Everything the detectors found, qualifying or not
    pub signals: Vec<StructureSignal>,
    /// Kinds that contributed to the score, sorted and unique
    pub contributing: Vec<SignalKind>,
    pub trend: TrendContext,
    /// Timestamp of the latest bar
    pub timestamp: Option<DateTime<Utc>>,
    /// Most recent anchor time among contributing signals
    pub signal_time: Option<DateTime<Utc>>,
    pub last_price: f64,
    /// Detectors that could not run for lack of bars
    pub skipped_detectors: Vec<SignalKind>,
}

/// Inputs for [`compose`] gathered from one symbol's bars
#[derive(Debug, Clone)]
pub struct Composition<'a> {
    pub symbol: &'a str,
    pub trend: TrendContext,
    pub signals: Vec<StructureSignal>,
    pub timestamp: Option<DateTime<Utc>>,
    pub last_price: f64,
    pub skipped_detectors: Vec<SignalKind>,
}

/// Order block signals count only when price is close enough to the zone.
#[inline]
pub fn qualifies(signal: &StructureSignal, config: &DetectionConfig) -> bool {
    match signal.proximity() {
        Some(p) => p >= config.retest_threshold.get(),
        None => true,
    }
}

/// Majority direction of the qualifying signals, ties resolved by the trend.
fn resolve_direction(qualifying: &[&StructureSignal], trend: &TrendContext) -> Option<Direction> {
    let bullish = qualifying.iter().filter(|s| s.direction.is_bullish()).count();
    let bearish = qualifying.len() - bullish;
    match bullish.cmp(&bearish) {
        Ordering::Greater => Some(Direction::Bullish),
        Ordering::Less => Some(Direction::Bearish),
        Ordering::Equal => trend.trend.direction(),
    }
}

fn best_of(aligned: &[&StructureSignal], kind: SignalKind) -> Option<f64> {
    aligned
        .iter()
        .filter(|s| s.kind() == kind)
        .map(|s| match kind {
            SignalKind::OrderBlockRetest => s.proximity().unwrap_or(0.0),
            _ => s.strength,
        })
        .max_by(f64::total_cmp)
}

/// Compose one symbol's signals into a ranked entry, or say why not.
pub fn compose(
    input: Composition<'_>,
    mode: Mode,
    config: &DetectionConfig,
) -> std::result::Result<RankedEntry, Exclusion> {
    let qualifying: Vec<&StructureSignal> =
        input.signals.iter().filter(|s| qualifies(s, config)).collect();

    let direction = resolve_direction(&qualifying, &input.trend).ok_or(Exclusion::DirectionTie)?;

    let aligned: Vec<&StructureSignal> = qualifying
        .iter()
        .copied()
        .filter(|s| s.direction == direction)
        .collect();

    let w = &config.weights;
    let trend_bonus = if input.trend.trend.agrees_with(direction) { w.trend } else { 0.0 };
    let sweep = best_of(&aligned, SignalKind::LiquiditySweep).unwrap_or(0.0);
    let retest = best_of(&aligned, SignalKind::OrderBlockRetest).unwrap_or(0.0);
    let fvg = best_of(&aligned, SignalKind::FairValueGap).unwrap_or(0.0);

    let raw = trend_bonus + w.sweep * sweep + w.retest * retest + w.fvg * fvg;
    let composite_score = if w.total() > 0.0 { (raw / w.total()).clamp(0.0, 1.0) } else { 0.0 };

    let mut contributing: Vec<SignalKind> = aligned.iter().map(|s| s.kind()).collect();
    contributing.sort();
    contributing.dedup();

    if mode == Mode::Pro
        && !contributing
            .iter()
            .any(|k| matches!(k, SignalKind::LiquiditySweep | SignalKind::OrderBlockRetest))
    {
        return Err(Exclusion::MissingProTrigger);
    }

    if composite_score <= 0.0 {
        return Err(Exclusion::ZeroScore);
    }
    if composite_score < config.min_composite_score.get() {
        return Err(Exclusion::BelowMinScore);
    }

    let signal_time = aligned.iter().filter_map(|s| s.anchor_time).max().or(input.timestamp);

    Ok(RankedEntry {
        symbol: input.symbol.to_string(),
        composite_score,
        direction,
        signals: input.signals,
        contributing,
        trend: input.trend,
        timestamp: input.timestamp,
        signal_time,
        last_price: input.last_price,
        skipped_detectors: input.skipped_detectors,
    })
}

/// Total order: score desc, most recent signal first, then symbol asc.
pub fn compare_entries(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| b.signal_time.cmp(&a.signal_time))
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Sort entries in place into rank order.
pub fn rank(entries: &mut [RankedEntry]) {
    entries.sort_by(compare_entries);
}

// ============================================================
// TESTS
// ============================================================
