//! Scan engine
//!
//! Runs the detectors over each watchlist symbol, composes and ranks the
//! results, then passes them through the alert gate in rank order. Per-symbol
//! work is independent and runs on the rayon pool; ranking and gating are
//! sequential so cooldown updates happen in a deterministic order.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    bar::{Bar, BarSeries},
    composer::{compare_entries, compose, Composition, Exclusion, RankedEntry},
    config::{DetectionConfig, Mode},
    detectors::{helpers, BuiltinDetector, SignalKind, StructureSignal},
    gate::{Alert, AlertGate, CooldownBook, CooldownState, Suppression, TradePlan},
    trend::TrendContext,
    Direction, EngineError, Result, OHLCV,
};

// ============================================================
// EVALUATION
// ============================================================

/// Outcome of evaluating one symbol at one tick
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Alert(Alert),
    /// Eligible, but the gate held it back
    Suppressed {
        entry: RankedEntry,
        reason: Suppression,
    },
    /// Not eligible this tick
    Excluded(Exclusion),
    /// Could not be evaluated, e.g. too few bars
    Skipped(EngineError),
}

impl Evaluation {
    pub fn into_alert(self) -> Option<Alert> {
        match self {
            Evaluation::Alert(alert) => Some(alert),
            _ => None,
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, Evaluation::Alert(_))
    }
}

/// Evaluate one symbol against a one-off configuration.
///
/// The configuration is validated first; an invalid one yields
/// [`Evaluation::Skipped`] with a configuration error and leaves `state` alone.
/// Otherwise `state` is only touched when an alert fires or an expired
/// cooldown resets.
pub fn evaluate(
    series: &BarSeries,
    mode: Mode,
    config: &DetectionConfig,
    state: &mut CooldownState,
    now: DateTime<Utc>,
) -> Evaluation {
    let detectors = match checked_detectors(config) {
        Ok(detectors) => detectors,
        Err(error) => return Evaluation::Skipped(error),
    };
    let gate = AlertGate::from_config(config);

    match compose_series(series, mode, config, &detectors) {
        Err(error) => Evaluation::Skipped(error),
        Ok(Err(exclusion)) => Evaluation::Excluded(exclusion),
        Ok(Ok(entry)) => {
            let plan = trade_plan(series.bars(), entry.direction, config);
            match gate.admit(&entry, state, mode, now, plan) {
                Ok(alert) => Evaluation::Alert(alert),
                Err(reason) => Evaluation::Suppressed { entry, reason },
            }
        },
    }
}

/// Validate `config` and build its detectors.
fn checked_detectors(config: &DetectionConfig) -> Result<[BuiltinDetector; 3]> {
    config.validate()?;
    let detectors = BuiltinDetector::from_config(config);
    for detector in &detectors {
        detector.validate_config()?;
    }
    Ok(detectors)
}

fn compose_series(
    series: &BarSeries,
    mode: Mode,
    config: &DetectionConfig,
    detectors: &[BuiltinDetector],
) -> Result<std::result::Result<RankedEntry, Exclusion>> {
    let bars = series.bars();
    let trend = TrendContext::compute(bars, config.trend_epsilon)?;
    let last = series.last().ok_or(EngineError::InsufficientData { need: 1, got: 0 })?;

    let mut signals: Vec<StructureSignal> = Vec::new();
    let mut skipped_detectors: Vec<SignalKind> = Vec::new();
    for detector in detectors {
        if bars.len() < detector.min_bars() {
            debug!(
                symbol = series.symbol(),
                kind = detector.kind().as_str(),
                need = detector.min_bars(),
                got = bars.len(),
                "detector skipped"
            );
            skipped_detectors.push(detector.kind());
            continue;
        }
        signals.extend(detector.detect_both(bars));
    }

    Ok(compose(
        Composition {
            symbol: series.symbol(),
            trend,
            signals,
            timestamp: last.timestamp(),
            last_price: last.close(),
            skipped_detectors,
        },
        mode,
        config,
    ))
}

/// Bars either side of a fractal swing point
const SWING_SPAN: usize = 3;
/// Fallback window when no fractal swing has formed yet
const SWING_FALLBACK_BARS: usize = 12;

/// Entry at the last close; stop beyond the most recent fractal swing or
/// 0.8 ATR, whichever is further. Without a fractal the extreme of the last
/// 12 bars stands in.
pub fn trade_plan(bars: &[Bar], direction: Direction, config: &DetectionConfig) -> Option<TradePlan> {
    let last = bars.last()?;
    let recent = &bars[bars.len().saturating_sub(SWING_FALLBACK_BARS)..];
    let (_, swing) = match direction {
        Direction::Bullish => helpers::fractal_low(bars, SWING_SPAN, SWING_SPAN)
            .or_else(|| helpers::swing_low(recent))?,
        Direction::Bearish => helpers::fractal_high(bars, SWING_SPAN, SWING_SPAN)
            .or_else(|| helpers::swing_high(recent))?,
    };
    let atr = helpers::average_true_range(bars, bars.len().saturating_sub(config.atr_period.get()))?;
    Some(TradePlan::new(direction, last.close(), swing, atr))
}

// ============================================================
// WATCHLIST
// ============================================================

/// Ordered, de-duplicated list of upper-case symbols
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Watchlist {
    symbols: Vec<String>,
}

impl Watchlist {
    /// Parse comma- or whitespace-separated symbols. Blanks are dropped and the
    /// first occurrence of a repeated symbol wins.
    pub fn parse(text: &str) -> Self {
        let mut seen = HashSet::new();
        let symbols = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.clone()))
            .collect();
        Self { symbols }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s.eq_ignore_ascii_case(symbol))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

// ============================================================
// ENGINE
// ============================================================

/// A symbol that could not be evaluated this tick
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: EngineError,
}

/// Everything one tick produced
#[derive(Debug, Clone, Default)]
pub struct ScanBatch {
    /// Alerts that fired, in rank order
    pub alerts: Vec<Alert>,
    /// All eligible entries, in rank order, whether or not they alerted
    pub ranked: Vec<RankedEntry>,
    pub suppressed: Vec<(String, Suppression)>,
    pub excluded: Vec<(String, Exclusion)>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Configured scanner. Holds no per-symbol state.
#[derive(Debug, Clone)]
pub struct ScalpEngine {
    config: DetectionConfig,
    detectors: [BuiltinDetector; 3],
    gate: AlertGate,
}

impl ScalpEngine {
    #[inline]
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    #[inline]
    pub fn gate(&self) -> &AlertGate {
        &self.gate
    }

    /// Compose one symbol without touching any cooldown state.
    pub fn compose_symbol(
        &self,
        series: &BarSeries,
    ) -> Result<std::result::Result<RankedEntry, Exclusion>> {
        compose_series(series, self.config.mode, &self.config, &self.detectors)
    }

    /// Evaluate one symbol, updating its entry in `book`.
    pub fn evaluate(&self, series: &BarSeries, book: &mut CooldownBook, now: DateTime<Utc>) -> Evaluation {
        match self.compose_symbol(series) {
            Err(error) => Evaluation::Skipped(error),
            Ok(Err(exclusion)) => Evaluation::Excluded(exclusion),
            Ok(Ok(entry)) => {
                let plan = trade_plan(series.bars(), entry.direction, &self.config);
                let state = book.state_mut(series.symbol());
                match self.gate.admit(&entry, state, self.config.mode, now, plan) {
                    Ok(alert) => Evaluation::Alert(alert),
                    Err(reason) => Evaluation::Suppressed { entry, reason },
                }
            },
        }
    }

    /// Scan the watchlist for one tick.
    ///
    /// A symbol with bad or insufficient data is reported in
    /// [`ScanBatch::skipped`] and never stops the others.
    pub fn scan<'a, I>(&self, watchlist: I, book: &mut CooldownBook, now: DateTime<Utc>) -> ScanBatch
    where
        I: IntoIterator<Item = &'a BarSeries>,
    {
        let series: Vec<&BarSeries> = watchlist.into_iter().collect();

        let composed: Vec<_> = series
            .par_iter()
            .map(|s| (*s, self.compose_symbol(s)))
            .collect();

        let mut batch = ScanBatch::default();
        let mut eligible: Vec<(RankedEntry, &BarSeries)> = Vec::new();

        for (s, result) in composed {
            match result {
                Ok(Ok(entry)) => eligible.push((entry, s)),
                Ok(Err(exclusion)) => {
                    debug!(symbol = s.symbol(), ?exclusion, "symbol excluded");
                    batch.excluded.push((s.symbol().to_string(), exclusion));
                },
                Err(reason) => {
                    warn!(symbol = s.symbol(), %reason, "symbol skipped");
                    batch.skipped.push(SkippedSymbol {
                        symbol: s.symbol().to_string(),
                        reason,
                    });
                },
            }
        }

        eligible.sort_by(|a, b| compare_entries(&a.0, &b.0));

        for (entry, s) in eligible {
            let plan = trade_plan(s.bars(), entry.direction, &self.config);
            let state = book.state_mut(&entry.symbol);
            match self.gate.admit(&entry, state, self.config.mode, now, plan) {
                Ok(alert) => batch.alerts.push(alert),
                Err(reason) => batch.suppressed.push((entry.symbol.clone(), reason)),
            }
            batch.ranked.push(entry);
        }

        info!(
            symbols = series.len(),
            ranked = batch.ranked.len(),
            alerts = batch.alerts.len(),
            skipped = batch.skipped.len(),
            "scan complete"
        );
        batch
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`ScalpEngine`]
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: DetectionConfig,
    mode: Option<Mode>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from TOML
    pub fn config_toml(self, content: &str) -> Result<Self> {
        Ok(self.config(DetectionConfig::from_toml_str(content)?))
    }

    /// Override the configured mode
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Build the engine, rejecting invalid configuration up front.
    pub fn build(self) -> Result<ScalpEngine> {
        let mut config = self.config;
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        let detectors = checked_detectors(&config)?;

        Ok(ScalpEngine {
            gate: AlertGate::from_config(&config),
            detectors,
            config,
        })
    }
}

// ============================================================
// TESTS
// ============================================================
