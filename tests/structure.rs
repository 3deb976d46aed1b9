//! Property tests for detector and trend invariants.
//!
//! 1. EMA is deterministic and reacts faster at 20 than at 50
//! 2. Sweeps only depend on the lookback window
//! 3. Order block identification is stable and bounded
//! 4. Filled fair value gaps stay filled as bars are appended
//! 5. Composite scores stay in the unit interval

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use scalpscan::prelude::*;

// ── Strategies ───────────────────────────────────────────────────────

/// Random walk: (change, volatility, upper wick share, lower wick share)
fn arb_steps(min: usize, max: usize) -> impl Strategy<Value = Vec<(f64, f64, f64, f64)>> {
    prop::collection::vec((-1.0..1.0_f64, 0.05..1.0_f64, 0.0..1.0_f64, 0.0..1.0_f64), min..max)
}

fn to_bars(steps: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 9, 14, 30, 0).unwrap();
    let mut price = 100.0;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(change, vol, up, down))| {
            let o = price;
            let c = (price + change).max(1.0);
            price = c;
            Bar::new(
                start + Duration::minutes(i as i64),
                o,
                o.max(c) + vol * up,
                o.min(c) - vol * down,
                c,
                1_000.0,
            )
        })
        .collect()
}

// ── 1. Trend ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn ema_is_deterministic_and_matches_series(values in prop::collection::vec(50.0..150.0_f64, 50..120)) {
        let a = ema(&values, 20).unwrap();
        let b = ema(&values, 20).unwrap();
        prop_assert_eq!(a, b);

        let series = ema_series(&values, 20).unwrap();
        prop_assert_eq!(series.len(), values.len());
        prop_assert!(series[..19].iter().all(Option::is_none));
        prop_assert_eq!(series[values.len() - 1], Some(a));
    }

    #[test]
    fn ema20_leads_ema50_after_step(base in 50.0..150.0_f64, step in 1.0..20.0_f64, flat in 50usize..80, after in 1usize..30) {
        let mut closes = vec![base; flat];
        closes.extend(std::iter::repeat(base + step).take(after));

        let fast = ema(&closes, 20).unwrap();
        let slow = ema(&closes, 50).unwrap();
        prop_assert!(fast > slow);
        prop_assert!(fast <= base + step + 1e-9);
        prop_assert!(slow >= base - 1e-9);
    }
}

// ── 2. Liquidity sweep window ────────────────────────────────────────

proptest! {
    #[test]
    fn sweep_ignores_history_before_window(
        steps in arb_steps(20, 60),
        prefix in arb_steps(1, 40),
    ) {
        let bars = to_bars(&steps);
        let detector = LiquiditySweepDetector::with_defaults();

        // Same window, arbitrary older history
        let mut extended = to_bars(&prefix);
        extended.extend(bars.iter().copied());

        for direction in Direction::BOTH {
            let base = detector.detect(&bars, direction);
            let shifted = detector.detect(&extended, direction);
            prop_assert_eq!(base.is_some(), shifted.is_some());
            if let (Some(a), Some(b)) = (base, shifted) {
                prop_assert_eq!(a.strength, b.strength);
                prop_assert_eq!(a.zone, b.zone);
                prop_assert_eq!(a.anchor_index + prefix.len(), b.anchor_index);
            }
        }
    }

    #[test]
    fn sweep_strength_in_unit_interval(steps in arb_steps(16, 80)) {
        let bars = to_bars(&steps);
        for signal in LiquiditySweepDetector::with_defaults().detect_both(&bars) {
            prop_assert!((0.0..=1.0).contains(&signal.strength));
            prop_assert!(signal.zone.low <= signal.zone.high);
        }
    }
}

// ── 3. Order blocks ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn order_block_stable_and_bounded(steps in arb_steps(30, 90)) {
        let bars = to_bars(&steps);
        let detector = OrderBlockDetector::with_defaults();

        prop_assert_eq!(detector.locate(&bars), detector.locate(&bars));

        if let Some(block) = detector.locate(&bars) {
            prop_assert!(block.block_index < block.displacement_index);
            prop_assert!(block.displacement_index < bars.len());
            prop_assert!((0.0..=1.0).contains(&block.strength));
            for price in [block.zone.low, block.zone.high, bars[bars.len() - 1].close] {
                prop_assert!((0.0..=1.0).contains(&block.proximity(price)));
            }
            prop_assert_eq!(block.proximity(block.zone.low), 1.0);
        }
    }
}

// ── 4. Fair value gaps ───────────────────────────────────────────────

proptest! {
    #[test]
    fn filled_gaps_stay_filled(steps in arb_steps(3, 60), more in arb_steps(1, 30)) {
        let detector = FairValueGapDetector { lookback: 500 };
        let bars = to_bars(&steps);

        let mut all = steps.clone();
        all.extend(more.iter().copied());
        let extended = to_bars(&all);

        let before = detector.gaps(&bars);
        let after = detector.gaps(&extended);

        for gap in &before {
            let later = after.iter().find(|g| g.index == gap.index);
            prop_assert!(later.is_some());
            if let Some(later) = later {
                prop_assert_eq!(later.zone, gap.zone);
                prop_assert!(!gap.filled || later.filled);
            }
        }
    }

    #[test]
    fn reported_gap_is_unfilled(steps in arb_steps(3, 80)) {
        let detector = FairValueGapDetector::with_defaults();
        let bars = to_bars(&steps);
        for signal in detector.detect_both(&bars) {
            let gap = detector
                .gaps(&bars)
                .into_iter()
                .find(|g| g.index == signal.anchor_index + 1 && g.direction == signal.direction);
            prop_assert!(matches!(gap, Some(g) if !g.filled));
            prop_assert!((0.0..=1.0).contains(&signal.strength));
        }
    }
}

// ── 5. Composite score ───────────────────────────────────────────────

proptest! {
    #[test]
    fn composite_score_in_unit_interval(steps in arb_steps(50, 120)) {
        let series = BarSeries::new("PROP", to_bars(&steps)).unwrap();
        for mode in [Mode::Basic, Mode::Pro] {
            let engine = EngineBuilder::new().mode(mode).build().unwrap();
            if let Ok(Ok(entry)) = engine.compose_symbol(&series) {
                prop_assert!(entry.composite_score > 0.0);
                prop_assert!(entry.composite_score <= 1.0);
                if mode == Mode::Pro {
                    prop_assert!(entry.contributing.iter().any(|k| matches!(
                        k,
                        SignalKind::LiquiditySweep | SignalKind::OrderBlockRetest
                    )));
                }
            }
        }
    }
}
