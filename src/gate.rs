//! Alert gate
//!
//! Turns ranked entries into alerts subject to the exchange-local
//! time-of-day windows and a per-symbol cooldown. Per symbol the gate runs
//! Idle -> Armed -> Cooling -> Idle; the state lives in a [`CooldownBook`] the
//! caller owns and passes in, so nothing here is global.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    composer::RankedEntry,
    config::{DetectionConfig, Mode, TimeWindow},
    detectors::{SignalKind, StructureSignal},
    trend::TrendContext,
    Direction,
};

// ============================================================
// SESSIONS
// ============================================================

/// Named exchange-local part of the trading day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Session {
    /// 09:30-11:00
    Opening,
    /// 11:00-15:00
    Midday,
    /// 15:00-16:00
    Power,
    Off,
}

impl Session {
    pub fn classify(t: NaiveTime) -> Self {
        if TimeWindow::opening().contains(t) {
            Session::Opening
        } else if TimeWindow::midday().contains(t) {
            Session::Midday
        } else if TimeWindow::power().contains(t) {
            Session::Power
        } else {
            Session::Off
        }
    }

    pub fn window(self) -> Option<TimeWindow> {
        match self {
            Session::Opening => Some(TimeWindow::opening()),
            Session::Midday => Some(TimeWindow::midday()),
            Session::Power => Some(TimeWindow::power()),
            Session::Off => None,
        }
    }
}

// ============================================================
// COOLDOWN STATE
// ============================================================

/// Per-symbol gate phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatePhase {
    #[default]
    Idle,
    /// Eligible entry accepted, alert being emitted
    Armed,
    Cooling,
}

/// Per-symbol alert bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownState {
    pub phase: GatePhase,
    pub last_alert_time: Option<DateTime<Utc>>,
    pub last_alert_direction: Option<Direction>,
}

impl CooldownState {
    /// Time left before another alert may fire; `None` when not cooling.
    pub fn remaining(&self, now: DateTime<Utc>, cooldown: Duration) -> Option<Duration> {
        if self.phase != GatePhase::Cooling {
            return None;
        }
        let last = self.last_alert_time?;
        let elapsed = now - last;
        (elapsed < cooldown).then(|| cooldown.checked_sub(&elapsed).unwrap_or(Duration::MAX))
    }

    /// Phase as of `now`, without mutating.
    pub fn phase_at(&self, now: DateTime<Utc>, cooldown: Duration) -> GatePhase {
        match self.phase {
            GatePhase::Cooling if self.remaining(now, cooldown).is_none() => GatePhase::Idle,
            phase => phase,
        }
    }

    fn expire(&mut self, now: DateTime<Utc>, cooldown: Duration) {
        if self.phase == GatePhase::Cooling && self.remaining(now, cooldown).is_none() {
            self.phase = GatePhase::Idle;
        }
    }

    fn record(&mut self, now: DateTime<Utc>, direction: Direction) {
        self.phase = GatePhase::Cooling;
        self.last_alert_time = Some(now);
        self.last_alert_direction = Some(direction);
    }
}

/// Symbol -> cooldown state, owned by the scan driver for the process lifetime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CooldownBook {
    states: HashMap<String, CooldownState>,
}

impl CooldownBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&CooldownState> {
        self.states.get(symbol)
    }

    /// State for `symbol`, created Idle on first use.
    pub fn state_mut(&mut self, symbol: &str) -> &mut CooldownState {
        self.states.entry(symbol.to_string()).or_default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Forget every symbol's cooldown.
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

// ============================================================
// ALERTS
// ============================================================

/// Entry, stop and R-multiple targets for an alert
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub entry: f64,
    pub stop: f64,
    pub target_1r: f64,
    pub target_2r: f64,
}

impl TradePlan {
    /// Stop beyond the swing extreme or 0.8 ATR away, whichever is further.
    ///
    /// `swing` is the recent swing low for a bullish plan and the recent swing
    /// high for a bearish one. Risk is floored at 0.01.
    pub fn new(direction: Direction, entry: f64, swing: f64, atr: f64) -> Self {
        let buffer = atr.max(0.0) * 0.8;
        let (stop, sign) = match direction {
            Direction::Bullish => (swing.min(entry - buffer), 1.0),
            Direction::Bearish => (swing.max(entry + buffer), -1.0),
        };
        let risk = (entry - stop).abs().max(0.01);
        Self {
            entry,
            stop,
            target_1r: entry + sign * risk,
            target_2r: entry + sign * 2.0 * risk,
        }
    }
}

/// An emitted alert. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: String,
    pub composite_score: f64,
    pub direction: Direction,
    pub kinds: Vec<SignalKind>,
    /// Wall-clock time the alert fired
    pub timestamp: DateTime<Utc>,
    pub mode: Mode,
    pub session: Session,
    /// Timestamp of the bar the alert was computed from
    pub as_of: Option<DateTime<Utc>>,
    pub last_price: f64,
    pub trend: TrendContext,
    pub signals: Vec<StructureSignal>,
    pub plan: Option<TradePlan>,
}

/// Why an eligible entry did not alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Suppression {
    OutsideWindow { session: Session },
    CoolingDown { remaining_secs: i64 },
}

/// Alerts an [`AlertLog`] keeps unless told otherwise
pub const DEFAULT_MAX_ALERTS_KEPT: usize = 60;

/// Bounded in-memory alert log. Once full, each new alert evicts the oldest;
/// kept alerts are never modified.
#[derive(Debug, Clone, Serialize)]
pub struct AlertLog {
    alerts: VecDeque<Alert>,
    max_kept: usize,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::with_max_kept(DEFAULT_MAX_ALERTS_KEPT)
    }
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log keeping at most `max_kept` alerts (at least one).
    pub fn with_max_kept(max_kept: usize) -> Self {
        Self {
            alerts: VecDeque::new(),
            max_kept: max_kept.max(1),
        }
    }

    #[inline]
    pub fn max_kept(&self) -> usize {
        self.max_kept
    }

    pub fn push(&mut self, alert: Alert) {
        self.alerts.push_back(alert);
        while self.alerts.len() > self.max_kept {
            self.alerts.pop_front();
        }
    }

    pub fn extend(&mut self, alerts: impl IntoIterator<Item = Alert>) {
        for alert in alerts {
            self.push(alert);
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Oldest first
    pub fn oldest(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    /// Newest first
    pub fn newest(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().rev()
    }

    /// Newest first, restricted to `directions` and a score floor.
    pub fn filtered<'a>(
        &'a self,
        directions: &'a [Direction],
        min_score: f64,
    ) -> impl Iterator<Item = &'a Alert> + 'a {
        self.newest()
            .filter(move |a| directions.contains(&a.direction) && a.composite_score >= min_score)
    }

    pub fn latest_for(&self, symbol: &str) -> Option<&Alert> {
        self.newest().find(|a| a.symbol == symbol)
    }
}

// ============================================================
// GATE
// ============================================================

/// Time-of-day and cooldown gate
#[derive(Debug, Clone)]
pub struct AlertGate {
    windows: Vec<TimeWindow>,
    tz: Tz,
    trading_days_only: bool,
    cooldown: Duration,
}

impl AlertGate {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            windows: config.windows.clone(),
            tz: config.exchange_tz,
            trading_days_only: config.trading_days_only,
            cooldown: config.cooldown(),
        }
    }

    #[inline]
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Session of `now` in exchange-local time
    pub fn session(&self, now: DateTime<Utc>) -> Session {
        Session::classify(now.with_timezone(&self.tz).time())
    }

    /// True when `now` falls inside a configured window on a trading day.
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.tz);
        if self.trading_days_only && matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let t = local.time();
        self.windows.iter().any(|w| w.contains(t))
    }

    /// Decide whether `entry` alerts now. Mutates `state` only when an alert fires
    /// or an expired cooldown returns to Idle.
    pub fn admit(
        &self,
        entry: &RankedEntry,
        state: &mut CooldownState,
        mode: Mode,
        now: DateTime<Utc>,
        plan: Option<TradePlan>,
    ) -> std::result::Result<Alert, Suppression> {
        let session = self.session(now);
        if !self.in_window(now) {
            debug!(symbol = %entry.symbol, ?session, "alert suppressed: outside time window");
            return Err(Suppression::OutsideWindow { session });
        }

        state.expire(now, self.cooldown);
        if let Some(remaining) = state.remaining(now, self.cooldown) {
            debug!(
                symbol = %entry.symbol,
                remaining_secs = remaining.num_seconds(),
                last_direction = ?state.last_alert_direction,
                "alert suppressed: cooling down"
            );
            return Err(Suppression::CoolingDown {
                remaining_secs: remaining.num_seconds(),
            });
        }

        state.phase = GatePhase::Armed;
        let alert = Alert {
            symbol: entry.symbol.clone(),
            composite_score: entry.composite_score,
            direction: entry.direction,
            kinds: entry.contributing.clone(),
            timestamp: now,
            mode,
            session,
            as_of: entry.timestamp,
            last_price: entry.last_price,
            trend: entry.trend,
            signals: entry.signals.clone(),
            plan,
        };
        state.record(now, entry.direction);

        info!(
            symbol = %alert.symbol,
            score = alert.composite_score,
            direction = ?alert.direction,
            ?session,
            "alert emitted"
        );
        Ok(alert)
    }
}

// ============================================================
// TESTS
// ============================================================
