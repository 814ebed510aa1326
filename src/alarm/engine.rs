//! Alarm and ding escalation driven by pointer events.
//!
//! The engine sees two events. A human movement resets everything. A
//! synthetic move first checks whether the inactivity timeout has elapsed
//! (sounding the alarm at most once per timeout window) and then, once the
//! alarm has fired, plays a growing number of dings on every cycle until a
//! human shows up again.
//!
//! ```text
//!              on_auto_move, timeout elapsed
//!   Armed ──────────────────────────────────► Escalating ─┐
//!     ▲                                           │  ▲     │ on_auto_move
//!     │            on_human_movement              │  └─────┘ (dings grow to cap,
//!     └───────────────────────────────────────────┘          alarm may re-fire)
//! ```

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::clock::Clock;
use crate::notify::Notifier;

/// Upper bound on dings played in a single cycle.
pub const MAX_DINGS_PER_CYCLE: u32 = 20;

/// Shortest accepted inactivity timeout.
pub const MIN_ALARM_TIMEOUT: Duration = Duration::from_secs(10);

/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Rejected engine settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("alarm timeout must be at least 10s, got {0:?}")]
    AlarmTimeoutTooShort(Duration),
    #[error("poll interval must be at least 2s, got {0:?}")]
    PollIntervalTooShort(Duration),
    #[error("ding unit must be greater than zero")]
    ZeroDingUnit,
}

/// Timing parameters fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Inactivity after which the alarm sounds.
    pub alarm_timeout: Duration,
    /// Cadence of the poll loop feeding the engine.
    pub poll_interval: Duration,
    /// Pause between dings, and the unit the ding cap is measured in.
    pub ding_unit: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            alarm_timeout: Duration::from_secs(30 * 60),
            poll_interval: Duration::from_secs(5 * 60),
            ding_unit: Duration::from_secs(1),
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.alarm_timeout < MIN_ALARM_TIMEOUT {
            return Err(SettingsError::AlarmTimeoutTooShort(self.alarm_timeout));
        }
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(SettingsError::PollIntervalTooShort(self.poll_interval));
        }
        if self.ding_unit.is_zero() {
            return Err(SettingsError::ZeroDingUnit);
        }
        Ok(())
    }

    /// `min(20, floor(poll_interval / ding_unit))`, so a full batch of dings
    /// never outlasts one poll cycle.
    pub fn max_ding_count(&self) -> u32 {
        let fits = self
            .poll_interval
            .as_nanos()
            .checked_div(self.ding_unit.as_nanos())
            .unwrap_or(0);
        fits.min(MAX_DINGS_PER_CYCLE as u128) as u32
    }
}

/// Mutable timing state. Replaced wholesale on human movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EscalationState {
    last_human_move_at: Instant,
    last_alarm_at: Option<Instant>,
    alarm_triggered: bool,
    consecutive_auto_moves: u32,
}

impl EscalationState {
    fn fresh(at: Instant) -> Self {
        Self {
            last_human_move_at: at,
            last_alarm_at: None,
            alarm_triggered: false,
            consecutive_auto_moves: 0,
        }
    }
}

/// A ding that could not be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DingFailure {
    /// 1-based position of the ding within its batch.
    pub index: u32,
    pub reason: String,
}

/// What a single `on_auto_move` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoMoveReport {
    /// The alarm fired during this call.
    pub alarm_fired: bool,
    /// The alarm notification itself succeeded. Meaningless unless `alarm_fired`.
    pub alarm_sounded: bool,
    /// Time since the last human movement, measured at the start of the call.
    pub idle_for: Duration,
    /// Consecutive auto-moves counted after this call.
    pub cycle: u32,
    pub dings_requested: u32,
    pub dings_played: u32,
    pub ding_failures: Vec<DingFailure>,
}

/// Read-only view of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub alarm_timeout: Duration,
    pub poll_interval: Duration,
    pub max_ding_count: u32,
    pub consecutive_auto_moves: u32,
    pub alarm_triggered: bool,
}

/// Escalation state machine. Calls must not overlap; every method takes
/// `&mut self` or `&self` and does no locking of its own.
pub struct EscalationEngine<N, C> {
    settings: EngineSettings,
    max_ding_count: u32,
    state: EscalationState,
    notifier: N,
    clock: C,
}

impl<N: Notifier, C: Clock> EscalationEngine<N, C> {
    /// Validate `settings` and start in the armed state, treating the moment
    /// of construction as the last human movement.
    pub fn new(settings: EngineSettings, notifier: N, clock: C) -> Result<Self, SettingsError> {
        settings.validate()?;
        let state = EscalationState::fresh(clock.now());
        Ok(Self {
            max_ding_count: settings.max_ding_count(),
            settings,
            state,
            notifier,
            clock,
        })
    }

    /// A human moved the pointer: back to the armed state.
    pub fn on_human_movement(&mut self) {
        let previous = self.state;
        self.state = EscalationState::fresh(self.clock.now());

        if previous.alarm_triggered {
            info!(
                consecutive_auto_moves = previous.consecutive_auto_moves,
                "Human movement detected, alarm reset"
            );
        } else {
            debug!("Human movement detected");
        }
    }

    /// The poll loop just performed a synthetic move.
    pub fn on_auto_move(&mut self) -> AutoMoveReport {
        let now = self.clock.now();
        let idle_for = now.saturating_duration_since(self.state.last_human_move_at);

        let mut report = AutoMoveReport {
            idle_for,
            ..Default::default()
        };

        if let Some(sounded) = self.check_alarm(now, idle_for) {
            report.alarm_fired = true;
            report.alarm_sounded = sounded;
        }

        if self.state.alarm_triggered {
            self.state.consecutive_auto_moves = self.state.consecutive_auto_moves.saturating_add(1);
            let count = self.state.consecutive_auto_moves.min(self.max_ding_count);
            report.dings_requested = count;
            self.play_dings(count, &mut report);
        }

        report.cycle = self.state.consecutive_auto_moves;
        report
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            alarm_timeout: self.settings.alarm_timeout,
            poll_interval: self.settings.poll_interval,
            max_ding_count: self.max_ding_count,
            consecutive_auto_moves: self.state.consecutive_auto_moves,
            alarm_triggered: self.state.alarm_triggered,
        }
    }

    /// Sound the alarm if the timeout has elapsed since both the last human
    /// movement and the last alarm. Returns whether the notifier succeeded.
    fn check_alarm(&mut self, now: Instant, idle_for: Duration) -> Option<bool> {
        let timeout = self.settings.alarm_timeout;
        let since_alarm = self
            .state
            .last_alarm_at
            .map_or(idle_for, |at| now.saturating_duration_since(at));

        if idle_for < timeout || since_alarm < timeout {
            return None;
        }

        warn!(
            idle = %humantime::format_duration(round_secs(idle_for)),
            timeout = %humantime::format_duration(timeout),
            "ALARM: no manual pointer movement"
        );

        let sounded = match self.notifier.play_notification() {
            Ok(()) => {
                info!("Alarm sound played");
                true
            }
            Err(e) => {
                warn!("Failed to play alarm sound: {}", e);
                false
            }
        };

        // The ding counter keeps climbing across re-triggers.
        self.state.alarm_triggered = true;
        self.state.last_alarm_at = Some(now);
        Some(sounded)
    }

    fn play_dings(&mut self, count: u32, report: &mut AutoMoveReport) {
        if count == 0 {
            return;
        }

        info!(
            "Playing {} ding(s) after auto-move cycle #{}",
            count, self.state.consecutive_auto_moves
        );

        for index in 1..=count {
            if index > 1 {
                self.clock.sleep(self.settings.ding_unit);
            }
            match self.notifier.play_notification() {
                Ok(()) => {
                    report.dings_played += 1;
                    debug!("Ding #{} played", index);
                }
                Err(e) => {
                    warn!("Ding #{} failed to play: {}", index, e);
                    report.ding_failures.push(DingFailure {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.ding_failures.is_empty() {
            debug!("All {} ding(s) played", count);
        }
    }
}

fn round_secs(duration: Duration) -> Duration {
    Duration::from_secs(duration.as_secs())
}
