//! Countdown state machine
//!
//! A countdown is deadline-based: it stores when it will reach zero and reads
//! the remaining time from the injected [`Clock`], so a late `poll()` still
//! observes the right state.
//!
//! ```text
//! Disarmed --arm--> Armed --(remaining <= warning)--> Warning --(0)--> Expired
//!                     ^                                  |               |
//!                     +------------acknowledge-----------+               |
//!                     +------------------(rearm_on_fire)-----------------+
//! ```

use crate::clock::Clock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Check-in interval of the dead-man switch
pub const DEAD_MAN_INTERVAL: Duration = Duration::from_secs(30 * 60);
/// Remaining time at which the dead-man switch warns
pub const DEAD_MAN_WARNING: Duration = Duration::from_secs(5 * 60);
/// Time to dismiss a detected fall before the SOS goes out
pub const FALL_COUNTDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownState {
    Disarmed,
    Armed,
    Warning,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    WarningEntered,
    Fired,
}

pub struct Countdown {
    clock: Arc<dyn Clock>,
    max: Duration,
    warning: Option<Duration>,
    rearm_on_fire: bool,
    state: CountdownState,
    deadline: i64,
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("max", &self.max)
            .field("warning", &self.warning)
            .field("state", &self.state)
            .field("remaining", &self.remaining())
            .finish()
    }
}

impl Countdown {
    /// Create a disarmed countdown
    ///
    /// A `warning` threshold at or above `max` is ignored.
    pub fn new(clock: Arc<dyn Clock>, max: Duration, warning: Option<Duration>) -> Self {
        Self {
            clock,
            max,
            warning: warning.filter(|w| *w < max),
            rearm_on_fire: false,
            state: CountdownState::Disarmed,
            deadline: 0,
        }
    }

    /// Restart at the maximum after firing instead of staying expired
    pub fn rearm_on_fire(mut self, rearm: bool) -> Self {
        self.rearm_on_fire = rearm;
        self
    }

    /// 30 minute check-in timer that warns 5 minutes out and re-arms after firing
    pub fn dead_man_switch(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, DEAD_MAN_INTERVAL, Some(DEAD_MAN_WARNING)).rearm_on_fire(true)
    }

    /// 60 second fall confirmation timer
    pub fn fall_detection(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, FALL_COUNTDOWN, None)
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CountdownState::Armed | CountdownState::Warning)
    }

    /// Start from the maximum; no-op while already running
    pub fn arm(&mut self) {
        if !self.is_running() {
            self.restart();
        }
    }

    /// Reset to the maximum and leave any warning
    pub fn acknowledge(&mut self) {
        if self.state != CountdownState::Disarmed {
            self.restart();
        }
    }

    pub fn disarm(&mut self) {
        self.state = CountdownState::Disarmed;
    }

    /// Jump straight to expiry
    ///
    /// Returns `Fired` if the countdown was running.
    pub fn expire(&mut self) -> Option<CountdownEvent> {
        if !self.is_running() {
            return None;
        }
        self.fire();
        Some(CountdownEvent::Fired)
    }

    fn restart(&mut self) {
        let max_ms = i64::try_from(self.max.as_millis()).unwrap_or(i64::MAX);
        self.deadline = self.clock.now_millis().saturating_add(max_ms);
        self.state = CountdownState::Armed;
    }

    fn fire(&mut self) {
        if self.rearm_on_fire {
            self.restart();
        } else {
            self.state = CountdownState::Expired;
        }
    }

    /// Time left; the full interval when disarmed and zero once expired
    pub fn remaining(&self) -> Duration {
        match self.state {
            CountdownState::Disarmed => self.max,
            CountdownState::Expired => Duration::ZERO,
            CountdownState::Armed | CountdownState::Warning => {
                let left = self.deadline.saturating_sub(self.clock.now_millis());
                Duration::from_millis(u64::try_from(left).unwrap_or(0))
            }
        }
    }

    /// Advance the state machine to the current time
    ///
    /// `Fired` is reported once per cycle, however late the poll.
    pub fn poll(&mut self) -> Vec<CountdownEvent> {
        let mut events = Vec::new();
        if !self.is_running() {
            return events;
        }

        let remaining = self.remaining();
        if self.state == CountdownState::Armed {
            if let Some(warning) = self.warning {
                if remaining <= warning {
                    self.state = CountdownState::Warning;
                    events.push(CountdownEvent::WarningEntered);
                }
            }
        }

        if remaining.is_zero() {
            self.fire();
            events.push(CountdownEvent::Fired);
        }

        events
    }

    /// Remaining time as `MM:SS`, rounding partial seconds up
    pub fn display(&self) -> String {
        let secs = self.remaining().as_millis().div_ceil(1000);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}
