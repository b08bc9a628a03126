//! Field-worker safety monitor
//!
//! Owns the dead-man switch and the fall-detection countdown and ties them to
//! danger-zone mode. Alerts go out on a broadcast channel.

use super::countdown::{Countdown, CountdownEvent, CountdownState};
use crate::clock::Clock;
use crate::theme::ThemeState;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Location reported when nothing better is known
pub const DEFAULT_LOCATION: &str = "last known GPS fix";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SafetyEvent {
    /// Danger-zone mode armed the dead-man switch
    SwitchActivated,
    SwitchDeactivated,
    /// Dead-man switch entered its warning window
    CheckInWarning { remaining_secs: u64 },
    CheckedIn,
    /// Dead-man switch ran out; supervisor is alerted
    EmergencyAlert { location: String, at: i64 },
    FallDetected,
    FallDismissed,
    /// Fall countdown ran out or SOS was sent by hand
    FallSos { location: String, at: i64 },
}

/// Monitor timings
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub check_in_interval: Duration,
    pub warning_window: Duration,
    pub fall_countdown: Duration,
    pub last_known_location: String,
    pub tick: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_in_interval: super::DEAD_MAN_INTERVAL,
            warning_window: super::DEAD_MAN_WARNING,
            fall_countdown: super::FALL_COUNTDOWN,
            last_known_location: DEFAULT_LOCATION.to_string(),
            tick: Duration::from_secs(1),
        }
    }
}

/// Point-in-time view of both countdowns
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonitorStatus {
    pub dead_man: CountdownState,
    pub dead_man_display: String,
    pub fall: CountdownState,
    pub fall_display: String,
}

struct Timers {
    dead_man: Countdown,
    fall: Countdown,
}

pub struct SafetyMonitor {
    clock: Arc<dyn Clock>,
    timers: Mutex<Timers>,
    location: Mutex<String>,
    tick: Duration,
    events: broadcast::Sender<SafetyEvent>,
}

impl SafetyMonitor {
    pub fn new(config: MonitorConfig, clock: Arc<dyn Clock>) -> Self {
        let dead_man = Countdown::new(
            Arc::clone(&clock),
            config.check_in_interval,
            Some(config.warning_window),
        )
        .rearm_on_fire(true);
        let fall = Countdown::new(Arc::clone(&clock), config.fall_countdown, None);
        let (events, _) = broadcast::channel(64);

        Self {
            clock,
            timers: Mutex::new(Timers { dead_man, fall }),
            location: Mutex::new(config.last_known_location),
            tick: config.tick,
            events,
        }
    }

    fn timers(&self) -> MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn location(&self) -> String {
        self.location
            .lock()
            .map(|l| l.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    fn emit(&self, event: SafetyEvent) -> SafetyEvent {
        match &event {
            SafetyEvent::EmergencyAlert { location, .. } | SafetyEvent::FallSos { location, .. } => {
                tracing::warn!(event = ?event, location = %location, "Safety alert raised");
            }
            _ => tracing::info!(event = ?event, "Safety state changed"),
        }
        let _ = self.events.send(event.clone());
        event
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SafetyEvent> {
        self.events.subscribe()
    }

    pub fn update_location(&self, location: impl Into<String>) {
        let mut current = self.location.lock().unwrap_or_else(|e| e.into_inner());
        *current = location.into();
    }

    pub fn status(&self) -> MonitorStatus {
        let timers = self.timers();
        MonitorStatus {
            dead_man: timers.dead_man.state(),
            dead_man_display: timers.dead_man.display(),
            fall: timers.fall.state(),
            fall_display: timers.fall.display(),
        }
    }

    /// Follow danger-zone mode: entering arms the switch, leaving disarms everything
    pub fn set_danger_zone(&self, active: bool) {
        let changed = {
            let mut timers = self.timers();
            if active && timers.dead_man.state() == CountdownState::Disarmed {
                timers.dead_man.arm();
                true
            } else if !active && timers.dead_man.state() != CountdownState::Disarmed {
                timers.dead_man.disarm();
                timers.fall.disarm();
                true
            } else {
                false
            }
        };

        if changed {
            self.emit(if active {
                SafetyEvent::SwitchActivated
            } else {
                SafetyEvent::SwitchDeactivated
            });
        }
    }

    /// Reset the dead-man switch; false when it is not active
    pub fn check_in(&self) -> bool {
        let acknowledged = {
            let mut timers = self.timers();
            if timers.dead_man.is_running() {
                timers.dead_man.acknowledge();
                true
            } else {
                false
            }
        };
        if acknowledged {
            self.emit(SafetyEvent::CheckedIn);
        }
        acknowledged
    }

    /// Start the fall confirmation countdown
    pub fn report_fall(&self) {
        {
            let mut timers = self.timers();
            timers.fall.disarm();
            timers.fall.arm();
        }
        self.emit(SafetyEvent::FallDetected);
    }

    pub fn dismiss_fall(&self) {
        let was_active = {
            let mut timers = self.timers();
            let was_active = timers.fall.state() != CountdownState::Disarmed;
            timers.fall.disarm();
            was_active
        };
        if was_active {
            self.emit(SafetyEvent::FallDismissed);
        }
    }

    /// Send the SOS now without waiting for the fall countdown
    pub fn send_sos(&self) -> SafetyEvent {
        self.timers().fall.expire();
        self.emit(SafetyEvent::FallSos {
            location: self.location(),
            at: self.clock.now_millis(),
        })
    }

    /// Advance both countdowns and publish what happened
    pub fn poll(&self) -> Vec<SafetyEvent> {
        let (dead_man_events, remaining, fall_events) = {
            let mut timers = self.timers();
            let dead_man_events = timers.dead_man.poll();
            let remaining = timers.dead_man.remaining();
            (dead_man_events, remaining, timers.fall.poll())
        };

        let now = self.clock.now_millis();
        let mut out = Vec::new();

        for event in dead_man_events {
            out.push(self.emit(match event {
                CountdownEvent::WarningEntered => SafetyEvent::CheckInWarning {
                    remaining_secs: remaining.as_secs(),
                },
                CountdownEvent::Fired => SafetyEvent::EmergencyAlert {
                    location: self.location(),
                    at: now,
                },
            }));
        }

        for event in fall_events {
            if event == CountdownEvent::Fired {
                out.push(self.emit(SafetyEvent::FallSos {
                    location: self.location(),
                    at: now,
                }));
            }
        }

        out
    }

    /// Tick until `shutdown` flips, tracking danger-zone changes from `theme`
    pub async fn run(
        self: Arc<Self>,
        mut theme: watch::Receiver<ThemeState>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        self.set_danger_zone(theme.borrow_and_update().is_danger_zone);
        let mut interval = tokio::time::interval(self.tick);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll();
                }
                changed = theme.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let active = theme.borrow_and_update().is_danger_zone;
                    self.set_danger_zone(active);
                }
                _ = async {
                    let _ = shutdown.wait_for(|stopped| *stopped).await;
                } => break,
            }
        }

        tracing::debug!("Safety monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use crate::theme::ThemeStore;

    fn monitor() -> (SafetyMonitor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(5_000));
        let config = MonitorConfig {
            last_known_location: "Site 3, Ganga".to_string(),
            ..MonitorConfig::default()
        };
        (SafetyMonitor::new(config, clock.clone()), clock)
    }

    #[test]
    fn test_danger_zone_arms_and_disarms() {
        let (monitor, _clock) = monitor();
        assert_eq!(monitor.status().dead_man, CountdownState::Disarmed);

        monitor.set_danger_zone(true);
        assert_eq!(monitor.status().dead_man, CountdownState::Armed);

        monitor.report_fall();
        monitor.set_danger_zone(false);
        let status = monitor.status();
        assert_eq!(status.dead_man, CountdownState::Disarmed);
        assert_eq!(status.fall, CountdownState::Disarmed);
    }

    #[test]
    fn test_missed_check_in_raises_alert() {
        let (monitor, clock) = monitor();
        let mut rx = monitor.subscribe();
        monitor.set_danger_zone(true);
        assert_eq!(rx.try_recv().unwrap(), SafetyEvent::SwitchActivated);

        clock.advance(Duration::from_secs(25 * 60));
        assert_eq!(
            monitor.poll(),
            vec![SafetyEvent::CheckInWarning { remaining_secs: 300 }]
        );

        clock.advance(Duration::from_secs(5 * 60));
        let events = monitor.poll();
        assert_eq!(
            events,
            vec![SafetyEvent::EmergencyAlert {
                location: "Site 3, Ganga".to_string(),
                at: 5_000 + 30 * 60 * 1000,
            }]
        );
        // Re-armed for the next cycle
        assert_eq!(monitor.status().dead_man_display, "30:00");
    }

    #[test]
    fn test_check_in_resets_timer() {
        let (monitor, clock) = monitor();
        assert!(!monitor.check_in());

        monitor.set_danger_zone(true);
        clock.advance(Duration::from_secs(29 * 60));
        assert!(monitor.check_in());
        clock.advance(Duration::from_secs(2 * 60));
        assert!(monitor.poll().is_empty());
        assert_eq!(monitor.status().dead_man_display, "28:00");
    }

    #[test]
    fn test_fall_countdown_sends_sos_once() {
        let (monitor, clock) = monitor();
        monitor.update_location("Bridge 12");
        monitor.report_fall();

        clock.advance(Duration::from_secs(61));
        let events = monitor.poll();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], SafetyEvent::FallSos { location, .. } if location == "Bridge 12"));
        assert!(monitor.poll().is_empty());
        assert_eq!(monitor.status().fall, CountdownState::Expired);
    }

    #[test]
    fn test_dismiss_fall_prevents_sos() {
        let (monitor, clock) = monitor();
        monitor.report_fall();
        clock.advance(Duration::from_secs(30));
        monitor.dismiss_fall();
        clock.advance(Duration::from_secs(60));
        assert!(monitor.poll().is_empty());
    }

    #[test]
    fn test_send_sos_is_immediate() {
        let (monitor, clock) = monitor();
        monitor.report_fall();
        let event = monitor.send_sos();
        assert!(matches!(event, SafetyEvent::FallSos { at: 5_000, .. }));

        clock.advance(Duration::from_secs(120));
        assert!(monitor.poll().is_empty());
    }

    #[test]
    fn test_event_wire_shape() {
        let value = serde_json::to_value(SafetyEvent::CheckInWarning { remaining_secs: 300 }).unwrap();
        assert_eq!(value, serde_json::json!({"type": "check_in_warning", "remaining_secs": 300}));
    }

    #[tokio::test]
    async fn test_run_follows_theme_store() {
        let theme = ThemeStore::load(Arc::new(MemoryStore::new()));
        let config = MonitorConfig {
            tick: Duration::from_millis(10),
            ..MonitorConfig::default()
        };
        let monitor = Arc::new(SafetyMonitor::new(config, Arc::new(ManualClock::new(0))));
        let mut events = monitor.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(Arc::clone(&monitor).run(theme.subscribe(), stop_rx));

        theme.set_danger_zone(true);
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, SafetyEvent::SwitchActivated);

        theme.set_danger_zone(false);
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, SafetyEvent::SwitchDeactivated);

        stop_tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_follows_danger_zone_written_elsewhere() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let open = || -> Arc<dyn crate::storage::KeyValueStore> {
            Arc::new(crate::storage::FileStore::open(temp_dir.path()).unwrap())
        };
        let running = ThemeStore::load(open());
        let other = ThemeStore::load(open());
        let config = MonitorConfig {
            tick: Duration::from_millis(10),
            ..MonitorConfig::default()
        };
        let monitor = Arc::new(SafetyMonitor::new(config, Arc::new(ManualClock::new(0))));
        let mut events = monitor.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(&monitor).run(running.subscribe(), stop_rx));

        other.set_danger_zone(true);
        running.reload();
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, SafetyEvent::SwitchActivated);

        other.set_danger_zone(false);
        running.reload();
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, SafetyEvent::SwitchDeactivated);
        assert_eq!(monitor.status().dead_man, CountdownState::Disarmed);

        stop_tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
