//! Field-worker safety
//!
//! - **countdown**: deadline-based countdown state machine with dead-man switch
//!   and fall-detection presets
//! - **monitor**: ties both countdowns to danger-zone mode and raises alerts

pub mod countdown;
pub mod monitor;

pub use countdown::{
    Countdown, CountdownEvent, CountdownState, DEAD_MAN_INTERVAL, DEAD_MAN_WARNING,
    FALL_COUNTDOWN,
};
pub use monitor::{MonitorConfig, MonitorStatus, SafetyEvent, SafetyMonitor, DEFAULT_LOCATION};
