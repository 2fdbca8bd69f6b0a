//! Countdown state machine for focus and break sessions.
//!
//! The timer never owns a thread: the embedder drives it with one call to
//! [`FocusTimer::tick`] per second (the binary uses a tokio interval, the
//! tests call it directly). Reaching zero stops the run and reports the
//! finished mode; only a finished focus session earns stats credit, which
//! is the controller's job.

use serde::{Deserialize, Serialize};

pub const FOCUS_SECS: u64 = 25 * 60;
pub const SHORT_BREAK_SECS: u64 = 5 * 60;
pub const LONG_BREAK_SECS: u64 = 15 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub enum TimerMode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::ShortBreak => "short-break",
            TimerMode::LongBreak => "long-break",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "focus" => Some(TimerMode::Focus),
            "short-break" | "short" => Some(TimerMode::ShortBreak),
            "long-break" | "long" => Some(TimerMode::LongBreak),
            _ => None,
        }
    }
}

/// Seconds per mode, configurable through settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct TimerDurations {
    pub focus_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
}

impl Default for TimerDurations {
    fn default() -> Self {
        TimerDurations {
            focus_secs: FOCUS_SECS,
            short_break_secs: SHORT_BREAK_SECS,
            long_break_secs: LONG_BREAK_SECS,
        }
    }
}

impl TimerDurations {
    pub fn for_mode(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Focus => self.focus_secs,
            TimerMode::ShortBreak => self.short_break_secs,
            TimerMode::LongBreak => self.long_break_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FocusTimer {
    durations: TimerDurations,
    mode: TimerMode,
    remaining_secs: u64,
    running: bool,
}

impl FocusTimer {
    pub fn new(durations: TimerDurations) -> Self {
        FocusTimer {
            remaining_secs: durations.for_mode(TimerMode::Focus),
            durations,
            mode: TimerMode::Focus,
            running: false,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start/pause. Starting after the countdown hit zero restarts from
    /// the full duration of the current mode.
    pub fn toggle(&mut self) {
        if !self.running && self.remaining_secs == 0 {
            self.remaining_secs = self.durations.for_mode(self.mode);
        }
        self.running = !self.running;
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.remaining_secs = self.durations.for_mode(self.mode);
    }

    pub fn switch_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.running = false;
        self.remaining_secs = self.durations.for_mode(mode);
    }

    /// One-second step. Returns the finished mode when this tick drained
    /// the countdown; the run stops in the same step.
    pub fn tick(&mut self) -> Option<TimerMode> {
        if !self.running {
            return None;
        }

        if self.remaining_secs <= 1 {
            self.remaining_secs = 0;
            self.running = false;
            return Some(self.mode);
        }

        self.remaining_secs -= 1;
        None
    }
}

/// "MM:SS" readout; minutes widen past two digits for long durations.
pub fn format_clock(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
