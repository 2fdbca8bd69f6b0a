//! Completion-cue backends for finished timer sessions

use std::io::Write;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::timer::TimerMode;

/// Cue backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationBackend {
    /// No cue
    None,
    /// Terminal bell only
    #[default]
    Bell,
    /// System notifications only (via notify-rust)
    System,
    /// Both terminal bell and system notification
    Both,
}

impl NotificationBackend {
    /// Parse backend from settings value (case-insensitive)
    pub fn from_settings_value(s: &str) -> Option<Self> {
        Self::from_str(s).ok()
    }

    /// Convert backend to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bell => "bell",
            Self::System => "system",
            Self::Both => "both",
        }
    }

    /// Get the next backend in cycling order: bell -> both -> system -> none -> bell
    pub fn next(&self) -> Self {
        match self {
            Self::Bell => Self::Both,
            Self::Both => Self::System,
            Self::System => Self::None,
            Self::None => Self::Bell,
        }
    }

    /// Get the previous backend in cycling order
    pub fn previous(&self) -> Self {
        match self {
            Self::Bell => Self::None,
            Self::None => Self::System,
            Self::System => Self::Both,
            Self::Both => Self::Bell,
        }
    }
}

impl FromStr for NotificationBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "bell" => Ok(Self::Bell),
            "system" => Ok(Self::System),
            "both" => Ok(Self::Both),
            _ => Err(()),
        }
    }
}

/// Send the session-finished cue via the configured backend(s). The bell
/// stands in for the two-tone chime: two writes, any terminal.
pub fn notify_session_finished(mode: TimerMode, backend: NotificationBackend) {
    let (send_bell, send_system) = backend_targets(backend);
    if !send_bell && !send_system {
        debug!(mode = mode.as_str(), "cue skipped (backend is none)");
        return;
    }

    let message = match mode {
        TimerMode::Focus => "Focus session complete. Time for a break.".to_string(),
        TimerMode::ShortBreak | TimerMode::LongBreak => {
            format!("{} over. Back to it.", mode.label())
        }
    };

    if send_bell {
        send_bell_cue(mode);
    }

    if send_system {
        send_system_notification(mode, &message);
    }
}

fn backend_targets(backend: NotificationBackend) -> (bool, bool) {
    match backend {
        NotificationBackend::None => (false, false),
        NotificationBackend::Bell => (true, false),
        NotificationBackend::System => (false, true),
        NotificationBackend::Both => (true, true),
    }
}

fn send_bell_cue(mode: TimerMode) {
    debug!(mode = mode.as_str(), "ringing terminal bell");
    let mut stdout = std::io::stdout();
    if let Err(err) = stdout.write_all(b"\x07\x07").and_then(|_| stdout.flush()) {
        warn!(error = %err, "failed to ring terminal bell");
    }
}

fn send_system_notification(mode: TimerMode, message: &str) {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        debug!(
            mode = mode.as_str(),
            message = %message,
            "sending system notification"
        );

        let notification_result = notify_rust::Notification::new()
            .summary("Pomodash")
            .body(message)
            .icon("dialog-information")
            .show();

        match notification_result {
            Ok(_) => {
                debug!(
                    mode = mode.as_str(),
                    "system notification sent successfully"
                );
            }
            Err(err) => {
                warn!(error = %err, "failed to send system notification");
            }
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        debug!(
            mode = mode.as_str(),
            "system notifications not supported on this OS"
        );
        let _ = message;
    }
}
