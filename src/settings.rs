use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::notification::NotificationBackend;
use crate::timer::{FOCUS_SECS, LONG_BREAK_SECS, SHORT_BREAK_SECS, TimerDurations};

const MIN_SESSION_MINUTES: u64 = 1;
const MAX_SESSION_MINUTES: u64 = 180;
const DEFAULT_FOCUS_MINUTES: u64 = FOCUS_SECS / 60;
const DEFAULT_SHORT_BREAK_MINUTES: u64 = SHORT_BREAK_SECS / 60;
const DEFAULT_LONG_BREAK_MINUTES: u64 = LONG_BREAK_SECS / 60;
const MIN_REQUEST_TIMEOUT_SECS: u64 = 3;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the hosted project; empty means not configured.
    pub store_url: String,
    pub store_api_key: String,
    /// Default sign-in email for `auth login`.
    pub email: String,
    pub focus_minutes: u64,
    pub short_break_minutes: u64,
    pub long_break_minutes: u64,
    pub notification: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            store_api_key: String::new(),
            email: String::new(),
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            short_break_minutes: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_minutes: DEFAULT_LONG_BREAK_MINUTES,
            notification: NotificationBackend::default().as_str().to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("pomodash");
        path.push("settings.toml");
        Some(path)
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(mut settings) => {
                    settings.validate();
                    settings
                }
                Err(error) => {
                    warn!(
                        "failed to parse settings config '{}': {}",
                        path.display(),
                        error
                    );
                    Self::default()
                }
            },
            Err(error) => {
                warn!(
                    "failed to read settings config '{}': {}",
                    path.display(),
                    error
                );
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path().ok_or_else(|| anyhow!("unable to determine config path"))?;
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("invalid settings config path"))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory '{}'", parent.display()))?;

        let mut validated = self.clone();
        validated.validate();
        let contents =
            toml::to_string_pretty(&validated).context("failed to serialize settings to TOML")?;

        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("invalid settings config file name"))?
            .to_string_lossy()
            .to_string();
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp_path, contents).with_context(|| {
            format!(
                "failed to write temporary settings file '{}'",
                tmp_path.display()
            )
        })?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "failed to atomically rename settings file '{}' to '{}'",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    fn validate(&mut self) {
        self.store_url = self.store_url.trim().trim_end_matches('/').to_string();
        self.store_api_key = self.store_api_key.trim().to_string();
        self.email = self.email.trim().to_string();

        self.focus_minutes = self
            .focus_minutes
            .clamp(MIN_SESSION_MINUTES, MAX_SESSION_MINUTES);
        self.short_break_minutes = self
            .short_break_minutes
            .clamp(MIN_SESSION_MINUTES, MAX_SESSION_MINUTES);
        self.long_break_minutes = self
            .long_break_minutes
            .clamp(MIN_SESSION_MINUTES, MAX_SESSION_MINUTES);
        self.request_timeout_secs = self
            .request_timeout_secs
            .clamp(MIN_REQUEST_TIMEOUT_SECS, MAX_REQUEST_TIMEOUT_SECS);

        self.notification = match NotificationBackend::from_str(&self.notification) {
            Ok(backend) => backend.as_str().to_string(),
            Err(()) => {
                warn!(
                    "invalid notification backend '{}' in settings config; falling back to {}",
                    self.notification,
                    NotificationBackend::default().as_str()
                );
                NotificationBackend::default().as_str().to_string()
            }
        };
    }

    pub fn is_store_configured(&self) -> bool {
        !self.store_url.is_empty() && !self.store_api_key.is_empty()
    }

    pub fn timer_durations(&self) -> TimerDurations {
        TimerDurations {
            focus_secs: self.focus_minutes * 60,
            short_break_secs: self.short_break_minutes * 60,
            long_break_secs: self.long_break_minutes * 60,
        }
    }

    pub fn notification_backend(&self) -> NotificationBackend {
        NotificationBackend::from_str(&self.notification).unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
