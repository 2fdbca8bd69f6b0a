//! Machine-local state: the cached sign-in session, the "already planned
//! today" marker, the preferred display name for the uncategorized
//! bucket, and the data file left behind by the pre-account releases
//! (imported once, then removed).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::StoredSession;

pub const DEFAULT_UNCATEGORIZED_NAME: &str = "Uncategorized";

const APP_DIR: &str = "pomodash";
const STATE_FILE: &str = "state.json";
pub(crate) const LEGACY_FILE: &str = "local.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalState {
    /// Day the plan-your-day prompt last ran, whether confirmed or
    /// dismissed. The prompt stays quiet while this matches today.
    pub planned_on: Option<NaiveDate>,
    pub uncategorized_name: Option<String>,
    pub session: Option<StoredSession>,
}

impl LocalState {
    pub fn planned_today(&self, today: NaiveDate) -> bool {
        self.planned_on == Some(today)
    }

    pub fn mark_planned(&mut self, today: NaiveDate) {
        self.planned_on = Some(today);
    }

    pub fn uncategorized_name(&self) -> &str {
        self.uncategorized_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_UNCATEGORIZED_NAME)
    }

    /// Empty or whitespace-only names are dropped rather than stored.
    pub fn set_uncategorized_name(&mut self, name: &str) {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            self.uncategorized_name = Some(trimmed.to_string());
        }
    }
}

/// Data file of the pre-account releases: one flat task list plus the
/// running focus totals for the day it was last written.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LegacySnapshot {
    pub tasks: Vec<LegacyTask>,
    pub stats: Option<LegacyStats>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyTask {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, alias = "pomodorosSpent")]
    pub pomodoros_spent: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyStats {
    #[serde(alias = "totalFocusMinutes")]
    pub total_focus_minutes: i64,
    #[serde(alias = "sessionsToday")]
    pub sessions_today: i64,
    pub date: NaiveDate,
}

impl LegacySnapshot {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.stats.is_none()
    }
}

pub struct LocalData {
    path: PathBuf,
    legacy_path: PathBuf,
    pub state: LocalState,
}

impl LocalData {
    fn data_dir() -> Option<PathBuf> {
        let mut path = dirs::data_dir()?;
        path.push(APP_DIR);
        Some(path)
    }

    /// Open the state file in the platform data directory. A missing or
    /// unreadable file starts from defaults.
    pub fn open() -> Self {
        match Self::data_dir() {
            Some(dir) => Self::open_in(&dir),
            None => {
                warn!("unable to determine data directory; local state will not persist");
                LocalData {
                    path: PathBuf::from(STATE_FILE),
                    legacy_path: PathBuf::from(LEGACY_FILE),
                    state: LocalState::default(),
                }
            }
        }
    }

    pub fn open_in(dir: &Path) -> Self {
        let path = dir.join(STATE_FILE);
        let legacy_path = dir.join(LEGACY_FILE);
        let state = Self::load_state(&path);
        LocalData {
            path,
            legacy_path,
            state,
        }
    }

    fn load_state(path: &Path) -> LocalState {
        if !path.exists() {
            return LocalState::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<LocalState>(&contents) {
                Ok(state) => state,
                Err(error) => {
                    warn!("failed to parse local state '{}': {}", path.display(), error);
                    LocalState::default()
                }
            },
            Err(error) => {
                warn!("failed to read local state '{}': {}", path.display(), error);
                LocalState::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| anyhow!("invalid local state path"))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data directory '{}'", parent.display()))?;

        let contents =
            serde_json::to_string_pretty(&self.state).context("failed to serialize local state")?;

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| anyhow!("invalid local state file name"))?
            .to_string_lossy()
            .to_string();
        let tmp_path = self.path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp_path, contents).with_context(|| {
            format!(
                "failed to write temporary state file '{}'",
                tmp_path.display()
            )
        })?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "failed to atomically rename state file '{}' to '{}'",
                tmp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Read the pre-account data file if one exists. Unparseable files
    /// are reported and treated as absent.
    pub fn load_legacy_snapshot(&self) -> Option<LegacySnapshot> {
        if !self.legacy_path.exists() {
            return None;
        }

        match fs::read_to_string(&self.legacy_path) {
            Ok(contents) => match serde_json::from_str::<LegacySnapshot>(&contents) {
                Ok(snapshot) => Some(snapshot),
                Err(error) => {
                    warn!(
                        "failed to parse legacy snapshot '{}': {}",
                        self.legacy_path.display(),
                        error
                    );
                    None
                }
            },
            Err(error) => {
                warn!(
                    "failed to read legacy snapshot '{}': {}",
                    self.legacy_path.display(),
                    error
                );
                None
            }
        }
    }

    /// Remove the pre-account data file. Import runs at most once, so
    /// the file goes away whatever came of it.
    pub fn discard_legacy_snapshot(&self) {
        if !self.legacy_path.exists() {
            return;
        }
        if let Err(error) = fs::remove_file(&self.legacy_path) {
            warn!(
                "failed to remove legacy snapshot '{}': {}",
                self.legacy_path.display(),
                error
            );
        }
    }

    pub fn has_legacy_snapshot(&self) -> bool {
        self.legacy_path.exists()
    }
}
