//! Persistence-service client: row-oriented reads and writes scoped to a
//! user, with equality/range/set filters on date and id columns.
//!
//! [`rest`] talks to the hosted row API over HTTP; [`memory`] is the
//! volatile stand-in the test suite drives the controller against. Both
//! implement [`TaskStore`]. The optional `sort_order` column is the one
//! piece of schema the client must not assume: a probe at startup fills
//! [`StoreCapabilities`], and inserts keep a one-shot fallback for the
//! case where the probe raced a schema change.

pub mod memory;
pub mod rest;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DailyStats, Section, Task};

/// Error code the hosted API reports for a reference to a column that
/// does not exist in the schema.
pub const UNDEFINED_COLUMN_CODE: &str = "42703";

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct StoreError {
    pub code: String,
    pub message: String,
}

impl StoreError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports `column` as absent from the schema.
    pub fn is_missing_column(&self, column: &str) -> bool {
        self.code == UNDEFINED_COLUMN_CODE && self.message.contains(column)
            || self.message.contains(column) && self.message.contains("does not exist")
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store error [{}]: {}", self.code, self.message)
    }
}

impl std::error::Error for StoreError {}

/// What the startup probe learned about the schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct StoreCapabilities {
    /// The tasks table has a `sort_order` column; ordering writes are
    /// allowed. When false, inserts omit the field and reorders no-op.
    pub task_ordering: bool,
}

impl Default for StoreCapabilities {
    fn default() -> Self {
        StoreCapabilities {
            task_ordering: true,
        }
    }
}

/// Insert payload for a task row. [`NewTask::for_date`] covers the
/// everyday add; the legacy import builds rows field by field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTask {
    pub user_id: Uuid,
    pub text: String,
    pub completed: bool,
    pub pomodoros_spent: i64,
    pub scheduled_date: NaiveDate,
    pub completed_at: Option<String>,
    pub section_id: Option<Uuid>,
    pub sort_order: Option<i64>,
}

impl NewTask {
    pub fn for_date(user_id: Uuid, text: impl Into<String>, scheduled_date: NaiveDate) -> Self {
        NewTask {
            user_id,
            text: text.into(),
            completed: false,
            pomodoros_spent: 0,
            scheduled_date,
            completed_at: None,
            section_id: None,
            sort_order: None,
        }
    }
}

/// Field updates for a task row. `None` leaves a column untouched; the
/// nested options distinguish "set to null" from "leave alone".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<String>>,
    pub pomodoros_spent: Option<i64>,
    pub scheduled_date: Option<NaiveDate>,
    pub description: Option<Option<String>>,
    pub section_id: Option<Option<Uuid>>,
    pub sort_order: Option<i64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &TaskPatch::default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        if let Some(text) = &self.text {
            body.insert("text".into(), serde_json::json!(text));
        }
        if let Some(completed) = self.completed {
            body.insert("completed".into(), serde_json::json!(completed));
        }
        if let Some(completed_at) = &self.completed_at {
            body.insert("completed_at".into(), serde_json::json!(completed_at));
        }
        if let Some(spent) = self.pomodoros_spent {
            body.insert("pomodoros_spent".into(), serde_json::json!(spent));
        }
        if let Some(date) = self.scheduled_date {
            body.insert("scheduled_date".into(), serde_json::json!(date));
        }
        if let Some(description) = &self.description {
            body.insert("description".into(), serde_json::json!(description));
        }
        if let Some(section_id) = &self.section_id {
            body.insert("section_id".into(), serde_json::json!(section_id));
        }
        if let Some(order) = self.sort_order {
            body.insert("sort_order".into(), serde_json::json!(order));
        }
        serde_json::Value::Object(body)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSection {
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i64>,
}

impl SectionPatch {
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        if let Some(name) = &self.name {
            body.insert("name".into(), serde_json::json!(name));
        }
        if let Some(color) = &self.color {
            body.insert("color".into(), serde_json::json!(color));
        }
        if let Some(order) = self.sort_order {
            body.insert("sort_order".into(), serde_json::json!(order));
        }
        serde_json::Value::Object(body)
    }
}

/// One row of the month-count query: a task's day and completion flag.
/// The controller folds these into per-date tallies.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct TaskDayRow {
    pub scheduled_date: NaiveDate,
    pub completed: bool,
}

/// The persistence surface the controller depends on. Everything is
/// scoped by the owning user id; implementations add no merge logic of
/// their own, they read and write rows.
#[allow(async_fn_in_trait)]
pub trait TaskStore {
    /// Probe the schema once at startup.
    async fn probe_capabilities(&self) -> Result<StoreCapabilities, StoreError>;

    /// Tasks scheduled on one day, ordered by creation time.
    async fn fetch_tasks_for_date(
        &self,
        user: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Task>, StoreError>;

    /// Incomplete tasks on one day; feeds the carry-forward prompt.
    async fn fetch_incomplete_tasks(
        &self,
        user: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Task>, StoreError>;

    /// Day/completed pairs for every task in the date range (inclusive).
    async fn fetch_task_days(
        &self,
        user: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TaskDayRow>, StoreError>;

    async fn fetch_stats(
        &self,
        user: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyStats>, StoreError>;

    /// Stats rows in the date range (inclusive); feeds the streak badge.
    async fn fetch_stats_range(
        &self,
        user: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyStats>, StoreError>;

    async fn fetch_sections(&self, user: Uuid) -> Result<Vec<Section>, StoreError>;

    /// Whether the user has any task rows at all; gates the one-time
    /// legacy import.
    async fn has_any_tasks(&self, user: Uuid) -> Result<bool, StoreError>;

    /// Insert one task and return the stored row. When `with_sort_order`
    /// is false the field is omitted from the payload entirely.
    async fn insert_task(&self, task: &NewTask, with_sort_order: bool)
    -> Result<Task, StoreError>;

    /// Batch insert for the legacy import; no rows returned.
    async fn insert_tasks(&self, tasks: &[NewTask]) -> Result<(), StoreError>;

    async fn update_task(
        &self,
        user: Uuid,
        id: Uuid,
        patch: &TaskPatch,
    ) -> Result<(), StoreError>;

    /// Move a set of tasks to a new day in one call (id set filter).
    async fn update_tasks_date(
        &self,
        user: Uuid,
        ids: &[Uuid],
        date: NaiveDate,
    ) -> Result<(), StoreError>;

    /// Write new sort positions, one row per pair.
    async fn update_task_order(
        &self,
        user: Uuid,
        orders: &[(Uuid, i64)],
    ) -> Result<(), StoreError>;

    async fn delete_task(&self, user: Uuid, id: Uuid) -> Result<(), StoreError>;

    async fn insert_section(&self, section: &NewSection) -> Result<Section, StoreError>;

    async fn update_section(
        &self,
        user: Uuid,
        id: Uuid,
        patch: &SectionPatch,
    ) -> Result<(), StoreError>;

    async fn update_section_order(
        &self,
        user: Uuid,
        orders: &[(Uuid, i64)],
    ) -> Result<(), StoreError>;

    /// Delete a section row. Detaching its tasks is the schema's set-null
    /// policy remotely and the controller's local patch.
    async fn delete_section(&self, user: Uuid, id: Uuid) -> Result<(), StoreError>;

    /// Create-or-update keyed on (user, date).
    async fn upsert_stats(&self, stats: &DailyStats) -> Result<(), StoreError>;
}
