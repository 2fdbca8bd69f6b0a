//! Dialog and overlay state for the dashboard controller.

use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::store::StoreError;
use crate::types::{Section, Task};

pub const SECTION_COLOR_PALETTE: [&str; 8] = [
    "#bb9af7", // purple
    "#7aa2f7", // blue
    "#9ece6a", // green
    "#f7768e", // red
    "#ff9e64", // orange
    "#e0af68", // yellow
    "#f5c2e7", // pink
    "#73daca", // teal
];

/// Color assigned to a section created without an explicit pick.
pub const DEFAULT_SECTION_COLOR: &str = SECTION_COLOR_PALETTE[0];

pub fn palette_index(color: &str) -> Option<usize> {
    SECTION_COLOR_PALETTE
        .iter()
        .position(|preset| preset.eq_ignore_ascii_case(color.trim()))
}

/// Carry-forward prompt: yesterday's unfinished tasks with a selectable
/// subset. Every task starts selected.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PlanDayDialogState {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
    pub selected: HashSet<Uuid>,
}

impl PlanDayDialogState {
    pub fn new(date: NaiveDate, tasks: Vec<Task>) -> Self {
        let selected = tasks.iter().map(|task| task.id).collect();
        PlanDayDialogState {
            date,
            tasks,
            selected,
        }
    }

    pub fn toggle(&mut self, id: Uuid) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    pub fn is_selected(&self, id: Uuid) -> bool {
        self.selected.contains(&id)
    }

    /// Selected ids in task order.
    pub fn selected_ids(&self) -> Vec<Uuid> {
        self.tasks
            .iter()
            .filter(|task| self.selected.contains(&task.id))
            .map(|task| task.id)
            .collect()
    }

    pub fn can_confirm(&self) -> bool {
        !self.selected.is_empty()
    }
}

/// Offer to move a past day's unfinished tasks to today, raised when the
/// user navigates away from that day.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RescheduleDialogState {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
}

impl RescheduleDialogState {
    pub fn new(date: NaiveDate, tasks: Vec<Task>) -> Self {
        RescheduleDialogState { date, tasks }
    }

    pub fn task_ids(&self) -> Vec<Uuid> {
        self.tasks.iter().map(|task| task.id).collect()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum NameField {
    First,
    Last,
    Save,
}

/// First-run name prompt. Blocks until both parts are non-blank.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NamePromptDialogState {
    pub first_input: String,
    pub last_input: String,
    pub focused_field: NameField,
}

impl NamePromptDialogState {
    pub fn new() -> Self {
        NamePromptDialogState {
            first_input: String::new(),
            last_input: String::new(),
            focused_field: NameField::First,
        }
    }

    pub fn can_save(&self) -> bool {
        !self.first_input.trim().is_empty() && !self.last_input.trim().is_empty()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_input.trim(), self.last_input.trim())
            .trim()
            .to_string()
    }

    pub fn display_name(&self) -> String {
        self.first_input.trim().to_string()
    }
}

impl Default for NamePromptDialogState {
    fn default() -> Self {
        NamePromptDialogState::new()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SectionColorDialogState {
    pub section_id: Uuid,
    pub section_name: String,
    pub selected_index: usize,
}

impl SectionColorDialogState {
    pub fn for_section(section: &Section) -> Self {
        SectionColorDialogState {
            section_id: section.id,
            section_name: section.name.clone(),
            selected_index: palette_index(&section.color).unwrap_or(0),
        }
    }

    pub fn select(&mut self, index: usize) {
        self.selected_index = index.min(SECTION_COLOR_PALETTE.len() - 1);
    }

    pub fn selected_color(&self) -> &'static str {
        SECTION_COLOR_PALETTE[self.selected_index]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActiveDialog {
    None,
    PlanDay(PlanDayDialogState),
    Reschedule(RescheduleDialogState),
    NamePrompt(NamePromptDialogState),
    SectionColor(SectionColorDialogState),
}

impl ActiveDialog {
    pub fn is_none(&self) -> bool {
        matches!(self, ActiveDialog::None)
    }
}

/// A composed name change. Profile writes go through the auth provider
/// and force a full reload, so the controller queues the request for the
/// embedder instead of writing it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProfileNameRequest {
    pub full_name: String,
    pub display_name: String,
}

/// A mirror write that never reached the store. The entity keeps its
/// local value; the failure stays recorded here until drained, so the
/// divergence is observable instead of silent.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SyncFailure {
    pub operation: &'static str,
    pub error: StoreError,
}

impl SyncFailure {
    pub fn new(operation: &'static str, error: StoreError) -> Self {
        SyncFailure { operation, error }
    }
}
