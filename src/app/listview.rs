//! Local interaction state for the task list: edit buffers, drag
//! positions, collapsed groups. Nothing in here touches the store; the
//! controller commits finished edits through its own mutation paths.

use std::collections::HashSet;

use uuid::Uuid;

use crate::types::{Section, Task};

/// Identifies a task group in the list. The uncategorized bucket has no
/// backing row, so it gets its own variant instead of a nullable id.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SectionKey {
    Uncategorized,
    Section(Uuid),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ListViewState {
    pub new_task_text: String,
    pub new_task_section: Option<Uuid>,
    pub editing_task_id: Option<Uuid>,
    pub editing_text: String,
    pub renaming_section: Option<SectionKey>,
    pub renaming_text: String,
    pub collapsed: HashSet<SectionKey>,
    pub completed_open: bool,
    pub expanded_task: Option<Uuid>,
    pub drag_index: Option<usize>,
    pub drag_over_index: Option<usize>,
    pub drag_over_section: Option<SectionKey>,
    pub drag_section_index: Option<usize>,
    pub drag_over_section_index: Option<usize>,
}

impl ListViewState {
    pub fn new() -> Self {
        ListViewState {
            new_task_text: String::new(),
            new_task_section: None,
            editing_task_id: None,
            editing_text: String::new(),
            renaming_section: None,
            renaming_text: String::new(),
            collapsed: HashSet::new(),
            completed_open: true,
            expanded_task: None,
            drag_index: None,
            drag_over_index: None,
            drag_over_section: None,
            drag_section_index: None,
            drag_over_section_index: None,
        }
    }

    /// Timer shortcuts stay inert while any text edit is in progress.
    pub fn input_active(&self) -> bool {
        self.editing_task_id.is_some() || self.renaming_section.is_some()
    }

    pub fn toggle_collapsed(&mut self, key: SectionKey) {
        if !self.collapsed.remove(&key) {
            self.collapsed.insert(key);
        }
    }

    pub fn is_collapsed(&self, key: SectionKey) -> bool {
        self.collapsed.contains(&key)
    }

    pub fn toggle_completed_open(&mut self) {
        self.completed_open = !self.completed_open;
    }

    /// One task's notes are visible at a time; toggling the open one
    /// closes it.
    pub fn toggle_notes(&mut self, id: Uuid) {
        if self.expanded_task == Some(id) {
            self.expanded_task = None;
        } else {
            self.expanded_task = Some(id);
        }
    }

    pub fn begin_task_edit(&mut self, id: Uuid, current_text: &str) {
        self.editing_task_id = Some(id);
        self.editing_text = current_text.to_string();
    }

    pub fn cancel_task_edit(&mut self) {
        self.editing_task_id = None;
        self.editing_text.clear();
    }

    /// Close the edit buffer and hand back its contents, trimmed. `None`
    /// when nothing was being edited or the buffer trimmed to empty.
    pub fn take_task_edit(&mut self) -> Option<(Uuid, String)> {
        let id = self.editing_task_id.take()?;
        let text = self.editing_text.trim().to_string();
        self.editing_text.clear();
        if text.is_empty() { None } else { Some((id, text)) }
    }

    pub fn begin_section_rename(&mut self, key: SectionKey, current_name: &str) {
        self.renaming_section = Some(key);
        self.renaming_text = current_name.to_string();
    }

    pub fn cancel_section_rename(&mut self) {
        self.renaming_section = None;
        self.renaming_text.clear();
    }

    pub fn take_section_rename(&mut self) -> Option<(SectionKey, String)> {
        let key = self.renaming_section.take()?;
        let name = self.renaming_text.trim().to_string();
        self.renaming_text.clear();
        if name.is_empty() { None } else { Some((key, name)) }
    }

    pub fn clear_drag(&mut self) {
        self.drag_index = None;
        self.drag_over_index = None;
        self.drag_over_section = None;
        self.drag_section_index = None;
        self.drag_over_section_index = None;
    }
}

impl Default for ListViewState {
    fn default() -> Self {
        ListViewState::new()
    }
}

/// One rendered group: the uncategorized bucket or a section, with its
/// incomplete tasks for the day.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGroup<'a> {
    pub key: SectionKey,
    pub name: String,
    pub color: Option<String>,
    pub tasks: Vec<&'a Task>,
}

/// Group the day's incomplete tasks for display. The uncategorized
/// bucket always leads; sections follow in their stored order, but only
/// when at least one task (complete or not) sits in them today.
pub fn visible_groups<'a>(
    tasks: &'a [Task],
    sections: &'a [Section],
    uncategorized_name: &str,
) -> Vec<TaskGroup<'a>> {
    let active: HashSet<Uuid> = tasks.iter().filter_map(|task| task.section_id).collect();

    let mut groups = vec![TaskGroup {
        key: SectionKey::Uncategorized,
        name: uncategorized_name.to_string(),
        color: None,
        tasks: tasks
            .iter()
            .filter(|task| !task.completed && task.section_id.is_none())
            .collect(),
    }];

    for section in sections {
        if !active.contains(&section.id) {
            continue;
        }
        groups.push(TaskGroup {
            key: SectionKey::Section(section.id),
            name: section.name.clone(),
            color: Some(section.color.clone()),
            tasks: tasks
                .iter()
                .filter(|task| !task.completed && task.section_id == Some(section.id))
                .collect(),
        });
    }

    groups
}

pub fn completed_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|task| task.completed).collect()
}

/// Completed count, total count, and a whole-number percentage.
pub fn progress(tasks: &[Task]) -> (usize, usize, u32) {
    let total = tasks.len();
    let completed = tasks.iter().filter(|task| task.completed).count();
    let percent = if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    } else {
        0
    };
    (completed, total, percent)
}
