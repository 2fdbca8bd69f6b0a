//! Dashboard controller: one user's tasks, sections, stats, and timer,
//! reconciled between in-memory state and the hosted store.
//!
//! Reads replace state wholesale; mutations apply locally first and then
//! mirror to the store. Only adding a task or section waits for the
//! server, because those need the stored row back. A failed mirror write
//! keeps the local value: the failure lands in the banner, the log, and
//! the [`SyncFailure`] ledger instead of rolling anything back. Day
//! fetches carry a generation stamp so a slow response for a day the
//! user already left gets discarded instead of applied.

pub mod counts;
pub mod listview;
mod sections;
pub mod state;
mod tasks;
#[cfg(test)]
pub(crate) mod testkit;
pub mod update;
mod workflows;

use chrono::{NaiveDate, SecondsFormat, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

pub use self::counts::DayCountIndex;
pub use self::listview::{
    ListViewState, SectionKey, TaskGroup, completed_tasks, progress, visible_groups,
};
pub use self::state::{
    ActiveDialog, DEFAULT_SECTION_COLOR, NameField, NamePromptDialogState, PlanDayDialogState,
    ProfileNameRequest, RescheduleDialogState, SECTION_COLOR_PALETTE, SectionColorDialogState,
    SyncFailure, palette_index,
};
pub use self::update::Message;

use crate::calendar::{AdvanceDirection, CalendarView};
use crate::dates::month_count_span;
use crate::localdata::LocalData;
use crate::notification::notify_session_finished;
use crate::settings::Settings;
use crate::store::{
    NewSection, NewTask, SectionPatch, StoreCapabilities, StoreError, TaskPatch, TaskStore,
};
use crate::timer::{FocusTimer, TimerMode};
use crate::types::{DailyStats, Section, Task, UserProfile};

pub struct Dashboard<S> {
    pub(crate) store: S,
    pub user: UserProfile,
    pub settings: Settings,
    pub(crate) local: LocalData,
    /// The calendar day the controller was started on. Injected so the
    /// carry-forward and stale-day rules are checkable on any date.
    pub today: NaiveDate,
    pub selected_date: NaiveDate,
    pub tasks: Vec<Task>,
    pub sections: Vec<Section>,
    pub stats: DailyStats,
    pub counts: DayCountIndex,
    pub calendar: CalendarView,
    pub timer: FocusTimer,
    pub list: ListViewState,
    pub active_dialog: ActiveDialog,
    pub banner: Option<String>,
    pub capabilities: StoreCapabilities,
    pending_profile_update: Option<ProfileNameRequest>,
    sync_failures: Vec<SyncFailure>,
    fetch_generation: u64,
    migration_done: bool,
}

impl<S: TaskStore> Dashboard<S> {
    /// Probe the store and build an empty controller pinned to `today`.
    /// Nothing is fetched yet; [`Dashboard::initialize`] does the first
    /// load.
    pub async fn new(
        store: S,
        user: UserProfile,
        settings: Settings,
        local: LocalData,
        today: NaiveDate,
    ) -> Result<Self, StoreError> {
        let capabilities = store.probe_capabilities().await?;
        let timer = FocusTimer::new(settings.timer_durations());
        let stats = DailyStats::empty(user.id, today);

        Ok(Dashboard {
            store,
            user,
            settings,
            local,
            today,
            selected_date: today,
            tasks: Vec::new(),
            sections: Vec::new(),
            stats,
            counts: DayCountIndex::new(),
            calendar: CalendarView::new(today),
            timer,
            list: ListViewState::new(),
            active_dialog: ActiveDialog::None,
            banner: None,
            capabilities,
            pending_profile_update: None,
            sync_failures: Vec::new(),
            fetch_generation: 0,
            migration_done: false,
        })
    }

    /// First load: run the one-time legacy import, pull the selected
    /// day, sections, and month tallies, then raise whichever prompt
    /// applies. The name prompt outranks the carry-forward prompt; the
    /// plan check runs again on the reload that follows a name save.
    pub async fn initialize(&mut self) -> Result<(), StoreError> {
        self.migrate_legacy_data().await;
        self.reload_day().await?;
        self.reload_sections().await;
        self.reload_counts().await;

        if !self.user.has_full_name() {
            self.active_dialog = ActiveDialog::NamePrompt(NamePromptDialogState::new());
        }
        self.maybe_plan_day().await;

        Ok(())
    }

    /// Switch the selected day. Leaving a past day that still shows
    /// unfinished tasks raises the reschedule prompt before the new
    /// day's data replaces the list.
    pub async fn select_date(&mut self, date: NaiveDate) -> Result<(), StoreError> {
        if date == self.selected_date {
            return Ok(());
        }

        let leaving = self.selected_date;
        if leaving < self.today {
            let unfinished: Vec<Task> = self
                .tasks
                .iter()
                .filter(|task| !task.completed)
                .cloned()
                .collect();
            if !unfinished.is_empty() {
                self.active_dialog =
                    ActiveDialog::Reschedule(RescheduleDialogState::new(leaving, unfinished));
            }
        }

        self.selected_date = date;
        self.reload_day().await
    }

    /// Fetch tasks and stats for the selected day. A failed task fetch
    /// keeps the current list and raises the banner; a failed stats
    /// fetch only logs, and the day shows zeros.
    pub async fn reload_day(&mut self) -> Result<(), StoreError> {
        let generation = self.next_generation();
        let date = self.selected_date;

        let tasks = match self.store.fetch_tasks_for_date(self.user.id, date).await {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(date = %date, error = %err, "day fetch failed");
                self.banner = Some(format!("Failed to load tasks: {}", err.message));
                return Err(err);
            }
        };

        let stats = match self.store.fetch_stats(self.user.id, date).await {
            Ok(stats) => stats,
            Err(err) => {
                warn!(date = %date, error = %err, "stats fetch failed");
                None
            }
        };

        self.apply_day_snapshot(generation, tasks, stats);
        Ok(())
    }

    pub(crate) fn next_generation(&mut self) -> u64 {
        self.fetch_generation += 1;
        self.fetch_generation
    }

    /// Install a fetched day. Snapshots stamped with an older generation
    /// lost the race to a newer fetch and are dropped.
    pub(crate) fn apply_day_snapshot(
        &mut self,
        generation: u64,
        tasks: Vec<Task>,
        stats: Option<DailyStats>,
    ) {
        if generation != self.fetch_generation {
            debug!(
                generation,
                current = self.fetch_generation,
                "dropping stale day snapshot"
            );
            return;
        }

        self.tasks = tasks::sort_for_display(tasks, self.capabilities.task_ordering);
        self.stats = stats.unwrap_or_else(|| DailyStats::empty(self.user.id, self.selected_date));
    }

    pub async fn reload_sections(&mut self) {
        match self.store.fetch_sections(self.user.id).await {
            Ok(sections) => self.sections = sections,
            Err(err) => warn!(error = %err, "section fetch failed"),
        }
    }

    /// Rebuild the calendar tallies for the viewed month and the month
    /// after it, covering the grid's trailing cells.
    pub async fn reload_counts(&mut self) {
        let (year, month) = self.calendar.viewed();
        let (from, to) = month_count_span(year, month);
        match self.store.fetch_task_days(self.user.id, from, to).await {
            Ok(rows) => self.counts.rebuild(&rows),
            Err(err) => warn!(error = %err, "day tally fetch failed"),
        }
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn uncategorized_name(&self) -> String {
        self.local.state.uncategorized_name().to_string()
    }

    pub fn rename_uncategorized(&mut self, name: &str) {
        self.local.state.set_uncategorized_name(name);
        if let Err(err) = self.local.save() {
            warn!(error = %err, "could not persist the uncategorized name");
        }
    }

    /// Greeting name for the header, first word only.
    pub fn display_name(&self) -> String {
        self.user.first_name()
    }

    /// Composed name change waiting for the embedder: profile writes go
    /// through the auth provider, and a saved name forces a full reload,
    /// so the controller only hands the request out.
    pub fn take_profile_update(&mut self) -> Option<ProfileNameRequest> {
        self.pending_profile_update.take()
    }

    pub fn sync_failures(&self) -> &[SyncFailure] {
        &self.sync_failures
    }

    pub fn take_sync_failures(&mut self) -> Vec<SyncFailure> {
        std::mem::take(&mut self.sync_failures)
    }

    /// One second of timer time. A finished session fires the cue; a
    /// finished focus session also books its stats credit.
    pub async fn timer_tick(&mut self) {
        if let Some(mode) = self.timer.tick() {
            notify_session_finished(mode, self.settings.notification_backend());
            if mode == TimerMode::Focus {
                self.complete_focus_session().await;
            }
        }
    }

    pub(crate) fn record_write_failure(
        &mut self,
        operation: &'static str,
        label: &str,
        err: StoreError,
    ) {
        warn!(operation, error = %err, "store write failed; keeping local state");
        self.banner = Some(format!("Failed to {label}: {}", err.message));
        self.sync_failures.push(SyncFailure::new(operation, err));
    }

    pub(crate) fn submit_name_prompt(&mut self) {
        let ActiveDialog::NamePrompt(dialog) = &self.active_dialog else {
            return;
        };
        if !dialog.can_save() {
            return;
        }
        self.pending_profile_update = Some(ProfileNameRequest {
            full_name: dialog.full_name(),
            display_name: dialog.display_name(),
        });
        self.active_dialog = ActiveDialog::None;
    }

    /// Inline header rename: one full-name string, display name taken
    /// from its first word. Blank input closes the editor unchanged.
    pub(crate) fn request_full_name_save(&mut self, name: &str) {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return;
        }
        let display = trimmed
            .split_whitespace()
            .next()
            .unwrap_or(trimmed)
            .to_string();
        self.pending_profile_update = Some(ProfileNameRequest {
            full_name: trimmed.to_string(),
            display_name: display,
        });
    }
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
