//! In-process store backend.
//!
//! Mirrors the hosted API's visible behavior closely enough to drive the
//! dashboard in tests: row filtering, patch application, upsert-on-key,
//! and the missing-column rejection for ordering writes when constructed
//! with `with_ordering_disabled`. Writes can be made to fail on demand so
//! callers' soft-failure paths are reachable.

use std::sync::Mutex;

use chrono::{NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

use super::{
    NewSection, NewTask, SectionPatch, StoreCapabilities, StoreError, TaskDayRow, TaskPatch,
    TaskStore, UNDEFINED_COLUMN_CODE,
};
use crate::types::{DailyStats, Section, Task};

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tasks: Vec<Task>,
    sections: Vec<Section>,
    stats: Vec<DailyStats>,
    task_ordering: bool,
    fail_next_write: Option<StoreError>,
    fail_next_fetch: Option<StoreError>,
    insert_order_flags: Vec<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Mutex::new(Inner {
                task_ordering: true,
                ..Inner::default()
            }),
        }
    }

    /// Backend whose tasks table lacks the `sort_order` column: ordering
    /// writes fail the way the hosted API reports an unknown column.
    pub fn with_ordering_disabled() -> Self {
        MemoryStore {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store state poisoned")
    }

    pub fn seed_task(&self, task: Task) {
        self.lock().tasks.push(task);
    }

    pub fn seed_section(&self, section: Section) {
        self.lock().sections.push(section);
    }

    pub fn seed_stats(&self, stats: DailyStats) {
        self.lock().stats.push(stats);
    }

    /// Queue an error for the next mutating call.
    pub fn fail_next_write(&self, error: StoreError) {
        self.lock().fail_next_write = Some(error);
    }

    /// Queue an error for the next read call.
    pub fn fail_next_fetch(&self, error: StoreError) {
        self.lock().fail_next_fetch = Some(error);
    }

    pub fn tasks_snapshot(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn sections_snapshot(&self) -> Vec<Section> {
        self.lock().sections.clone()
    }

    pub fn stats_snapshot(&self) -> Vec<DailyStats> {
        self.lock().stats.clone()
    }

    /// `with_sort_order` flag of every insert, in call order.
    pub fn insert_order_flags(&self) -> Vec<bool> {
        self.lock().insert_order_flags.clone()
    }
}

impl Inner {
    fn take_write_failure(&mut self) -> Result<(), StoreError> {
        match self.fail_next_write.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn take_fetch_failure(&mut self) -> Result<(), StoreError> {
        match self.fail_next_fetch.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn ordering_rejection(&self) -> StoreError {
        StoreError::new(
            UNDEFINED_COLUMN_CODE,
            "column tasks.sort_order does not exist",
        )
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn apply_task_patch(task: &mut Task, patch: &TaskPatch) {
    if let Some(text) = &patch.text {
        task.text = text.clone();
    }
    if let Some(completed) = patch.completed {
        task.completed = completed;
    }
    if let Some(completed_at) = &patch.completed_at {
        task.completed_at = completed_at.clone();
    }
    if let Some(spent) = patch.pomodoros_spent {
        task.pomodoros_spent = spent;
    }
    if let Some(date) = patch.scheduled_date {
        task.scheduled_date = date;
    }
    if let Some(description) = &patch.description {
        task.description = description.clone();
    }
    if let Some(section_id) = &patch.section_id {
        task.section_id = *section_id;
    }
    if let Some(order) = patch.sort_order {
        task.sort_order = Some(order);
    }
}

impl TaskStore for MemoryStore {
    async fn probe_capabilities(&self) -> Result<StoreCapabilities, StoreError> {
        let mut inner = self.lock();
        inner.take_fetch_failure()?;
        Ok(StoreCapabilities {
            task_ordering: inner.task_ordering,
        })
    }

    async fn fetch_tasks_for_date(
        &self,
        user: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Task>, StoreError> {
        let mut inner = self.lock();
        inner.take_fetch_failure()?;
        let mut rows: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|task| task.user_id == user && task.scheduled_date == date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn fetch_incomplete_tasks(
        &self,
        user: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Task>, StoreError> {
        let mut inner = self.lock();
        inner.take_fetch_failure()?;
        Ok(inner
            .tasks
            .iter()
            .filter(|task| {
                task.user_id == user && task.scheduled_date == date && !task.completed
            })
            .cloned()
            .collect())
    }

    async fn fetch_task_days(
        &self,
        user: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TaskDayRow>, StoreError> {
        let mut inner = self.lock();
        inner.take_fetch_failure()?;
        Ok(inner
            .tasks
            .iter()
            .filter(|task| {
                task.user_id == user && task.scheduled_date >= from && task.scheduled_date <= to
            })
            .map(|task| TaskDayRow {
                scheduled_date: task.scheduled_date,
                completed: task.completed,
            })
            .collect())
    }

    async fn fetch_stats(
        &self,
        user: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyStats>, StoreError> {
        let mut inner = self.lock();
        inner.take_fetch_failure()?;
        Ok(inner
            .stats
            .iter()
            .find(|row| row.user_id == user && row.date == date)
            .cloned())
    }

    async fn fetch_stats_range(
        &self,
        user: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyStats>, StoreError> {
        let mut inner = self.lock();
        inner.take_fetch_failure()?;
        let mut rows: Vec<DailyStats> = inner
            .stats
            .iter()
            .filter(|row| row.user_id == user && row.date >= from && row.date <= to)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.date);
        Ok(rows)
    }

    async fn fetch_sections(&self, user: Uuid) -> Result<Vec<Section>, StoreError> {
        let mut inner = self.lock();
        inner.take_fetch_failure()?;
        let mut rows: Vec<Section> = inner
            .sections
            .iter()
            .filter(|section| section.user_id == user)
            .cloned()
            .collect();
        rows.sort_by_key(|section| section.sort_order);
        Ok(rows)
    }

    async fn has_any_tasks(&self, user: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        inner.take_fetch_failure()?;
        Ok(inner.tasks.iter().any(|task| task.user_id == user))
    }

    async fn insert_task(
        &self,
        task: &NewTask,
        with_sort_order: bool,
    ) -> Result<Task, StoreError> {
        let mut inner = self.lock();
        inner.insert_order_flags.push(with_sort_order);
        inner.take_write_failure()?;
        if with_sort_order && task.sort_order.is_some() && !inner.task_ordering {
            return Err(inner.ordering_rejection());
        }

        let row = Task {
            id: Uuid::new_v4(),
            user_id: task.user_id,
            text: task.text.clone(),
            completed: task.completed,
            pomodoros_spent: task.pomodoros_spent,
            scheduled_date: task.scheduled_date,
            completed_at: task.completed_at.clone(),
            sort_order: if with_sort_order && inner.task_ordering {
                task.sort_order
            } else {
                None
            },
            description: None,
            section_id: task.section_id,
            created_at: now_timestamp(),
        };
        inner.tasks.push(row.clone());
        Ok(row)
    }

    async fn insert_tasks(&self, tasks: &[NewTask]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.take_write_failure()?;
        for task in tasks {
            inner.tasks.push(Task {
                id: Uuid::new_v4(),
                user_id: task.user_id,
                text: task.text.clone(),
                completed: task.completed,
                pomodoros_spent: task.pomodoros_spent,
                scheduled_date: task.scheduled_date,
                completed_at: task.completed_at.clone(),
                sort_order: None,
                description: None,
                section_id: task.section_id,
                created_at: now_timestamp(),
            });
        }
        Ok(())
    }

    async fn update_task(
        &self,
        user: Uuid,
        id: Uuid,
        patch: &TaskPatch,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.take_write_failure()?;
        if patch.sort_order.is_some() && !inner.task_ordering {
            return Err(inner.ordering_rejection());
        }
        if let Some(task) = inner
            .tasks
            .iter_mut()
            .find(|task| task.user_id == user && task.id == id)
        {
            apply_task_patch(task, patch);
        }
        Ok(())
    }

    async fn update_tasks_date(
        &self,
        user: Uuid,
        ids: &[Uuid],
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.take_write_failure()?;
        for task in inner
            .tasks
            .iter_mut()
            .filter(|task| task.user_id == user && ids.contains(&task.id))
        {
            task.scheduled_date = date;
        }
        Ok(())
    }

    async fn update_task_order(
        &self,
        user: Uuid,
        orders: &[(Uuid, i64)],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.take_write_failure()?;
        if !inner.task_ordering {
            return Err(inner.ordering_rejection());
        }
        for (id, sort_order) in orders {
            if let Some(task) = inner
                .tasks
                .iter_mut()
                .find(|task| task.user_id == user && task.id == *id)
            {
                task.sort_order = Some(*sort_order);
            }
        }
        Ok(())
    }

    async fn delete_task(&self, user: Uuid, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.take_write_failure()?;
        inner
            .tasks
            .retain(|task| !(task.user_id == user && task.id == id));
        Ok(())
    }

    async fn insert_section(&self, section: &NewSection) -> Result<Section, StoreError> {
        let mut inner = self.lock();
        inner.take_write_failure()?;
        let row = Section {
            id: Uuid::new_v4(),
            user_id: section.user_id,
            name: section.name.clone(),
            color: section.color.clone(),
            sort_order: section.sort_order,
            created_at: now_timestamp(),
        };
        inner.sections.push(row.clone());
        Ok(row)
    }

    async fn update_section(
        &self,
        user: Uuid,
        id: Uuid,
        patch: &SectionPatch,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.take_write_failure()?;
        if let Some(section) = inner
            .sections
            .iter_mut()
            .find(|section| section.user_id == user && section.id == id)
        {
            if let Some(name) = &patch.name {
                section.name = name.clone();
            }
            if let Some(color) = &patch.color {
                section.color = color.clone();
            }
            if let Some(order) = patch.sort_order {
                section.sort_order = order;
            }
        }
        Ok(())
    }

    async fn update_section_order(
        &self,
        user: Uuid,
        orders: &[(Uuid, i64)],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.take_write_failure()?;
        for (id, sort_order) in orders {
            if let Some(section) = inner
                .sections
                .iter_mut()
                .find(|section| section.user_id == user && section.id == *id)
            {
                section.sort_order = *sort_order;
            }
        }
        Ok(())
    }

    async fn delete_section(&self, user: Uuid, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.take_write_failure()?;
        inner
            .sections
            .retain(|section| !(section.user_id == user && section.id == id));
        Ok(())
    }

    async fn upsert_stats(&self, stats: &DailyStats) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.take_write_failure()?;
        if let Some(existing) = inner
            .stats
            .iter_mut()
            .find(|row| row.user_id == stats.user_id && row.date == stats.date)
        {
            *existing = stats.clone();
        } else {
            inner.stats.push(stats.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[tokio::test]
    async fn insert_then_fetch_roundtrip() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let day = date(2024, 6, 15);

        let mut new_task = NewTask::for_date(user, "Write report", day);
        new_task.sort_order = Some(0);
        let inserted = store.insert_task(&new_task, true).await.unwrap();
        assert_eq!(inserted.sort_order, Some(0));

        let rows = store.fetch_tasks_for_date(user, day).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, "Write report");

        // Other dates and other users see nothing.
        assert!(
            store
                .fetch_tasks_for_date(user, date(2024, 6, 16))
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            store
                .fetch_tasks_for_date(Uuid::new_v4(), day)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn ordering_disabled_rejects_sorted_insert() {
        let store = MemoryStore::with_ordering_disabled();
        let user = Uuid::new_v4();
        let caps = store.probe_capabilities().await.unwrap();
        assert!(!caps.task_ordering);

        let mut new_task = NewTask::for_date(user, "Plan sprint", date(2024, 6, 15));
        new_task.sort_order = Some(3);

        let err = store.insert_task(&new_task, true).await.unwrap_err();
        assert!(err.is_missing_column("sort_order"));

        // Retrying without the column succeeds.
        let row = store.insert_task(&new_task, false).await.unwrap();
        assert_eq!(row.sort_order, None);
        assert_eq!(store.insert_order_flags(), vec![true, false]);
    }

    #[tokio::test]
    async fn patch_clears_completion_timestamp() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let day = date(2024, 6, 15);
        let mut new_task = NewTask::for_date(user, "Stretch", day);
        new_task.completed = true;
        new_task.completed_at = Some("2024-06-15T10:00:00Z".to_string());
        let task = store.insert_task(&new_task, false).await.unwrap();

        let patch = TaskPatch {
            completed: Some(false),
            completed_at: Some(None),
            ..TaskPatch::default()
        };
        store.update_task(user, task.id, &patch).await.unwrap();

        let rows = store.fetch_tasks_for_date(user, day).await.unwrap();
        assert!(!rows[0].completed);
        assert_eq!(rows[0].completed_at, None);
    }

    #[tokio::test]
    async fn upsert_stats_overwrites_same_day() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let day = date(2024, 6, 15);

        store
            .upsert_stats(&DailyStats {
                user_id: user,
                date: day,
                total_focus_minutes: 25,
                sessions_completed: 1,
            })
            .await
            .unwrap();
        store
            .upsert_stats(&DailyStats {
                user_id: user,
                date: day,
                total_focus_minutes: 50,
                sessions_completed: 2,
            })
            .await
            .unwrap();

        let row = store.fetch_stats(user, day).await.unwrap().unwrap();
        assert_eq!(row.total_focus_minutes, 50);
        assert_eq!(row.sessions_completed, 2);
        assert_eq!(store.stats_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn queued_write_failure_fires_once() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.fail_next_write(StoreError::new("503", "service unavailable"));

        let new_task = NewTask::for_date(user, "Retry me", date(2024, 6, 15));
        let err = store.insert_task(&new_task, false).await.unwrap_err();
        assert_eq!(err.code, "503");

        store.insert_task(&new_task, false).await.unwrap();
        assert_eq!(store.tasks_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn task_days_cover_inclusive_range() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for (day, completed) in [
            (date(2024, 6, 1), true),
            (date(2024, 6, 15), false),
            (date(2024, 7, 31), true),
            (date(2024, 8, 1), false),
        ] {
            let mut new_task = NewTask::for_date(user, "x", day);
            new_task.completed = completed;
            store.insert_task(&new_task, false).await.unwrap();
        }

        let rows = store
            .fetch_task_days(user, date(2024, 6, 1), date(2024, 7, 31))
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.scheduled_date <= date(2024, 7, 31)));
    }
}
