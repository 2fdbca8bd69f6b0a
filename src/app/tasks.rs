use super::*;

/// Client-side display order: position column first when the schema has
/// one, with the store's created-at order as the stable tiebreaker.
pub(crate) fn sort_for_display(mut tasks: Vec<Task>, ordering: bool) -> Vec<Task> {
    if ordering {
        tasks.sort_by_key(|task| task.sort_order.unwrap_or(0));
    }
    tasks
}

impl<S: TaskStore> Dashboard<S> {
    /// Add a task to the selected day. This one waits for the server:
    /// the stored row carries the id everything later keys on. When the
    /// store rejects the position column, ordering is switched off for
    /// the rest of the session and the insert retried bare.
    pub async fn add_task(
        &mut self,
        text: &str,
        section_id: Option<Uuid>,
    ) -> Result<(), StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let mut new_task = NewTask::for_date(self.user.id, text, self.selected_date);
        new_task.section_id = section_id;
        if self.capabilities.task_ordering {
            let next_order = self
                .tasks
                .iter()
                .map(|task| task.sort_order.unwrap_or(0))
                .max()
                .map_or(0, |max| max + 1);
            new_task.sort_order = Some(next_order);
        }

        let row = match self
            .store
            .insert_task(&new_task, self.capabilities.task_ordering)
            .await
        {
            Ok(row) => row,
            Err(err) if self.capabilities.task_ordering && err.is_missing_column("sort_order") => {
                warn!("store has no sort_order column; disabling task ordering");
                self.capabilities.task_ordering = false;
                new_task.sort_order = None;
                match self.store.insert_task(&new_task, false).await {
                    Ok(row) => row,
                    Err(err) => {
                        self.banner = Some(format!("Failed to add task: {}", err.message));
                        return Err(err);
                    }
                }
            }
            Err(err) => {
                self.banner = Some(format!("Failed to add task: {}", err.message));
                return Err(err);
            }
        };

        self.tasks.push(row);
        self.counts.record_added(self.selected_date);
        Ok(())
    }

    pub async fn toggle_task(&mut self, id: Uuid) {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return;
        };
        let now_completed = !task.completed;
        let completed_at = now_completed.then(now_timestamp);
        task.completed = now_completed;
        task.completed_at = completed_at.clone();

        self.counts.record_toggled(self.selected_date, now_completed);

        let patch = TaskPatch {
            completed: Some(now_completed),
            completed_at: Some(completed_at),
            ..TaskPatch::default()
        };
        if let Err(err) = self.store.update_task(self.user.id, id, &patch).await {
            self.record_write_failure("update_task", "update the task", err);
        }
    }

    pub async fn delete_task(&mut self, id: Uuid) {
        let Some(pos) = self.tasks.iter().position(|task| task.id == id) else {
            return;
        };
        let removed = self.tasks.remove(pos);
        self.counts
            .record_removed(self.selected_date, removed.completed);

        if let Err(err) = self.store.delete_task(self.user.id, id).await {
            self.record_write_failure("delete_task", "delete the task", err);
        }
    }

    pub async fn rename_task(&mut self, id: Uuid, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return;
        };
        task.text = text.to_string();

        let patch = TaskPatch {
            text: Some(text.to_string()),
            ..TaskPatch::default()
        };
        if let Err(err) = self.store.update_task(self.user.id, id, &patch).await {
            self.record_write_failure("update_task", "rename the task", err);
        }
    }

    /// Store the notes payload verbatim; the rich-text widget owns its
    /// markup.
    pub async fn edit_description(&mut self, id: Uuid, description: &str) {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return;
        };
        task.description = Some(description.to_string());

        let patch = TaskPatch {
            description: Some(Some(description.to_string())),
            ..TaskPatch::default()
        };
        if let Err(err) = self.store.update_task(self.user.id, id, &patch).await {
            self.record_write_failure("update_task", "save the notes", err);
        }
    }

    pub async fn move_task_to_section(&mut self, id: Uuid, section_id: Option<Uuid>) {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return;
        };
        task.section_id = section_id;

        let patch = TaskPatch {
            section_id: Some(section_id),
            ..TaskPatch::default()
        };
        if let Err(err) = self.store.update_task(self.user.id, id, &patch).await {
            self.record_write_failure("update_task", "move the task", err);
        }
    }

    /// Drag reorder: splice, then renumber every position 0..N-1 and
    /// write them all. Inert while the store has no position column.
    pub async fn reorder_tasks(&mut self, from: usize, to: usize) {
        if !self.capabilities.task_ordering {
            return;
        }
        if from == to || from >= self.tasks.len() || to >= self.tasks.len() {
            return;
        }

        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        for (index, task) in self.tasks.iter_mut().enumerate() {
            task.sort_order = Some(index as i64);
        }

        let orders: Vec<(Uuid, i64)> = self
            .tasks
            .iter()
            .map(|task| (task.id, task.sort_order.unwrap_or(0)))
            .collect();
        if let Err(err) = self.store.update_task_order(self.user.id, &orders).await {
            self.record_write_failure("update_task_order", "save the new order", err);
        }
    }

    /// Drop a task on another calendar day. Dropping it on the day it
    /// already lives on is a no-op.
    pub async fn reschedule_task(&mut self, id: Uuid, new_date: NaiveDate) {
        let Some(pos) = self.tasks.iter().position(|task| task.id == id) else {
            return;
        };
        if self.tasks[pos].scheduled_date == new_date {
            return;
        }

        self.tasks.remove(pos);
        self.counts.record_moved(self.selected_date, new_date, 1);

        let patch = TaskPatch {
            scheduled_date: Some(new_date),
            ..TaskPatch::default()
        };
        if let Err(err) = self.store.update_task(self.user.id, id, &patch).await {
            self.record_write_failure("update_task", "reschedule the task", err);
        }
    }

    /// Book a finished focus session: bump the selected day's stats row
    /// and credit the first unfinished task in display order with the
    /// pomodoro.
    pub(crate) async fn complete_focus_session(&mut self) {
        self.stats.total_focus_minutes += self.settings.focus_minutes as i64;
        self.stats.sessions_completed += 1;

        let stats = self.stats.clone();
        if let Err(err) = self.store.upsert_stats(&stats).await {
            self.record_write_failure("upsert_stats", "save the session", err);
        }

        let credit = self
            .tasks
            .iter_mut()
            .find(|task| !task.completed)
            .map(|task| {
                task.pomodoros_spent += 1;
                (task.id, task.pomodoros_spent)
            });
        if let Some((id, spent)) = credit {
            let patch = TaskPatch {
                pomodoros_spent: Some(spent),
                ..TaskPatch::default()
            };
            if let Err(err) = self.store.update_task(self.user.id, id, &patch).await {
                self.record_write_failure("update_task", "record the pomodoro", err);
            }
        }
    }
}
