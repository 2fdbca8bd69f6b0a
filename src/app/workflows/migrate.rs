use tracing::{info, warn};

use crate::app::{Dashboard, now_timestamp};
use crate::store::{NewTask, TaskStore};
use crate::types::DailyStats;

impl<S: TaskStore> Dashboard<S> {
    /// One-time import of the pre-account data file, run before the
    /// first fetch. The file is discarded on every exit path, so the
    /// import can never run twice or double-insert.
    pub(crate) async fn migrate_legacy_data(&mut self) {
        if self.migration_done {
            return;
        }
        self.migration_done = true;

        let Some(snapshot) = self.local.load_legacy_snapshot() else {
            // Unparseable files land here too; drop them.
            self.local.discard_legacy_snapshot();
            return;
        };
        if snapshot.is_empty() {
            self.local.discard_legacy_snapshot();
            return;
        }

        match self.store.has_any_tasks(self.user.id).await {
            Ok(false) => {}
            Ok(true) => {
                info!("account already has tasks; dropping the local backup");
                self.local.discard_legacy_snapshot();
                return;
            }
            Err(err) => {
                warn!(error = %err, "existing-task check failed; dropping the local backup");
                self.local.discard_legacy_snapshot();
                return;
            }
        }

        let rows: Vec<NewTask> = snapshot
            .tasks
            .iter()
            .map(|legacy| NewTask {
                user_id: self.user.id,
                text: legacy.text.clone(),
                completed: legacy.completed,
                pomodoros_spent: legacy.pomodoros_spent,
                scheduled_date: self.today,
                completed_at: legacy.completed.then(now_timestamp),
                section_id: None,
                sort_order: None,
            })
            .collect();
        if !rows.is_empty() {
            match self.store.insert_tasks(&rows).await {
                Ok(()) => info!(count = rows.len(), "imported tasks from the local backup"),
                Err(err) => warn!(error = %err, "task import failed"),
            }
        }

        // Stats only carry over while they still describe today.
        if let Some(stats) = &snapshot.stats
            && stats.date == self.today
        {
            let row = DailyStats {
                user_id: self.user.id,
                date: self.today,
                total_focus_minutes: stats.total_focus_minutes,
                sessions_completed: stats.sessions_today,
            };
            if let Err(err) = self.store.upsert_stats(&row).await {
                warn!(error = %err, "stats import failed");
            }
        }

        self.local.discard_legacy_snapshot();
    }
}
