use crate::app::Dashboard;
use crate::app::state::ActiveDialog;
use crate::store::TaskStore;

impl<S: TaskStore> Dashboard<S> {
    /// Move the listed tasks onto today. Unlike the morning prompt this
    /// sets no marker; wandering off another stale day will ask again.
    pub async fn confirm_reschedule(&mut self) {
        let ActiveDialog::Reschedule(dialog) = &self.active_dialog else {
            return;
        };
        let from = dialog.date;
        let ids = dialog.task_ids();
        self.active_dialog = ActiveDialog::None;
        if ids.is_empty() {
            return;
        }

        if let Err(err) = self
            .store
            .update_tasks_date(self.user.id, &ids, self.today)
            .await
        {
            self.record_write_failure("update_tasks_date", "move tasks to today", err);
        }
        self.counts.record_moved(from, self.today, ids.len() as i64);

        if self.selected_date == self.today {
            let _ = self.reload_day().await;
        }
    }

    pub fn dismiss_reschedule(&mut self) {
        if let ActiveDialog::Reschedule(_) = &self.active_dialog {
            self.active_dialog = ActiveDialog::None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testkit::{june, loaded_dashboard, named_user, task_row};
    use crate::store::memory::MemoryStore;

    async fn dashboard_on_stale_day() -> (Dashboard<MemoryStore>, tempfile::TempDir) {
        let user = named_user();
        let store = MemoryStore::new();
        store.seed_task(task_row(user.id, june(13), "unfinished", false, 0));
        store.seed_task(task_row(user.id, june(13), "wrapped up", true, 1));

        let (mut dashboard, dir) = loaded_dashboard(store, user, june(15)).await;
        dashboard.select_date(june(13)).await.expect("load the day");
        (dashboard, dir)
    }

    #[tokio::test]
    async fn leaving_a_stale_day_raises_the_prompt() {
        let (mut dashboard, _dir) = dashboard_on_stale_day().await;
        dashboard.select_date(june(15)).await.expect("back to today");

        let ActiveDialog::Reschedule(dialog) = &dashboard.active_dialog else {
            panic!("expected the reschedule prompt");
        };
        assert_eq!(dialog.date, june(13));
        assert_eq!(dialog.task_count(), 1);
        assert_eq!(dialog.tasks[0].text, "unfinished");
    }

    #[tokio::test]
    async fn leaving_a_clean_past_day_stays_quiet() {
        let user = named_user();
        let store = MemoryStore::new();
        store.seed_task(task_row(user.id, june(13), "wrapped up", true, 0));

        let (mut dashboard, _dir) = loaded_dashboard(store, user, june(15)).await;
        dashboard.select_date(june(13)).await.expect("load the day");
        dashboard.select_date(june(15)).await.expect("back to today");

        assert_eq!(dashboard.active_dialog, ActiveDialog::None);
    }

    #[tokio::test]
    async fn confirm_moves_the_tasks_and_refreshes_today() {
        let (mut dashboard, _dir) = dashboard_on_stale_day().await;
        dashboard.select_date(june(15)).await.expect("back to today");
        dashboard.confirm_reschedule().await;

        assert_eq!(dashboard.active_dialog, ActiveDialog::None);
        assert_eq!(dashboard.tasks.len(), 1);
        assert_eq!(dashboard.tasks[0].text, "unfinished");

        let stored = dashboard.store().tasks_snapshot();
        let moved = stored.iter().find(|t| t.text == "unfinished").unwrap();
        assert_eq!(moved.scheduled_date, june(15));
        let kept = stored.iter().find(|t| t.text == "wrapped up").unwrap();
        assert_eq!(kept.scheduled_date, june(13));

        assert_eq!(dashboard.counts.counts_for(june(13)).total, 1);
        assert_eq!(dashboard.counts.counts_for(june(13)).completed, 1);
        assert_eq!(dashboard.counts.counts_for(june(15)).total, 1);
        // No marker: this is not the morning prompt.
        assert!(!dashboard.local.state.planned_today(june(15)));
    }

    #[tokio::test]
    async fn dismiss_leaves_the_stale_day_alone() {
        let (mut dashboard, _dir) = dashboard_on_stale_day().await;
        dashboard.select_date(june(15)).await.expect("back to today");
        dashboard.dismiss_reschedule();

        assert_eq!(dashboard.active_dialog, ActiveDialog::None);
        let stored = dashboard.store().tasks_snapshot();
        assert!(stored.iter().all(|t| t.scheduled_date == june(13)));
        assert_eq!(dashboard.counts.counts_for(june(13)).total, 2);
    }
}
