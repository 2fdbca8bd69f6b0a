use tracing::warn;
use uuid::Uuid;

use crate::app::Dashboard;
use crate::app::state::{ActiveDialog, PlanDayDialogState};
use crate::dates::yesterday_of;
use crate::store::TaskStore;

impl<S: TaskStore> Dashboard<S> {
    /// Offer to carry yesterday's unfinished tasks onto today. A marker
    /// in local data keeps the prompt from asking twice on the same
    /// day, whichever way it was answered.
    pub(crate) async fn maybe_plan_day(&mut self) {
        if !self.active_dialog.is_none() {
            return;
        }
        if self.selected_date != self.today || self.local.state.planned_today(self.today) {
            return;
        }

        let yesterday = yesterday_of(self.today);
        match self
            .store
            .fetch_incomplete_tasks(self.user.id, yesterday)
            .await
        {
            Ok(tasks) if tasks.is_empty() => {}
            Ok(tasks) => {
                self.active_dialog =
                    ActiveDialog::PlanDay(PlanDayDialogState::new(yesterday, tasks));
            }
            Err(err) => warn!(error = %err, "carry-forward check failed"),
        }
    }

    pub fn toggle_plan_selection(&mut self, id: Uuid) {
        if let ActiveDialog::PlanDay(dialog) = &mut self.active_dialog {
            dialog.toggle(id);
        }
    }

    /// Carry the chosen tasks onto today, then show the refreshed list.
    pub async fn confirm_plan_day(&mut self) {
        let ActiveDialog::PlanDay(dialog) = &self.active_dialog else {
            return;
        };
        let from = dialog.date;
        let ids = dialog.selected_ids();
        self.active_dialog = ActiveDialog::None;
        if ids.is_empty() {
            return;
        }

        if let Err(err) = self
            .store
            .update_tasks_date(self.user.id, &ids, self.today)
            .await
        {
            self.record_write_failure("update_tasks_date", "carry tasks forward", err);
        }
        self.counts.record_moved(from, self.today, ids.len() as i64);
        self.mark_planned();

        if self.selected_date == self.today {
            let _ = self.reload_day().await;
        }
    }

    /// Start fresh: leave yesterday alone but remember that the prompt
    /// ran.
    pub fn dismiss_plan_day(&mut self) {
        if let ActiveDialog::PlanDay(_) = &self.active_dialog {
            self.active_dialog = ActiveDialog::None;
            self.mark_planned();
        }
    }

    fn mark_planned(&mut self) {
        self.local.state.mark_planned(self.today);
        if let Err(err) = self.local.save() {
            warn!(error = %err, "could not persist the plan marker");
        }
    }
}
