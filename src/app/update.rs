use super::*;

/// Everything the dashboard can be asked to do. Embedders translate
/// input (keys, drags, CLI arguments) into these and feed them to
/// [`Dashboard::update`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Message {
    SelectDate(NaiveDate),
    PreviousMonth,
    NextMonth,
    JumpToToday,
    SelectYear(i32),
    SelectMonth(u32),
    SelectDay(u32),
    DragHoverAdvance(AdvanceDirection),
    DragAdvanceTick,
    DragLeftCalendar,
    AddTask {
        text: String,
        section_id: Option<Uuid>,
    },
    ToggleTask(Uuid),
    DeleteTask(Uuid),
    RenameTask {
        id: Uuid,
        text: String,
    },
    EditDescription {
        id: Uuid,
        description: String,
    },
    MoveTaskToSection {
        id: Uuid,
        section_id: Option<Uuid>,
    },
    ReorderTasks {
        from: usize,
        to: usize,
    },
    RescheduleTask {
        id: Uuid,
        date: NaiveDate,
    },
    AddSection {
        name: String,
    },
    RenameSection {
        id: Uuid,
        name: String,
    },
    OpenSectionColors(Uuid),
    PickSectionColor(usize),
    DeleteSection(Uuid),
    ReorderSections {
        from: usize,
        to: usize,
    },
    RenameUncategorized {
        name: String,
    },
    ToggleTimer,
    ResetTimer,
    SwitchTimerMode(TimerMode),
    TimerTick,
    TimerShortcutToggle,
    TimerShortcutReset,
    TogglePlanSelection(Uuid),
    ConfirmPlanDay,
    DismissPlanDay,
    ConfirmReschedule,
    DismissReschedule,
    SubmitName,
    SaveFullName {
        name: String,
    },
    ToggleSectionCollapse(SectionKey),
    ToggleCompletedList,
    ToggleTaskNotes(Uuid),
    DismissBanner,
}

impl<S: TaskStore> Dashboard<S> {
    /// Single dispatcher. An `Err` means a load failed outright;
    /// mutation failures are absorbed into the banner and the sync
    /// ledger instead.
    pub async fn update(&mut self, message: Message) -> Result<(), StoreError> {
        match message {
            Message::SelectDate(date) => self.select_date(date).await?,
            Message::PreviousMonth => {
                self.calendar.previous_month();
                self.reload_counts().await;
            }
            Message::NextMonth => {
                self.calendar.next_month();
                self.reload_counts().await;
            }
            Message::JumpToToday => {
                self.calendar.jump_to(self.today);
                self.reload_counts().await;
                self.select_date(self.today).await?;
            }
            Message::SelectYear(year) => {
                self.calendar.select_year(year);
                self.reload_counts().await;
            }
            Message::SelectMonth(month) => {
                self.calendar.select_month(month);
                self.reload_counts().await;
            }
            Message::SelectDay(day) => {
                if let Some(date) = self.calendar.date_for_day(day) {
                    self.select_date(date).await?;
                }
            }
            Message::DragHoverAdvance(direction) => self.calendar.arm_drag_advance(direction),
            Message::DragAdvanceTick => {
                if self.calendar.drag_advance_armed().is_some() {
                    self.calendar.drag_advance_tick();
                    self.reload_counts().await;
                }
            }
            Message::DragLeftCalendar => self.calendar.clear_drag_advance(),
            Message::AddTask { text, section_id } => {
                self.add_task(&text, section_id).await?;
                self.list.new_task_text.clear();
            }
            Message::ToggleTask(id) => self.toggle_task(id).await,
            Message::DeleteTask(id) => self.delete_task(id).await,
            Message::RenameTask { id, text } => self.rename_task(id, &text).await,
            Message::EditDescription { id, description } => {
                self.edit_description(id, &description).await
            }
            Message::MoveTaskToSection { id, section_id } => {
                self.move_task_to_section(id, section_id).await;
                self.list.clear_drag();
            }
            Message::ReorderTasks { from, to } => {
                self.reorder_tasks(from, to).await;
                self.list.clear_drag();
            }
            Message::RescheduleTask { id, date } => {
                self.reschedule_task(id, date).await;
                self.list.clear_drag();
                self.calendar.clear_drag_advance();
            }
            Message::AddSection { name } => {
                let _ = self.add_section(&name).await?;
            }
            Message::RenameSection { id, name } => self.rename_section(id, &name).await,
            Message::OpenSectionColors(id) => {
                if let Some(section) = self.sections.iter().find(|section| section.id == id) {
                    self.active_dialog =
                        ActiveDialog::SectionColor(SectionColorDialogState::for_section(section));
                }
            }
            Message::PickSectionColor(index) => {
                if let ActiveDialog::SectionColor(dialog) = &mut self.active_dialog {
                    dialog.select(index);
                    let id = dialog.section_id;
                    let color = dialog.selected_color().to_string();
                    self.active_dialog = ActiveDialog::None;
                    self.recolor_section(id, &color).await;
                }
            }
            Message::DeleteSection(id) => self.delete_section(id).await,
            Message::ReorderSections { from, to } => self.reorder_sections(from, to).await,
            Message::RenameUncategorized { name } => self.rename_uncategorized(&name),
            Message::ToggleTimer => self.timer.toggle(),
            Message::ResetTimer => self.timer.reset(),
            Message::SwitchTimerMode(mode) => self.timer.switch_mode(mode),
            Message::TimerTick => self.timer_tick().await,
            Message::TimerShortcutToggle => {
                if !self.list.input_active() {
                    self.timer.toggle();
                }
            }
            Message::TimerShortcutReset => {
                if !self.list.input_active() {
                    self.timer.reset();
                }
            }
            Message::TogglePlanSelection(id) => self.toggle_plan_selection(id),
            Message::ConfirmPlanDay => self.confirm_plan_day().await,
            Message::DismissPlanDay => self.dismiss_plan_day(),
            Message::ConfirmReschedule => self.confirm_reschedule().await,
            Message::DismissReschedule => self.dismiss_reschedule(),
            Message::SubmitName => self.submit_name_prompt(),
            Message::SaveFullName { name } => self.request_full_name_save(&name),
            Message::ToggleSectionCollapse(key) => self.list.toggle_collapsed(key),
            Message::ToggleCompletedList => self.list.toggle_completed_open(),
            Message::ToggleTaskNotes(id) => self.list.toggle_notes(id),
            Message::DismissBanner => self.dismiss_banner(),
        }
        Ok(())
    }
}
