//! Whole-session runs against the in-memory store backend: first launch
//! with a pre-account data file, the morning carry-forward, focus
//! sessions booking their credit, the missing-column ordering fallback,
//! and the section lifecycle. Each test drives a [`Dashboard`] through
//! the same [`Message`] dispatch the front-end uses and checks both the
//! controller's state and what actually landed in the store.

use std::fs;

use anyhow::Result;
use chrono::NaiveDate;
use tempfile::TempDir;
use uuid::Uuid;

use pomodash::app::{ActiveDialog, Dashboard, Message, SECTION_COLOR_PALETTE, visible_groups};
use pomodash::localdata::{DEFAULT_UNCATEGORIZED_NAME, LocalData};
use pomodash::settings::Settings;
use pomodash::store::memory::MemoryStore;
use pomodash::store::{StoreError, UNDEFINED_COLUMN_CODE};
use pomodash::timer::TimerMode;
use pomodash::types::{DayCounts, Task, UserProfile};

#[tokio::test]
async fn integration_test_first_launch_imports_the_legacy_file_and_prompts() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("local.json"),
        r#"{
            "tasks": [
                {"id": 1, "text": "Old task", "completed": true, "pomodorosSpent": 3},
                {"id": 2, "text": "Newer task", "pomodoros_spent": 1}
            ],
            "stats": {"totalFocusMinutes": 75, "sessionsToday": 3, "date": "2024-06-15"}
        }"#,
    )?;

    let store = MemoryStore::new();
    let mut dashboard = launch(&dir, store, unnamed_user(), Settings::default(), june(15)).await?;

    // The flat pre-account list lands on the launch day, stats included.
    assert_eq!(dashboard.tasks.len(), 2);
    assert!(
        dashboard
            .tasks
            .iter()
            .all(|task| task.scheduled_date == june(15))
    );
    let imported = find_task(&dashboard.tasks, "Old task");
    assert!(imported.completed);
    assert!(imported.completed_at.is_some());
    assert_eq!(imported.pomodoros_spent, 3);
    assert_eq!(find_task(&dashboard.tasks, "Newer task").pomodoros_spent, 1);
    assert_eq!(dashboard.stats.total_focus_minutes, 75);
    assert_eq!(dashboard.stats.sessions_completed, 3);
    assert_eq!(dashboard.store().tasks_snapshot().len(), 2);
    assert_eq!(
        dashboard.counts.counts_for(june(15)),
        DayCounts {
            total: 2,
            completed: 1
        }
    );

    // The import runs once; the data file is gone whatever came of it.
    assert!(!dir.path().join("local.json").exists());

    // An account without a stored name gets the name prompt first.
    assert!(matches!(
        dashboard.active_dialog,
        ActiveDialog::NamePrompt(_)
    ));
    if let ActiveDialog::NamePrompt(dialog) = &mut dashboard.active_dialog {
        dialog.first_input = "Maya".to_string();
        dialog.last_input = "Chen".to_string();
    }
    dashboard.update(Message::SubmitName).await?;

    assert!(dashboard.active_dialog.is_none());
    let staged = dashboard
        .take_profile_update()
        .expect("saving the name should stage a profile update");
    assert_eq!(staged.full_name, "Maya Chen");
    assert_eq!(staged.display_name, "Maya");
    assert!(dashboard.take_profile_update().is_none());

    // The imported rows behave like any other task from here on.
    let open_id = find_task(&dashboard.tasks, "Newer task").id;
    dashboard.update(Message::ToggleTask(open_id)).await?;
    assert_eq!(
        dashboard.counts.counts_for(june(15)),
        DayCounts {
            total: 2,
            completed: 2
        }
    );
    let rows = dashboard.store().tasks_snapshot();
    assert!(find_task(&rows, "Newer task").completed);

    Ok(())
}

#[tokio::test]
async fn integration_test_morning_carry_forward_reshapes_the_day() -> Result<()> {
    let dir = TempDir::new()?;
    let user = named_user();
    let store = MemoryStore::new();
    store.seed_task(task_row(user.id, june(14), "Write the brief", false, 0));
    store.seed_task(task_row(user.id, june(14), "Call the bank", false, 1));
    store.seed_task(task_row(user.id, june(14), "Morning review", true, 2));
    store.seed_task(task_row(user.id, june(12), "Renew passport", false, 0));

    let mut dashboard = launch(&dir, store, user, Settings::default(), june(15)).await?;

    // Yesterday's unfinished tasks are offered, everything pre-selected.
    // The day before yesterday is not part of the offer.
    let skipped = {
        let ActiveDialog::PlanDay(dialog) = &dashboard.active_dialog else {
            panic!("expected the carry-forward prompt after first load");
        };
        assert_eq!(dialog.date, june(14));
        assert_eq!(dialog.tasks.len(), 2);
        assert_eq!(dialog.selected_ids().len(), 2);
        find_task(&dialog.tasks, "Write the brief").id
    };

    dashboard
        .update(Message::TogglePlanSelection(skipped))
        .await?;
    dashboard.update(Message::ConfirmPlanDay).await?;

    assert!(dashboard.active_dialog.is_none());
    assert_eq!(dashboard.tasks.len(), 1);
    assert_eq!(dashboard.tasks[0].text, "Call the bank");
    assert_eq!(
        dashboard.counts.counts_for(june(14)),
        DayCounts {
            total: 2,
            completed: 1
        }
    );
    assert_eq!(
        dashboard.counts.counts_for(june(15)),
        DayCounts {
            total: 1,
            completed: 0
        }
    );
    assert_eq!(
        dashboard.counts.counts_for(june(12)),
        DayCounts {
            total: 1,
            completed: 0
        }
    );
    let rows = dashboard.store().tasks_snapshot();
    assert_eq!(find_task(&rows, "Call the bank").scheduled_date, june(15));
    assert_eq!(find_task(&rows, "Write the brief").scheduled_date, june(14));
    assert_eq!(find_task(&rows, "Renew passport").scheduled_date, june(12));

    // The marker survives the process: a relaunch would not prompt again.
    assert!(LocalData::open_in(dir.path()).state.planned_today(june(15)));

    // Visiting the stale day and leaving raises the reschedule prompt.
    dashboard.update(Message::SelectDate(june(14))).await?;
    assert_eq!(dashboard.tasks.len(), 2);

    dashboard.update(Message::SelectDate(june(15))).await?;
    {
        let ActiveDialog::Reschedule(dialog) = &dashboard.active_dialog else {
            panic!("leaving a stale day with open tasks should raise the reschedule prompt");
        };
        assert_eq!(dialog.date, june(14));
        assert_eq!(dialog.task_count(), 1);
        assert_eq!(dialog.tasks[0].text, "Write the brief");
    }

    dashboard.update(Message::ConfirmReschedule).await?;
    assert!(dashboard.active_dialog.is_none());
    assert_eq!(dashboard.tasks.len(), 2);
    assert!(
        dashboard
            .tasks
            .iter()
            .any(|task| task.text == "Write the brief")
    );
    assert_eq!(
        dashboard.counts.counts_for(june(14)),
        DayCounts {
            total: 1,
            completed: 1
        }
    );
    assert_eq!(
        dashboard.counts.counts_for(june(15)),
        DayCounts {
            total: 2,
            completed: 0
        }
    );

    Ok(())
}

#[tokio::test]
async fn integration_test_focus_sessions_credit_stats_and_the_first_open_task() -> Result<()> {
    let dir = TempDir::new()?;
    let user = named_user();
    let store = MemoryStore::new();
    store.seed_task(task_row(user.id, june(15), "Draft the report", false, 0));
    store.seed_task(task_row(user.id, june(15), "Stand-up notes", true, 1));

    let settings = Settings {
        focus_minutes: 1,
        short_break_minutes: 1,
        notification: "none".to_string(),
        ..Settings::default()
    };
    let mut dashboard = launch(&dir, store, user, settings, june(15)).await?;

    dashboard.update(Message::ToggleTimer).await?;
    assert!(dashboard.timer.is_running());
    run_out_the_clock(&mut dashboard, 60).await?;

    assert!(!dashboard.timer.is_running());
    assert_eq!(dashboard.timer.remaining_secs(), 0);
    assert_eq!(dashboard.stats.total_focus_minutes, 1);
    assert_eq!(dashboard.stats.sessions_completed, 1);
    assert_eq!(
        find_task(&dashboard.tasks, "Draft the report").pomodoros_spent,
        1
    );
    assert_eq!(
        find_task(&dashboard.tasks, "Stand-up notes").pomodoros_spent,
        0
    );
    let stats_rows = dashboard.store().stats_snapshot();
    assert_eq!(stats_rows.len(), 1);
    assert_eq!(stats_rows[0].date, june(15));
    assert_eq!(stats_rows[0].total_focus_minutes, 1);
    assert_eq!(stats_rows[0].sessions_completed, 1);

    // A second session books on top of the first; the stats row is
    // upserted, not duplicated.
    dashboard.update(Message::ToggleTimer).await?;
    run_out_the_clock(&mut dashboard, 60).await?;
    assert_eq!(dashboard.stats.total_focus_minutes, 2);
    assert_eq!(dashboard.stats.sessions_completed, 2);
    assert_eq!(
        find_task(&dashboard.tasks, "Draft the report").pomodoros_spent,
        2
    );
    let rows = dashboard.store().tasks_snapshot();
    assert_eq!(find_task(&rows, "Draft the report").pomodoros_spent, 2);
    assert_eq!(dashboard.store().stats_snapshot().len(), 1);

    // Breaks run the same clock but book nothing.
    dashboard
        .update(Message::SwitchTimerMode(TimerMode::ShortBreak))
        .await?;
    dashboard.update(Message::ToggleTimer).await?;
    run_out_the_clock(&mut dashboard, 60).await?;
    assert!(!dashboard.timer.is_running());
    assert_eq!(dashboard.stats.total_focus_minutes, 2);
    assert_eq!(dashboard.stats.sessions_completed, 2);
    assert_eq!(
        find_task(&dashboard.tasks, "Draft the report").pomodoros_spent,
        2
    );

    Ok(())
}

#[tokio::test]
async fn integration_test_missing_position_column_turns_ordering_off_mid_session() -> Result<()> {
    let dir = TempDir::new()?;
    let user = named_user();
    let mut dashboard = launch(
        &dir,
        MemoryStore::new(),
        user,
        Settings::default(),
        june(15),
    )
    .await?;
    assert!(dashboard.capabilities.task_ordering);

    // The hosted project dropped the position column after the probe.
    dashboard.store().fail_next_write(StoreError::new(
        UNDEFINED_COLUMN_CODE,
        "column tasks.sort_order does not exist",
    ));
    dashboard
        .update(Message::AddTask {
            text: "first".to_string(),
            section_id: None,
        })
        .await?;

    // The insert retried bare and succeeded; no banner, ordering off.
    assert!(!dashboard.capabilities.task_ordering);
    assert!(dashboard.banner.is_none());
    assert_eq!(dashboard.tasks.len(), 1);
    assert_eq!(dashboard.tasks[0].sort_order, None);

    dashboard
        .update(Message::AddTask {
            text: "second".to_string(),
            section_id: None,
        })
        .await?;
    assert_eq!(
        dashboard.store().insert_order_flags(),
        vec![true, false, false]
    );

    // Manual reordering goes inert rather than erroring.
    dashboard
        .update(Message::ReorderTasks { from: 0, to: 1 })
        .await?;
    let texts: Vec<&str> = dashboard
        .tasks
        .iter()
        .map(|task| task.text.as_str())
        .collect();
    assert_eq!(texts, ["first", "second"]);

    // An ordinary write failure keeps the local change and is surfaced
    // through the banner and the failure ledger instead of rolling back.
    let toggled = dashboard.tasks[0].id;
    dashboard
        .store()
        .fail_next_write(StoreError::new("500", "connection reset"));
    dashboard.update(Message::ToggleTask(toggled)).await?;

    assert!(find_task(&dashboard.tasks, "first").completed);
    let rows = dashboard.store().tasks_snapshot();
    assert!(!find_task(&rows, "first").completed);
    let banner = dashboard
        .banner
        .clone()
        .expect("a failed mirror write should surface a banner");
    assert!(banner.contains("Failed to update the task"));
    let failures = dashboard.take_sync_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].operation, "update_task");
    assert_eq!(failures[0].error.code, "500");
    assert!(dashboard.take_sync_failures().is_empty());

    Ok(())
}

#[tokio::test]
async fn integration_test_sections_group_rename_and_dissolve() -> Result<()> {
    let dir = TempDir::new()?;
    let user = named_user();
    let mut dashboard = launch(
        &dir,
        MemoryStore::new(),
        user,
        Settings::default(),
        june(15),
    )
    .await?;

    dashboard
        .update(Message::AddSection {
            name: "Deep work".to_string(),
        })
        .await?;
    dashboard
        .update(Message::AddSection {
            name: "Errands".to_string(),
        })
        .await?;
    assert_eq!(dashboard.sections.len(), 2);
    assert_eq!(dashboard.sections[0].color, SECTION_COLOR_PALETTE[0]);
    assert_eq!(dashboard.sections[1].color, SECTION_COLOR_PALETTE[1]);

    let deep_work = dashboard.sections[0].id;
    dashboard
        .update(Message::AddTask {
            text: "Refactor the parser".to_string(),
            section_id: Some(deep_work),
        })
        .await?;
    dashboard
        .update(Message::AddTask {
            text: "Buy stamps".to_string(),
            section_id: None,
        })
        .await?;

    // The uncategorized bucket leads; only sections holding a task today
    // show up at all.
    let groups = visible_groups(
        &dashboard.tasks,
        &dashboard.sections,
        DEFAULT_UNCATEGORIZED_NAME,
    );
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].name, DEFAULT_UNCATEGORIZED_NAME);
    assert_eq!(groups[0].tasks.len(), 1);
    assert_eq!(groups[0].tasks[0].text, "Buy stamps");
    assert_eq!(groups[1].name, "Deep work");
    assert_eq!(groups[1].tasks[0].text, "Refactor the parser");

    let moved = find_task(&dashboard.tasks, "Buy stamps").id;
    dashboard
        .update(Message::MoveTaskToSection {
            id: moved,
            section_id: Some(deep_work),
        })
        .await?;
    assert_eq!(
        find_task(&dashboard.tasks, "Buy stamps").section_id,
        Some(deep_work)
    );

    // Dissolving a section keeps its tasks on the day, uncategorized.
    dashboard.update(Message::DeleteSection(deep_work)).await?;
    assert_eq!(dashboard.sections.len(), 1);
    assert_eq!(dashboard.sections[0].name, "Errands");
    assert_eq!(dashboard.tasks.len(), 2);
    assert!(dashboard.tasks.iter().all(|task| task.section_id.is_none()));
    assert_eq!(
        dashboard.counts.counts_for(june(15)),
        DayCounts {
            total: 2,
            completed: 0
        }
    );
    assert!(
        dashboard
            .store()
            .sections_snapshot()
            .iter()
            .all(|section| section.id != deep_work)
    );

    // The bucket's name is machine-local and survives a relaunch.
    dashboard
        .update(Message::RenameUncategorized {
            name: "Inbox".to_string(),
        })
        .await?;
    assert_eq!(
        LocalData::open_in(dir.path()).state.uncategorized_name(),
        "Inbox"
    );

    Ok(())
}

async fn launch(
    dir: &TempDir,
    store: MemoryStore,
    user: UserProfile,
    settings: Settings,
    today: NaiveDate,
) -> Result<Dashboard<MemoryStore>> {
    let local = LocalData::open_in(dir.path());
    let mut dashboard = Dashboard::new(store, user, settings, local, today).await?;
    dashboard.initialize().await?;
    Ok(dashboard)
}

async fn run_out_the_clock(dashboard: &mut Dashboard<MemoryStore>, seconds: u32) -> Result<()> {
    for _ in 0..seconds {
        dashboard.update(Message::TimerTick).await?;
    }
    Ok(())
}

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).expect("day should exist in June 2024")
}

fn named_user() -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        email: Some("maya@example.com".to_string()),
        full_name: Some("Maya Chen".to_string()),
        display_name: Some("Maya".to_string()),
    }
}

fn unnamed_user() -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        email: Some("new.account@example.com".to_string()),
        full_name: None,
        display_name: None,
    }
}

fn task_row(user: Uuid, date: NaiveDate, text: &str, completed: bool, seq: u32) -> Task {
    Task {
        id: Uuid::new_v4(),
        user_id: user,
        text: text.to_string(),
        completed,
        pomodoros_spent: 0,
        scheduled_date: date,
        completed_at: completed.then(|| format!("{date}T12:00:00Z")),
        sort_order: None,
        description: None,
        section_id: None,
        created_at: format!("{date}T08:00:{seq:02}Z"),
    }
}

fn find_task<'a>(tasks: &'a [Task], text: &str) -> &'a Task {
    tasks
        .iter()
        .find(|task| task.text == text)
        .unwrap_or_else(|| panic!("no task named '{text}'"))
}
