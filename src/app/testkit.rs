//! Shared fixtures for controller tests: seeded rows, users, and a
//! ready-to-drive dashboard over the in-memory store.

use chrono::NaiveDate;
use tempfile::TempDir;
use uuid::Uuid;

use super::Dashboard;
use crate::localdata::LocalData;
use crate::settings::Settings;
use crate::store::memory::MemoryStore;
use crate::types::{DailyStats, Section, Task, UserProfile};

pub(crate) fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).expect("valid date")
}

pub(crate) fn named_user() -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        email: Some("maya@example.com".to_string()),
        full_name: Some("Maya Chen".to_string()),
        display_name: Some("Maya".to_string()),
    }
}

pub(crate) fn unnamed_user() -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        email: Some("new@example.com".to_string()),
        full_name: None,
        display_name: None,
    }
}

/// Task row as the store would return it. `seq` orders rows within a
/// day by creation time.
pub(crate) fn task_row(
    user: Uuid,
    date: NaiveDate,
    text: &str,
    completed: bool,
    seq: u32,
) -> Task {
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

pub(crate) fn section_row(user: Uuid, name: &str, sort_order: i64) -> Section {
    Section {
        id: Uuid::new_v4(),
        user_id: user,
        name: name.to_string(),
        color: "#7aa2f7".to_string(),
        sort_order,
        created_at: "2024-06-01T12:00:00Z".to_string(),
    }
}

pub(crate) fn stats_row(user: Uuid, date: NaiveDate, minutes: i64, sessions: i64) -> DailyStats {
    DailyStats {
        user_id: user,
        date,
        total_focus_minutes: minutes,
        sessions_completed: sessions,
    }
}

/// Drop a pre-account data file into the dir before the dashboard
/// opens it; the import pass picks it up on the first load.
pub(crate) fn write_legacy_file(dir: &TempDir, contents: &str) {
    std::fs::write(dir.path().join(crate::localdata::LEGACY_FILE), contents)
        .expect("write legacy file");
}

/// Dashboard over a seeded memory store, reading local data from the
/// given dir.
pub(crate) async fn dashboard_in(
    dir: &TempDir,
    store: MemoryStore,
    user: UserProfile,
    today: NaiveDate,
) -> Dashboard<MemoryStore> {
    let local = LocalData::open_in(dir.path());
    Dashboard::new(store, user, Settings::default(), local, today)
        .await
        .expect("capability probe")
}

/// Dashboard over a seeded memory store, with local data in a fresh
/// temp dir. The dir must stay alive as long as the dashboard.
pub(crate) async fn dashboard(
    store: MemoryStore,
    user: UserProfile,
    today: NaiveDate,
) -> (Dashboard<MemoryStore>, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let dashboard = dashboard_in(&dir, store, user, today).await;
    (dashboard, dir)
}

/// Like [`dashboard`], but the first load has already run.
pub(crate) async fn loaded_dashboard(
    store: MemoryStore,
    user: UserProfile,
    today: NaiveDate,
) -> (Dashboard<MemoryStore>, TempDir) {
    let (mut dashboard, dir) = self::dashboard(store, user, today).await;
    dashboard.initialize().await.expect("initial load");
    (dashboard, dir)
}
