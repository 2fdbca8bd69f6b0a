#![allow(dead_code)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub completed: bool,
    pub pomodoros_spent: i64,
    pub scheduled_date: NaiveDate,
    pub completed_at: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
    pub description: Option<String>,
    pub section_id: Option<Uuid>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Section {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub sort_order: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct DailyStats {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub total_focus_minutes: i64,
    pub sessions_completed: i64,
}

impl DailyStats {
    pub fn empty(user_id: Uuid, date: NaiveDate) -> Self {
        DailyStats {
            user_id,
            date,
            total_focus_minutes: 0,
            sessions_completed: 0,
        }
    }
}

/// Per-date task tally backing the calendar indicator dots.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct DayCounts {
    pub total: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub display_name: Option<String>,
}

impl UserProfile {
    /// First word of the best available name, falling back to the
    /// mailbox half of the email and finally a fixed greeting target.
    pub fn first_name(&self) -> String {
        let base = self
            .full_name
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .or(self
                .display_name
                .as_deref()
                .filter(|value| !value.trim().is_empty()))
            .map(str::to_string)
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|email| email.split('@').next())
                    .filter(|prefix| !prefix.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Pomodoro".to_string());

        base.split_whitespace()
            .next()
            .unwrap_or("Pomodoro")
            .to_string()
    }

    pub fn has_full_name(&self) -> bool {
        self.full_name
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}
