//! Consecutive-day focus streak derived from the daily stats rows.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};

use crate::types::DailyStats;

/// Days in a row with at least one completed focus session, ending
/// today. A quiet today does not break the run: the streak then counts
/// back from yesterday, since today can still be extended.
pub fn current_streak(rows: &[DailyStats], today: NaiveDate) -> u32 {
    let active: HashSet<NaiveDate> = rows
        .iter()
        .filter(|row| row.sessions_completed > 0)
        .map(|row| row.date)
        .collect();

    let mut cursor = if active.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) if active.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    loop {
        streak += 1;
        match cursor.checked_sub_days(Days::new(1)) {
            Some(previous) if active.contains(&previous) => cursor = previous,
            _ => return streak,
        }
    }
}

pub fn milestone_label(streak: u32) -> Option<&'static str> {
    if streak >= 30 {
        Some("Unstoppable!")
    } else if streak >= 14 {
        Some("Legendary!")
    } else if streak >= 7 {
        Some("On fire!")
    } else if streak >= 3 {
        Some("Nice!")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn row(day: NaiveDate, sessions: i64) -> DailyStats {
        DailyStats {
            user_id: Uuid::nil(),
            date: day,
            total_focus_minutes: sessions * 25,
            sessions_completed: sessions,
        }
    }

    #[test]
    fn no_activity_means_no_streak() {
        assert_eq!(current_streak(&[], date(2024, 6, 15)), 0);
    }

    #[test]
    fn counts_consecutive_days_through_today() {
        let today = date(2024, 6, 15);
        let rows = vec![
            row(date(2024, 6, 13), 2),
            row(date(2024, 6, 14), 1),
            row(today, 3),
        ];
        assert_eq!(current_streak(&rows, today), 3);
    }

    #[test]
    fn quiet_today_still_counts_back_from_yesterday() {
        let today = date(2024, 6, 15);
        let rows = vec![row(date(2024, 6, 13), 1), row(date(2024, 6, 14), 1)];
        assert_eq!(current_streak(&rows, today), 2);
    }

    #[test]
    fn gap_before_yesterday_ends_the_run() {
        let today = date(2024, 6, 15);
        let rows = vec![
            row(date(2024, 6, 10), 4),
            row(date(2024, 6, 11), 1),
            // 12th missed
            row(date(2024, 6, 13), 1),
            row(date(2024, 6, 14), 2),
            row(today, 1),
        ];
        assert_eq!(current_streak(&rows, today), 3);
    }

    #[test]
    fn zero_session_rows_do_not_extend_the_run() {
        let today = date(2024, 6, 15);
        let rows = vec![row(date(2024, 6, 14), 0), row(today, 1)];
        assert_eq!(current_streak(&rows, today), 1);
    }

    #[test]
    fn streak_spans_month_boundary() {
        let today = date(2024, 7, 1);
        let rows = vec![row(date(2024, 6, 29), 1), row(date(2024, 6, 30), 1), row(today, 1)];
        assert_eq!(current_streak(&rows, today), 3);
    }

    #[test]
    fn milestone_thresholds() {
        assert_eq!(milestone_label(0), None);
        assert_eq!(milestone_label(2), None);
        assert_eq!(milestone_label(3), Some("Nice!"));
        assert_eq!(milestone_label(6), Some("Nice!"));
        assert_eq!(milestone_label(7), Some("On fire!"));
        assert_eq!(milestone_label(14), Some("Legendary!"));
        assert_eq!(milestone_label(29), Some("Legendary!"));
        assert_eq!(milestone_label(30), Some("Unstoppable!"));
    }
}
