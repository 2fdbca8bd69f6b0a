//! Calendar-day arithmetic shared by the controller and the calendar view.
//!
//! Days are `NaiveDate` everywhere; the hosted store and the local data
//! file both speak the `YYYY-MM-DD` key produced by [`day_key`].

use chrono::{Datelike, Duration, Local, NaiveDate};

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn yesterday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(1)
}

pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_day_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn first_day_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month >= 12 {
        (year.saturating_add(1), 1_u32)
    } else {
        (year, month + 1)
    };
    first_day_of_month(next_year, next_month) - Duration::days(1)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    last_day_of_month(year, month).day()
}

/// Step a (year, month) pair by whole months, wrapping across years.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let mut year = year;
    let mut month = month as i32 + delta;

    while month < 1 {
        month += 12;
        year = year.saturating_sub(1);
    }
    while month > 12 {
        month -= 12;
        year = year.saturating_add(1);
    }

    (year, month as u32)
}

/// Date window covered by one calendar-count fetch: the first day of the
/// viewed month through the last day of the month after it, so trailing
/// grid cells borrowed from the next month have counts too.
pub fn month_count_span(year: i32, month: u32) -> (NaiveDate, NaiveDate) {
    let (next_year, next_month) = shift_month(year, month, 1);
    (
        first_day_of_month(year, month),
        last_day_of_month(next_year, next_month),
    )
}

/// Heading for the task list: "Today" for the current day, otherwise a
/// long form like "Saturday, June 15".
pub fn day_heading(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else {
        date.format("%A, %B %-d").to_string()
    }
}

/// Short form used by the stale-day prompt, like "Jun 14".
pub fn short_day_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn day_key_is_iso_padded() {
        assert_eq!(day_key(date(2024, 6, 5)), "2024-06-05");
        assert_eq!(parse_day_key("2024-06-05"), Some(date(2024, 6, 5)));
        assert_eq!(parse_day_key(" 2024-06-05 "), Some(date(2024, 6, 5)));
        assert_eq!(parse_day_key("not a date"), None);
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 4), 30);
    }

    #[test]
    fn shift_month_wraps_years_both_ways() {
        assert_eq!(shift_month(2024, 12, 1), (2025, 1));
        assert_eq!(shift_month(2024, 1, -1), (2023, 12));
        assert_eq!(shift_month(2024, 6, 13), (2025, 7));
        assert_eq!(shift_month(2024, 6, -18), (2022, 12));
        assert_eq!(shift_month(2024, 6, 0), (2024, 6));
    }

    #[test]
    fn month_count_span_reaches_end_of_following_month() {
        assert_eq!(
            month_count_span(2024, 6),
            (date(2024, 6, 1), date(2024, 7, 31))
        );
        assert_eq!(
            month_count_span(2024, 12),
            (date(2024, 12, 1), date(2025, 1, 31))
        );
        assert_eq!(
            month_count_span(2024, 1),
            (date(2024, 1, 1), date(2024, 2, 29))
        );
    }

    #[test]
    fn day_heading_marks_today() {
        let today = date(2024, 6, 15);
        assert_eq!(day_heading(today, today), "Today");
        assert_eq!(day_heading(date(2024, 6, 14), today), "Friday, June 14");
    }

    #[test]
    fn short_day_label_formats() {
        assert_eq!(short_day_label(date(2024, 6, 14)), "Jun 14");
        assert_eq!(short_day_label(date(2024, 1, 2)), "Jan 2");
    }
}
