//! Per-date task tallies behind the calendar indicator dots.
//!
//! The index is rebuilt wholesale from a range query whenever the viewed
//! month changes, then patched incrementally as tasks are added, toggled,
//! removed, or moved so the dots track mutations without a refetch.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::store::TaskDayRow;
use crate::types::DayCounts;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayCountIndex {
    by_date: HashMap<NaiveDate, DayCounts>,
}

impl DayCountIndex {
    pub fn new() -> Self {
        DayCountIndex::default()
    }

    /// Replace the whole index with tallies folded from range-query rows.
    pub fn rebuild(&mut self, rows: &[TaskDayRow]) {
        let mut by_date: HashMap<NaiveDate, DayCounts> = HashMap::new();
        for row in rows {
            let entry = by_date.entry(row.scheduled_date).or_default();
            entry.total += 1;
            if row.completed {
                entry.completed += 1;
            }
        }
        self.by_date = by_date;
    }

    pub fn counts_for(&self, date: NaiveDate) -> DayCounts {
        self.by_date.get(&date).copied().unwrap_or_default()
    }

    pub fn record_added(&mut self, date: NaiveDate) {
        self.by_date.entry(date).or_default().total += 1;
    }

    /// Completion flips adjust the completed tally without clamping, so a
    /// toggle-and-untoggle always lands back on the starting value.
    pub fn record_toggled(&mut self, date: NaiveDate, now_completed: bool) {
        let entry = self.by_date.entry(date).or_default();
        if now_completed {
            entry.completed += 1;
        } else {
            entry.completed -= 1;
        }
    }

    pub fn record_removed(&mut self, date: NaiveDate, was_completed: bool) {
        let entry = self.by_date.entry(date).or_default();
        entry.total = (entry.total - 1).max(0);
        if was_completed {
            entry.completed = (entry.completed - 1).max(0);
        }
    }

    /// Shift task totals between two days. Completed tallies stay put:
    /// the move paths only ever carry incomplete tasks.
    pub fn record_moved(&mut self, from: NaiveDate, to: NaiveDate, count: i64) {
        let source = self.by_date.entry(from).or_default();
        source.total = (source.total - count).max(0);
        self.by_date.entry(to).or_default().total += count;
    }
}
