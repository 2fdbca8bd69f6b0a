//! Month grid computation and calendar navigation state.
//!
//! The grid is a pure function of (year, month, today): always 42 cells,
//! Sunday-first weeks, leading cells borrowed from the previous month and
//! trailing cells from the next. Rendering is the embedder's concern;
//! cells carry their absolute date so drops and selections resolve
//! without re-deriving positions.

use chrono::{Datelike, Duration, NaiveDate};

use crate::dates::{days_in_month, first_day_of_month, shift_month};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub day: u32,
    pub in_month: bool,
    pub is_today: bool,
}

pub const GRID_CELLS: usize = 42;

/// Fixed 42-cell grid for a viewed month.
pub fn month_grid(year: i32, month: u32, today: NaiveDate) -> Vec<CalendarCell> {
    let first = first_day_of_month(year, month);
    let start_pad = first.weekday().num_days_from_sunday() as i64;

    let mut cells = Vec::with_capacity(GRID_CELLS);
    let mut date = first - Duration::days(start_pad);

    for _ in 0..GRID_CELLS {
        cells.push(CalendarCell {
            date,
            day: date.day(),
            in_month: date.year() == year && date.month() == month,
            is_today: date == today,
        });
        date += Duration::days(1);
    }

    cells
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceDirection {
    Previous,
    Next,
}

/// Navigation state for the calendar pane: the viewed (year, month) and
/// the armed auto-advance used while a task drag hovers a nav arrow.
/// The embedder owns the repeating interval and calls
/// [`CalendarView::drag_advance_tick`] on each firing.
#[derive(Debug, Clone)]
pub struct CalendarView {
    viewed_year: i32,
    viewed_month: u32,
    drag_advance: Option<AdvanceDirection>,
}

impl CalendarView {
    pub fn new(initial: NaiveDate) -> Self {
        CalendarView {
            viewed_year: initial.year(),
            viewed_month: initial.month(),
            drag_advance: None,
        }
    }

    pub fn viewed(&self) -> (i32, u32) {
        (self.viewed_year, self.viewed_month)
    }

    pub fn grid(&self, today: NaiveDate) -> Vec<CalendarCell> {
        month_grid(self.viewed_year, self.viewed_month, today)
    }

    pub fn previous_month(&mut self) {
        let (year, month) = shift_month(self.viewed_year, self.viewed_month, -1);
        self.viewed_year = year;
        self.viewed_month = month;
    }

    pub fn next_month(&mut self) {
        let (year, month) = shift_month(self.viewed_year, self.viewed_month, 1);
        self.viewed_year = year;
        self.viewed_month = month;
    }

    pub fn jump_to(&mut self, date: NaiveDate) {
        self.viewed_year = date.year();
        self.viewed_month = date.month();
    }

    pub fn select_year(&mut self, year: i32) {
        self.viewed_year = year;
    }

    pub fn select_month(&mut self, month: u32) {
        if (1..=12).contains(&month) {
            self.viewed_month = month;
        }
    }

    /// Clamp a direct day selection to the viewed month's length.
    pub fn date_for_day(&self, day: u32) -> Option<NaiveDate> {
        let clamped = day.clamp(1, days_in_month(self.viewed_year, self.viewed_month));
        NaiveDate::from_ymd_opt(self.viewed_year, self.viewed_month, clamped)
    }

    pub fn arm_drag_advance(&mut self, direction: AdvanceDirection) {
        self.drag_advance = Some(direction);
    }

    pub fn clear_drag_advance(&mut self) {
        self.drag_advance = None;
    }

    pub fn drag_advance_armed(&self) -> Option<AdvanceDirection> {
        self.drag_advance
    }

    /// One interval firing while a drag hovers a nav arrow: flip the
    /// viewed month in the armed direction. No-op when disarmed.
    pub fn drag_advance_tick(&mut self) {
        match self.drag_advance {
            Some(AdvanceDirection::Previous) => self.previous_month(),
            Some(AdvanceDirection::Next) => self.next_month(),
            None => {}
        }
    }
}
