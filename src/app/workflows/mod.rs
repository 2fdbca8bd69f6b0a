//! Multi-step flows that pair a dialog with store writes: the
//! plan-your-day prompt, the past-day sweep, and the one-time import
//! of pre-account data.

mod migrate;
mod plan_day;
mod reschedule;
