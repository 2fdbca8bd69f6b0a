pub mod app;
pub mod auth;
pub mod calendar;
pub mod cli;
pub mod dates;
pub mod localdata;
pub mod logging;
pub mod notification;
pub mod settings;
pub mod store;
pub mod streak;
#[cfg(test)]
pub(crate) mod testhttp;
pub mod timer;
pub mod types;
