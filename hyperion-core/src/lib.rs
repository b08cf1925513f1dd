//! Core of the hyperion association backend.
//!
//! This crate holds everything that does not depend on HTTP:
//! - users, groups and associations
//! - the news feed and adverts
//! - the calendar approval workflow and its ICS export
//! - the `NotificationTool` seam and the SQLite persistence they share
//!
//! Mutating operations run inside a caller-provided transaction and return the
//! [`Effects`] to carry out once it has committed.

pub mod advert;
pub mod associations;
pub mod calendar;
pub mod config;
pub mod db;
pub mod effects;
pub mod error;
pub mod feed;
pub mod files;
pub mod groups;
pub mod ics;
pub mod notification;
pub mod recurrence;
pub mod security;
pub mod users;

pub use config::Settings;
pub use db::Database;
pub use effects::Effects;
pub use error::{Error, Result};
