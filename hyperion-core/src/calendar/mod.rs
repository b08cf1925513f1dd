//! Calendar events booked by associations, their approval workflow and the
//! personal secrets used to fetch the ICS feed.

pub mod cruds;
pub mod policy;
pub mod service;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::associations::Association;
use crate::db::text_enum_sql;
use crate::error::Error;

/// Module root used for news published about events.
pub const FEED_MODULE: &str = "event";
pub const IMAGE_DIRECTORY: &str = "event";

/// Approval status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Pending,
    Declined,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Pending => "pending",
            Decision::Declined => "declined",
        }
    }
}

impl FromStr for Decision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Decision::Approved),
            "pending" => Ok(Decision::Pending),
            "declined" => Ok(Decision::Declined),
            other => Err(Error::Validation(format!("Unknown decision: {other}"))),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

text_enum_sql!(Decision);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub association_id: Uuid,
    pub applicant_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub location: String,
    pub description: Option<String>,
    pub decision: Decision,
    pub recurrence_rule: Option<String>,
    /// Only handed out through the ticket-url route once it is open
    #[serde(skip_serializing)]
    pub ticket_url: Option<String>,
    pub ticket_url_opening: Option<DateTime<Utc>>,
}

/// An event joined with the association that owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventComplete {
    #[serde(flatten)]
    pub event: Event,
    pub association: Association,
}

/// Body of an event creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct EventBase {
    pub name: String,
    pub association_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub ticket_url: Option<String>,
    #[serde(default)]
    pub ticket_url_opening: Option<DateTime<Utc>>,
}

/// Body of an event edit request.
///
/// Absent fields are left unchanged. Nullable columns take `Some(None)` for an
/// explicit `null`, which clears them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventEdit {
    pub name: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub recurrence_rule: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub ticket_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub ticket_url_opening: Option<Option<DateTime<Utc>>>,
}

/// Marks a field as sent, keeping a `null` value apart from an absent key.
fn present<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventTicketUrl {
    pub ticket_url: String,
}
