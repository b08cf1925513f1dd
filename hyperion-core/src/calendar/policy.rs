//! Approval rules of the calendar.
//!
//! Everything here is pure so the state machine can be checked without a database.

use chrono::{DateTime, Utc};

use super::Decision;
use crate::associations::Association;
use crate::error::{Error, Result};
use crate::groups::GroupType;
use crate::users::CoreUser;

/// Groups whose members moderate the calendar.
pub const PRIVILEGED_GROUPS: [GroupType; 2] = [GroupType::Bde, GroupType::AdminCalendar];

pub fn is_privileged(user: &CoreUser) -> bool {
    user.is_member_of_any(&PRIVILEGED_GROUPS)
}

/// Decision of a new event. Schools that skip confirmation approve directly.
pub fn initial_decision(require_confirmation: bool) -> Decision {
    if require_confirmation {
        Decision::Pending
    } else {
        Decision::Approved
    }
}

/// Non-privileged edits send reviewed events back to review.
pub fn decision_after_edit(current: Decision, privileged: bool) -> Decision {
    if privileged {
        current
    } else {
        Decision::Pending
    }
}

pub fn can_manage(user: &CoreUser, association: &Association) -> bool {
    is_privileged(user) || association.has_member(user)
}

pub fn can_delete(user: &CoreUser, association: &Association, decision: Decision) -> bool {
    is_privileged(user) || (decision == Decision::Pending && association.has_member(user))
}

/// Approved events are public; the others only show to moderators and their association.
pub fn can_view(user: &CoreUser, association: &Association, decision: Decision) -> bool {
    decision == Decision::Approved || can_manage(user, association)
}

/// The ICS file only contains approved events, so it changes when one side of
/// a transition is approved.
pub fn needs_ics_refresh(before: Option<Decision>, after: Option<Decision>) -> bool {
    before == Some(Decision::Approved) || after == Some(Decision::Approved)
}

/// Whether exactly one of the ticket fields is set.
pub fn ticket_pair_mismatch<U, O>(ticket_url: Option<U>, ticket_url_opening: Option<O>) -> bool {
    ticket_url.is_some() != ticket_url_opening.is_some()
}

/// Hand out the ticket url once its opening date has passed.
pub fn ticket_url_if_open(
    ticket_url: Option<&str>,
    ticket_url_opening: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<String> {
    match (ticket_url, ticket_url_opening) {
        (Some(url), Some(opening)) if opening <= now => Ok(url.to_string()),
        (Some(_), Some(_)) => Err(Error::BadRequest("Ticket URL is not yet open".into())),
        _ => Err(Error::not_found("This event has no ticket URL")),
    }
}
