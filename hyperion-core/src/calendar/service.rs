//! Calendar operations.
//!
//! Each function runs inside the caller's transaction and reports the follow-up
//! work (notifications, ICS rebuild) in the returned [`Effects`].

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use super::policy::{
    can_delete, can_manage, can_view, decision_after_edit, initial_decision, is_privileged,
    needs_ics_refresh, ticket_pair_mismatch, ticket_url_if_open,
};
use super::{
    Decision, Event, EventBase, EventComplete, EventEdit, FEED_MODULE, IMAGE_DIRECTORY, cruds,
};
use crate::associations::get_association_by_id;
use crate::effects::Effects;
use crate::error::{Error, Result};
use crate::feed::{self, NewsCreate};
use crate::recurrence::{check_rule_for_create, check_rule_for_edit};
use crate::security::generate_token;
use crate::users::CoreUser;

fn find_event(conn: &Connection, event_id: Uuid) -> Result<EventComplete> {
    cruds::get_event(conn, event_id)?.ok_or_else(|| Error::not_found("Event not found"))
}

/// Every event, whatever its decision. Restricted to calendar moderators.
pub fn list_all_events(conn: &Connection, user: &CoreUser) -> Result<Vec<EventComplete>> {
    if !is_privileged(user) {
        return Err(Error::forbidden("You are not allowed to list all events"));
    }
    cruds::get_all_events(conn)
}

pub fn list_association_events(
    conn: &Connection,
    user: &CoreUser,
    association_id: Uuid,
) -> Result<Vec<EventComplete>> {
    let association = get_association_by_id(conn, association_id)?
        .ok_or_else(|| Error::not_found("Association not found"))?;

    if !association.has_member(user) {
        return Err(Error::forbidden(format!(
            "You are not a member of {}",
            association.name
        )));
    }

    cruds::get_events_by_association(conn, association_id)
}

pub fn get_event_for(conn: &Connection, user: &CoreUser, event_id: Uuid) -> Result<EventComplete> {
    let event = find_event(conn, event_id)?;

    if !can_view(user, &event.association, event.event.decision) {
        return Err(Error::forbidden("You are not allowed to see this event"));
    }

    Ok(event)
}

pub fn add_event(
    conn: &Connection,
    user: &CoreUser,
    event: EventBase,
    require_confirmation: bool,
) -> Result<(EventComplete, Effects)> {
    let association = get_association_by_id(conn, event.association_id)?
        .ok_or_else(|| Error::not_found("Association not found"))?;

    if !can_manage(user, &association) {
        return Err(Error::forbidden(format!(
            "You are not allowed to create events for {}",
            association.name
        )));
    }

    if ticket_pair_mismatch(event.ticket_url.as_ref(), event.ticket_url_opening) {
        return Err(Error::Validation(
            "ticket_url and ticket_url_opening must be set together".into(),
        ));
    }
    if event.end < event.start {
        return Err(Error::Validation("The event ends before it starts".into()));
    }
    let recurrence_rule = check_rule_for_create(event.start, event.recurrence_rule.as_deref())?;

    let decision = initial_decision(require_confirmation);
    let id = Uuid::new_v4();

    cruds::insert_event(
        conn,
        &Event {
            id,
            name: event.name,
            association_id: association.id,
            applicant_id: user.id,
            start: event.start,
            end: event.end,
            all_day: event.all_day,
            location: event.location,
            description: event.description,
            decision,
            recurrence_rule,
            ticket_url: event.ticket_url,
            ticket_url_opening: event.ticket_url_opening,
        },
    )?;

    let created =
        cruds::get_event(conn, id)?.ok_or(Error::NewlyAddedObjectNotFound("event"))?;

    let mut effects = Effects::none();
    if decision == Decision::Approved {
        effects.merge(publish_to_feed(conn, &created)?);
    }
    effects.refresh_ics = needs_ics_refresh(None, Some(decision));

    tracing::info!(
        event_id = %id,
        association = %created.association.name,
        %decision,
        "Event created"
    );
    Ok((created, effects))
}

pub fn edit_event(
    conn: &Connection,
    user: &CoreUser,
    event_id: Uuid,
    edit: &EventEdit,
) -> Result<Effects> {
    let current = find_event(conn, event_id)?;

    if !can_manage(user, &current.association) {
        return Err(Error::forbidden("You are not allowed to edit this event"));
    }

    // The ticket pair is sent, set and cleared as a whole
    let ticket_mismatch = match (&edit.ticket_url, &edit.ticket_url_opening) {
        (None, None) => false,
        (Some(url), Some(opening)) => ticket_pair_mismatch(url.as_ref(), opening.as_ref()),
        _ => true,
    };
    if ticket_mismatch {
        return Err(Error::BadRequest(
            "ticket_url and ticket_url_opening must be set together".into(),
        ));
    }

    let start = edit.start.unwrap_or(current.event.start);
    let end = edit.end.unwrap_or(current.event.end);
    if end < start {
        return Err(Error::BadRequest("The event ends before it starts".into()));
    }

    // The stored rule is checked again when only the dates move
    let rule = match &edit.recurrence_rule {
        Some(sent) => sent.as_deref(),
        None => current.event.recurrence_rule.as_deref(),
    };
    let rule = check_rule_for_edit(start, rule)?;

    let mut edit = edit.clone();
    if edit.recurrence_rule.is_some() {
        edit.recurrence_rule = Some(rule);
    }

    let before = current.event.decision;
    let after = decision_after_edit(before, is_privileged(user));
    cruds::update_event(conn, event_id, &edit, after)?;

    if after != before {
        tracing::info!(%event_id, %before, %after, "Edited event sent back to review");
    }

    Ok(Effects {
        refresh_ics: needs_ics_refresh(Some(before), Some(after)),
        ..Effects::none()
    })
}

/// Set the decision of an event. Approving publishes it to the feed once.
pub fn reply(
    conn: &Connection,
    user: &CoreUser,
    event_id: Uuid,
    decision: Decision,
) -> Result<Effects> {
    if !is_privileged(user) {
        return Err(Error::forbidden("You are not allowed to reply to events"));
    }

    let current = find_event(conn, event_id)?;
    let before = current.event.decision;
    cruds::set_decision(conn, event_id, decision)?;

    let mut effects = Effects::none();
    if decision == Decision::Approved {
        effects.merge(publish_to_feed(conn, &current)?);
    }
    effects.refresh_ics = needs_ics_refresh(Some(before), Some(decision));

    tracing::info!(%event_id, %before, after = %decision, "Event decision changed");
    Ok(effects)
}

pub fn delete_event(conn: &Connection, user: &CoreUser, event_id: Uuid) -> Result<Effects> {
    let current = find_event(conn, event_id)?;
    let decision = current.event.decision;

    if !can_delete(user, &current.association, decision) {
        return Err(Error::forbidden("You are not allowed to delete this event"));
    }

    feed::delete_news_for_module_object(conn, FEED_MODULE, event_id)?;
    cruds::delete_event(conn, event_id)?;

    let mut effects = Effects {
        refresh_ics: needs_ics_refresh(Some(decision), None),
        ..Effects::none()
    };
    effects.remove_image(IMAGE_DIRECTORY, event_id);
    Ok(effects)
}

pub fn get_ticket_url(
    conn: &Connection,
    user: &CoreUser,
    event_id: Uuid,
    now: DateTime<Utc>,
) -> Result<String> {
    let event = get_event_for(conn, user, event_id)?.event;
    ticket_url_if_open(event.ticket_url.as_deref(), event.ticket_url_opening, now)
}

/// Whether `user` may attach an image to the event.
pub fn check_can_manage_event(conn: &Connection, user: &CoreUser, event_id: Uuid) -> Result<()> {
    let event = find_event(conn, event_id)?;
    if !can_manage(user, &event.association) {
        return Err(Error::forbidden("You are not allowed to manage this event"));
    }
    Ok(())
}

/// Return the user's ICS secret, creating it on first request.
pub fn get_or_create_ical_secret(conn: &Connection, user: &CoreUser) -> Result<String> {
    if let Some(secret) = cruds::get_ical_secret(conn, user.id)? {
        return Ok(secret);
    }

    let secret = generate_token();
    cruds::add_ical_secret(conn, user.id, &secret)?;
    Ok(secret)
}

pub fn is_valid_ical_secret(conn: &Connection, secret: &str) -> Result<bool> {
    cruds::ical_secret_exists(conn, secret)
}

/// Post an approved event to the feed unless a news item already points to it.
fn publish_to_feed(conn: &Connection, event: &EventComplete) -> Result<Effects> {
    if !feed::get_news_by_module_object(conn, FEED_MODULE, event.event.id)?.is_empty() {
        return Ok(Effects::none());
    }

    let (_, effects) = feed::create_feed_news(
        conn,
        NewsCreate {
            title: event.event.name.clone(),
            start: event.event.start,
            end: Some(event.event.end),
            entity: event.association.name.clone(),
            location: Some(event.event.location.clone()),
            action_start: event.event.ticket_url_opening,
            module: FEED_MODULE.to_string(),
            module_object_id: event.event.id,
            image_directory: IMAGE_DIRECTORY.to_string(),
            image_id: event.event.id,
            require_feed_admin_approval: false,
        },
    )?;
    Ok(effects)
}
