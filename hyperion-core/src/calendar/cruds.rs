//! Database access for calendar events and ICS secrets.

use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use uuid::Uuid;

use super::{Decision, Event, EventComplete, EventEdit};
use crate::associations::Association;
use crate::error::Result;

const EVENT_SELECT: &str = "SELECT e.id, e.name, e.association_id, e.applicant_id, e.start, \
    e.\"end\", e.all_day, e.location, e.description, e.decision, e.recurrence_rule, \
    e.ticket_url, e.ticket_url_opening, a.id, a.name, a.group_id
    FROM calendar_events e JOIN associations_associations a ON a.id = e.association_id";

fn event_complete_from_row(row: &Row<'_>) -> rusqlite::Result<EventComplete> {
    Ok(EventComplete {
        event: Event {
            id: row.get(0)?,
            name: row.get(1)?,
            association_id: row.get(2)?,
            applicant_id: row.get(3)?,
            start: row.get(4)?,
            end: row.get(5)?,
            all_day: row.get(6)?,
            location: row.get(7)?,
            description: row.get(8)?,
            decision: row.get(9)?,
            recurrence_rule: row.get(10)?,
            ticket_url: row.get(11)?,
            ticket_url_opening: row.get(12)?,
        },
        association: Association {
            id: row.get(13)?,
            name: row.get(14)?,
            group_id: row.get(15)?,
        },
    })
}

fn query_events(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<EventComplete>> {
    let mut stmt = conn.prepare(&format!("{EVENT_SELECT} {filter} ORDER BY e.start"))?;
    let events = stmt
        .query_map(params, event_complete_from_row)?
        .collect::<rusqlite::Result<_>>()?;
    Ok(events)
}

pub fn get_all_events(conn: &Connection) -> Result<Vec<EventComplete>> {
    query_events(conn, "", [])
}

pub fn get_events_by_decision(conn: &Connection, decision: Decision) -> Result<Vec<EventComplete>> {
    query_events(conn, "WHERE e.decision = ?1", params![decision])
}

pub fn get_confirmed_events(conn: &Connection) -> Result<Vec<EventComplete>> {
    get_events_by_decision(conn, Decision::Approved)
}

pub fn get_events_by_association(
    conn: &Connection,
    association_id: Uuid,
) -> Result<Vec<EventComplete>> {
    query_events(conn, "WHERE e.association_id = ?1", params![association_id])
}

pub fn get_event(conn: &Connection, event_id: Uuid) -> Result<Option<EventComplete>> {
    Ok(conn
        .query_row(
            &format!("{EVENT_SELECT} WHERE e.id = ?1"),
            params![event_id],
            event_complete_from_row,
        )
        .optional()?)
}

pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    conn.execute(
        "INSERT INTO calendar_events (id, name, association_id, applicant_id, start, \"end\",
            all_day, location, description, decision, recurrence_rule, ticket_url,
            ticket_url_opening)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            event.id,
            event.name,
            event.association_id,
            event.applicant_id,
            event.start,
            event.end,
            event.all_day,
            event.location,
            event.description,
            event.decision,
            event.recurrence_rule,
            event.ticket_url,
            event.ticket_url_opening
        ],
    )?;
    Ok(())
}

/// Apply the fields sent in `edit` and store `decision`.
pub fn update_event(
    conn: &Connection,
    event_id: Uuid,
    edit: &EventEdit,
    decision: Decision,
) -> Result<()> {
    let mut columns: Vec<(&str, &dyn ToSql)> = vec![("decision", &decision)];
    if let Some(name) = &edit.name {
        columns.push(("name", name));
    }
    if let Some(start) = &edit.start {
        columns.push(("start", start));
    }
    if let Some(end) = &edit.end {
        columns.push(("\"end\"", end));
    }
    if let Some(all_day) = &edit.all_day {
        columns.push(("all_day", all_day));
    }
    if let Some(location) = &edit.location {
        columns.push(("location", location));
    }
    if let Some(description) = &edit.description {
        columns.push(("description", description));
    }
    if let Some(rule) = &edit.recurrence_rule {
        columns.push(("recurrence_rule", rule));
    }
    if let Some(ticket_url) = &edit.ticket_url {
        columns.push(("ticket_url", ticket_url));
    }
    if let Some(opening) = &edit.ticket_url_opening {
        columns.push(("ticket_url_opening", opening));
    }

    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
        .collect();
    let sql = format!(
        "UPDATE calendar_events SET {} WHERE id = ?{}",
        assignments.join(", "),
        columns.len() + 1
    );

    let mut values: Vec<&dyn ToSql> = columns.iter().map(|(_, value)| *value).collect();
    values.push(&event_id);
    conn.execute(&sql, values.as_slice())?;
    Ok(())
}

pub fn set_decision(conn: &Connection, event_id: Uuid, decision: Decision) -> Result<()> {
    conn.execute(
        "UPDATE calendar_events SET decision = ?2 WHERE id = ?1",
        params![event_id, decision],
    )?;
    Ok(())
}

pub fn delete_event(conn: &Connection, event_id: Uuid) -> Result<()> {
    conn.execute("DELETE FROM calendar_events WHERE id = ?1", params![event_id])?;
    Ok(())
}

// =============================================================================
// ICS secrets
// =============================================================================

pub fn get_ical_secret(conn: &Connection, user_id: Uuid) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT secret FROM calendar_ical_secret WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn ical_secret_exists(conn: &Connection, secret: &str) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM calendar_ical_secret WHERE secret = ?1",
            params![secret],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

pub fn add_ical_secret(conn: &Connection, user_id: Uuid, secret: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO calendar_ical_secret (user_id, secret) VALUES (?1, ?2)",
        params![user_id, secret],
    )?;
    Ok(())
}
