//! Schema migrations, tracked with `PRAGMA user_version`.

use rusqlite::{Connection, params};

use crate::error::Result;
use crate::groups::GroupType;

/// Each entry moves the schema from version `index` to `index + 1`.
const MIGRATIONS: &[&str] = &[
    // 1: users, groups, associations
    "
    CREATE TABLE core_user (
        id BLOB PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        firstname TEXT NOT NULL,
        account_type TEXT NOT NULL,
        created_on TEXT NOT NULL
    );
    CREATE TABLE core_group (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT
    );
    CREATE TABLE core_membership (
        user_id BLOB NOT NULL REFERENCES core_user(id) ON DELETE CASCADE,
        group_id TEXT NOT NULL REFERENCES core_group(id) ON DELETE CASCADE,
        PRIMARY KEY (user_id, group_id)
    );
    CREATE TABLE core_access_token (
        token TEXT PRIMARY KEY,
        user_id BLOB NOT NULL REFERENCES core_user(id) ON DELETE CASCADE,
        created_on TEXT NOT NULL
    );
    CREATE TABLE associations_associations (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        group_id TEXT NOT NULL REFERENCES core_group(id)
    );
    ",
    // 2: feed, notification topics
    "
    CREATE TABLE feed_news (
        id BLOB PRIMARY KEY,
        title TEXT NOT NULL,
        start TEXT NOT NULL,
        \"end\" TEXT,
        entity TEXT NOT NULL,
        location TEXT,
        action_start TEXT,
        module TEXT NOT NULL,
        module_object_id BLOB NOT NULL,
        image_directory TEXT NOT NULL,
        image_id BLOB NOT NULL,
        status TEXT NOT NULL
    );
    CREATE INDEX feed_news_module_object ON feed_news (module, module_object_id);
    CREATE TABLE notification_topic (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        module_root TEXT NOT NULL,
        topic_identifier TEXT,
        restrict_to_group_id TEXT,
        restrict_to_members INTEGER NOT NULL,
        UNIQUE (module_root, topic_identifier)
    );
    ",
    // 3: adverts, calendar
    "
    CREATE TABLE advert_adverts (
        id BLOB PRIMARY KEY,
        advertiser_id BLOB NOT NULL REFERENCES associations_associations(id),
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        date TEXT NOT NULL,
        post_to_feed INTEGER NOT NULL
    );
    CREATE TABLE calendar_events (
        id BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        association_id BLOB NOT NULL REFERENCES associations_associations(id),
        applicant_id BLOB NOT NULL REFERENCES core_user(id),
        start TEXT NOT NULL,
        \"end\" TEXT NOT NULL,
        all_day INTEGER NOT NULL,
        location TEXT NOT NULL,
        description TEXT,
        decision TEXT NOT NULL,
        recurrence_rule TEXT,
        ticket_url TEXT,
        ticket_url_opening TEXT,
        CHECK ((ticket_url IS NULL) = (ticket_url_opening IS NULL))
    );
    CREATE INDEX calendar_events_decision ON calendar_events (decision);
    CREATE TABLE calendar_ical_secret (
        user_id BLOB PRIMARY KEY REFERENCES core_user(id) ON DELETE CASCADE,
        secret TEXT NOT NULL UNIQUE
    );
    ",
];

/// Bring the schema up to date and make sure the static groups exist.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let current = usize::try_from(version).unwrap_or(0);

    if current < MIGRATIONS.len() {
        let tx = conn.transaction()?;
        for (version, sql) in MIGRATIONS.iter().enumerate().skip(current) {
            tx.execute_batch(sql)?;
            tracing::debug!("Applied schema migration {}", version + 1);
        }
        tx.pragma_update(None, "user_version", MIGRATIONS.len() as i64)?;
        tx.commit()?;
    } else {
        tracing::debug!("No migrations needed - database is up to date");
    }

    for group in GroupType::ALL {
        conn.execute(
            "INSERT OR IGNORE INTO core_group (id, name, description) VALUES (?1, ?2, NULL)",
            params![group.id(), group.name()],
        )?;
    }

    Ok(())
}
