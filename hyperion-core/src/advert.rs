//! Adverts: announcements published by associations.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::associations::{Association, get_association_by_id};
use crate::db::placeholders;
use crate::effects::Effects;
use crate::error::{Error, Result};
use crate::feed::{self, NewsCreate};
use crate::notification::{Message, Notification, Recipient, get_or_register_topic};
use crate::users::CoreUser;

pub const ROOT: &str = "advert";
pub const IMAGE_DIRECTORY: &str = "adverts";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advert {
    pub id: Uuid,
    pub advertiser_id: Uuid,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub post_to_feed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvertBase {
    pub title: String,
    pub content: String,
    pub advertiser_id: Uuid,
    /// Post the advert to the feed as well. The news waits for a feed administrator.
    #[serde(default)]
    pub post_to_feed: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvertUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

const ADVERT_COLUMNS: &str = "id, advertiser_id, title, content, date, post_to_feed";

fn advert_from_row(row: &Row<'_>) -> rusqlite::Result<Advert> {
    Ok(Advert {
        id: row.get(0)?,
        advertiser_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        date: row.get(4)?,
        post_to_feed: row.get(5)?,
    })
}

// =============================================================================
// Queries
// =============================================================================

pub fn get_adverts(conn: &Connection) -> Result<Vec<Advert>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ADVERT_COLUMNS} FROM advert_adverts ORDER BY date DESC"
    ))?;
    let adverts = stmt
        .query_map([], advert_from_row)?
        .collect::<rusqlite::Result<_>>()?;
    Ok(adverts)
}

pub fn get_adverts_by_advertisers(
    conn: &Connection,
    advertisers: &[Uuid],
) -> Result<Vec<Advert>> {
    if advertisers.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {ADVERT_COLUMNS} FROM advert_adverts \
         WHERE advertiser_id IN ({}) ORDER BY date DESC",
        placeholders(advertisers.len())
    ))?;
    let adverts = stmt
        .query_map(params_from_iter(advertisers), advert_from_row)?
        .collect::<rusqlite::Result<_>>()?;
    Ok(adverts)
}

pub fn get_advert_by_id(conn: &Connection, advert_id: Uuid) -> Result<Option<Advert>> {
    Ok(conn
        .query_row(
            &format!("SELECT {ADVERT_COLUMNS} FROM advert_adverts WHERE id = ?1"),
            params![advert_id],
            advert_from_row,
        )
        .optional()?)
}

// =============================================================================
// Operations
// =============================================================================

/// Load an advert the user is allowed to manage (member of the advertiser).
pub fn get_managed_advert(conn: &Connection, user: &CoreUser, advert_id: Uuid) -> Result<Advert> {
    let advert = get_advert_by_id(conn, advert_id)?
        .ok_or_else(|| Error::not_found("Invalid advert_id"))?;

    let association = get_association_by_id(conn, advert.advertiser_id)?
        .ok_or_else(|| Error::not_found("Association not found"))?;

    if !association.has_member(user) {
        return Err(Error::forbidden(format!(
            "Unauthorized to manage {} adverts",
            advert.advertiser_id
        )));
    }

    Ok(advert)
}

/// Create an advert, notify the association's advert topic and optionally post to the feed.
pub fn create_advert(
    conn: &Connection,
    user: &CoreUser,
    advert: AdvertBase,
) -> Result<(Advert, Effects)> {
    let association = get_association_by_id(conn, advert.advertiser_id)?
        .ok_or_else(|| Error::not_found("Association not found"))?;

    if !association.has_member(user) {
        return Err(Error::forbidden(
            "You are not allowed to create adverts for this association",
        ));
    }

    let created = Advert {
        id: Uuid::new_v4(),
        advertiser_id: advert.advertiser_id,
        title: advert.title,
        content: advert.content,
        date: Utc::now(),
        post_to_feed: advert.post_to_feed,
    };

    conn.execute(
        &format!("INSERT INTO advert_adverts ({ADVERT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            created.id,
            created.advertiser_id,
            created.title,
            created.content,
            created.date,
            created.post_to_feed
        ],
    )?;

    let mut effects = Effects::none();
    effects.notify(topic_notification(conn, &association, &created)?);

    if created.post_to_feed {
        let (_, feed_effects) = feed::create_feed_news(
            conn,
            NewsCreate {
                title: created.title.clone(),
                start: created.date,
                end: None,
                entity: association.name.clone(),
                location: None,
                action_start: None,
                module: ROOT.to_string(),
                module_object_id: created.id,
                image_directory: IMAGE_DIRECTORY.to_string(),
                image_id: created.id,
                require_feed_admin_approval: true,
            },
        )?;
        effects.merge(feed_effects);
    }

    tracing::info!(advert_id = %created.id, association = %association.name, "Advert created");
    Ok((created, effects))
}

/// The association's topic is registered the first time it publishes an advert.
fn topic_notification(
    conn: &Connection,
    association: &Association,
    advert: &Advert,
) -> Result<Notification> {
    let topic = get_or_register_topic(
        conn,
        ROOT,
        &association.id.to_string(),
        &format!("📣 Annonce - {}", association.name),
    )?;

    Ok(Notification {
        recipient: Recipient::Topic(topic.id),
        message: Message {
            title: format!("📣 Annonce - {}", advert.title),
            content: advert.content.clone(),
            action_module: ROOT.to_string(),
        },
    })
}

pub fn update_advert(
    conn: &Connection,
    user: &CoreUser,
    advert_id: Uuid,
    update: &AdvertUpdate,
) -> Result<()> {
    get_managed_advert(conn, user, advert_id)?;

    conn.execute(
        "UPDATE advert_adverts
         SET title = COALESCE(?2, title), content = COALESCE(?3, content)
         WHERE id = ?1",
        params![advert_id, update.title, update.content],
    )?;
    Ok(())
}

pub fn delete_advert(conn: &Connection, user: &CoreUser, advert_id: Uuid) -> Result<Effects> {
    get_managed_advert(conn, user, advert_id)?;

    feed::delete_news_for_module_object(conn, ROOT, advert_id)?;
    conn.execute("DELETE FROM advert_adverts WHERE id = ?1", params![advert_id])?;

    let mut effects = Effects::none();
    effects.remove_image(IMAGE_DIRECTORY, advert_id);
    Ok(effects)
}
