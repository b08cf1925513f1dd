//! News feed with moderation.
//!
//! Modules publish news about their own objects (adverts, calendar events). News
//! created by associations wait for a feed administrator; news from modules that
//! already gate their content are published directly.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{placeholders, text_enum_sql};
use crate::effects::Effects;
use crate::error::{Error, Result};
use crate::groups::GroupType;
use crate::notification::{Message, Notification, Recipient};

pub const ROOT: &str = "feed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsStatus {
    WaitingApproval,
    Rejected,
    Published,
}

impl NewsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsStatus::WaitingApproval => "waiting_approval",
            NewsStatus::Rejected => "rejected",
            NewsStatus::Published => "published",
        }
    }
}

impl FromStr for NewsStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "waiting_approval" => Ok(NewsStatus::WaitingApproval),
            "rejected" => Ok(NewsStatus::Rejected),
            "published" => Ok(NewsStatus::Published),
            other => Err(Error::Validation(format!("Unknown news status: {other}"))),
        }
    }
}

impl fmt::Display for NewsStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

text_enum_sql!(NewsStatus);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct News {
    pub id: Uuid,
    pub title: String,
    /// The news becomes relevant at this date
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    /// Name of the association or group that created the news
    pub entity: String,
    pub location: Option<String>,
    /// When set, the client shows the news action button from this date
    pub action_start: Option<DateTime<Utc>>,
    pub module: String,
    pub module_object_id: Uuid,
    pub image_directory: String,
    pub image_id: Uuid,
    pub status: NewsStatus,
}

/// Everything a module provides when it posts to the feed.
#[derive(Debug, Clone)]
pub struct NewsCreate {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub entity: String,
    pub location: Option<String>,
    pub action_start: Option<DateTime<Utc>>,
    pub module: String,
    pub module_object_id: Uuid,
    pub image_directory: String,
    pub image_id: Uuid,
    pub require_feed_admin_approval: bool,
}

const NEWS_COLUMNS: &str = "id, title, start, \"end\", entity, location, action_start, module, \
                            module_object_id, image_directory, image_id, status";

fn news_from_row(row: &Row<'_>) -> rusqlite::Result<News> {
    Ok(News {
        id: row.get(0)?,
        title: row.get(1)?,
        start: row.get(2)?,
        end: row.get(3)?,
        entity: row.get(4)?,
        location: row.get(5)?,
        action_start: row.get(6)?,
        module: row.get(7)?,
        module_object_id: row.get(8)?,
        image_directory: row.get(9)?,
        image_id: row.get(10)?,
        status: row.get(11)?,
    })
}

/// Create a news item; news requiring approval also alert the feed administrators.
pub fn create_feed_news(conn: &Connection, news: NewsCreate) -> Result<(News, Effects)> {
    let status = if news.require_feed_admin_approval {
        NewsStatus::WaitingApproval
    } else {
        NewsStatus::Published
    };

    let created = News {
        id: Uuid::new_v4(),
        title: news.title,
        start: news.start,
        end: news.end,
        entity: news.entity,
        location: news.location,
        action_start: news.action_start,
        module: news.module,
        module_object_id: news.module_object_id,
        image_directory: news.image_directory,
        image_id: news.image_id,
        status,
    };

    conn.execute(
        &format!(
            "INSERT INTO feed_news ({NEWS_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            created.id,
            created.title,
            created.start,
            created.end,
            created.entity,
            created.location,
            created.action_start,
            created.module,
            created.module_object_id,
            created.image_directory,
            created.image_id,
            created.status
        ],
    )?;

    let mut effects = Effects::none();
    if news.require_feed_admin_approval {
        effects.notify(Notification {
            recipient: Recipient::Group(GroupType::AdminFeed.id().to_string()),
            message: Message {
                title: "🔔 Feed - a news requires approval".to_string(),
                content: format!("{} has created {}", created.entity, created.title),
                action_module: ROOT.to_string(),
            },
        });
    }

    Ok((created, effects))
}

pub fn get_news(conn: &Connection, statuses: &[NewsStatus]) -> Result<Vec<News>> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {NEWS_COLUMNS} FROM feed_news WHERE status IN ({}) ORDER BY start DESC",
        placeholders(statuses.len())
    ))?;
    let news = stmt
        .query_map(params_from_iter(statuses), news_from_row)?
        .collect::<rusqlite::Result<_>>()?;
    Ok(news)
}

pub fn get_all_news(conn: &Connection) -> Result<Vec<News>> {
    get_news(
        conn,
        &[
            NewsStatus::WaitingApproval,
            NewsStatus::Rejected,
            NewsStatus::Published,
        ],
    )
}

pub fn get_news_by_id(conn: &Connection, news_id: Uuid) -> Result<Option<News>> {
    Ok(conn
        .query_row(
            &format!("SELECT {NEWS_COLUMNS} FROM feed_news WHERE id = ?1"),
            params![news_id],
            news_from_row,
        )
        .optional()?)
}

pub fn get_news_by_module_object(
    conn: &Connection,
    module: &str,
    module_object_id: Uuid,
) -> Result<Vec<News>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NEWS_COLUMNS} FROM feed_news WHERE module = ?1 AND module_object_id = ?2"
    ))?;
    let news = stmt
        .query_map(params![module, module_object_id], news_from_row)?
        .collect::<rusqlite::Result<_>>()?;
    Ok(news)
}

pub fn change_news_status(conn: &Connection, news_id: Uuid, status: NewsStatus) -> Result<()> {
    let updated = conn.execute(
        "UPDATE feed_news SET status = ?2 WHERE id = ?1",
        params![news_id, status],
    )?;
    if updated == 0 {
        return Err(Error::not_found("The news does not exist"));
    }
    Ok(())
}

/// Remove the news published about an object that no longer exists.
pub fn delete_news_for_module_object(
    conn: &Connection,
    module: &str,
    module_object_id: Uuid,
) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM feed_news WHERE module = ?1 AND module_object_id = ?2",
        params![module, module_object_id],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn news(require_approval: bool) -> NewsCreate {
        NewsCreate {
            title: "Les 24h du code".into(),
            start: Utc::now(),
            end: None,
            entity: "Eclair".into(),
            location: None,
            action_start: None,
            module: "advert".into(),
            module_object_id: Uuid::new_v4(),
            image_directory: "adverts".into(),
            image_id: Uuid::new_v4(),
            require_feed_admin_approval: require_approval,
        }
    }

    #[test]
    fn test_news_requiring_approval_waits_and_alerts_feed_admins() {
        let db = Database::open_in_memory().unwrap();

        let (created, effects) = db.transaction(|tx| create_feed_news(tx, news(true))).unwrap();

        assert_eq!(created.status, NewsStatus::WaitingApproval);
        assert_eq!(effects.notifications.len(), 1);
        assert_eq!(
            effects.notifications[0].recipient,
            Recipient::Group(GroupType::AdminFeed.id().to_string())
        );

        let published = db
            .read(|conn| get_news(conn, &[NewsStatus::Published]))
            .unwrap();
        assert!(published.is_empty());
    }

    #[test]
    fn test_news_without_approval_is_published_silently() {
        let db = Database::open_in_memory().unwrap();

        let (created, effects) = db.transaction(|tx| create_feed_news(tx, news(false))).unwrap();

        assert_eq!(created.status, NewsStatus::Published);
        assert!(effects.notifications.is_empty());
    }

    #[test]
    fn test_change_status_of_missing_news_is_not_found() {
        let db = Database::open_in_memory().unwrap();

        let result =
            db.transaction(|tx| change_news_status(tx, Uuid::new_v4(), NewsStatus::Published));

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_approve_then_reject() {
        let db = Database::open_in_memory().unwrap();
        let (created, _) = db.transaction(|tx| create_feed_news(tx, news(true))).unwrap();

        db.transaction(|tx| change_news_status(tx, created.id, NewsStatus::Published))
            .unwrap();
        assert_eq!(
            db.read(|conn| get_news(conn, &[NewsStatus::Published]))
                .unwrap()
                .len(),
            1
        );

        db.transaction(|tx| change_news_status(tx, created.id, NewsStatus::Rejected))
            .unwrap();
        let stored = db
            .read(|conn| get_news_by_id(conn, created.id))
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, NewsStatus::Rejected);
    }

    #[test]
    fn test_get_news_filters_on_every_listed_status() {
        let db = Database::open_in_memory().unwrap();
        let (pending, _) = db.transaction(|tx| create_feed_news(tx, news(true))).unwrap();
        let (published, _) = db.transaction(|tx| create_feed_news(tx, news(false))).unwrap();
        let (rejected, _) = db.transaction(|tx| create_feed_news(tx, news(true))).unwrap();
        db.transaction(|tx| change_news_status(tx, rejected.id, NewsStatus::Rejected))
            .unwrap();

        let visible = db
            .read(|conn| get_news(conn, &[NewsStatus::Published, NewsStatus::WaitingApproval]))
            .unwrap();
        let mut ids: Vec<Uuid> = visible.iter().map(|n| n.id).collect();
        ids.sort();
        let mut expected = vec![pending.id, published.id];
        expected.sort();
        assert_eq!(ids, expected);

        assert!(db.read(|conn| get_news(conn, &[])).unwrap().is_empty());
    }
}
