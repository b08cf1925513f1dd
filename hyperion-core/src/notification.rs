//! Notification topics and the delivery seam.
//!
//! Topics are registered in the database; delivering messages to subscribers is
//! the job of a [`NotificationTool`] implementation, invoked after the
//! transaction that produced the notification has committed.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub title: String,
    pub content: String,
    /// Root of the module the client should open when the message is tapped.
    pub action_module: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    Topic(Uuid),
    Group(String),
}

/// A message waiting to be handed to the notification tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub recipient: Recipient,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    pub module_root: String,
    pub topic_identifier: Option<String>,
    pub restrict_to_group_id: Option<String>,
    pub restrict_to_members: bool,
}

#[async_trait]
pub trait NotificationTool: Send + Sync {
    async fn send_notification_to_topic(&self, topic_id: Uuid, message: &Message) -> Result<()>;

    async fn send_notification_to_group(&self, group_id: &str, message: &Message) -> Result<()>;

    async fn dispatch(&self, notification: &Notification) -> Result<()> {
        match &notification.recipient {
            Recipient::Topic(topic_id) => {
                self.send_notification_to_topic(*topic_id, &notification.message)
                    .await
            }
            Recipient::Group(group_id) => {
                self.send_notification_to_group(group_id, &notification.message)
                    .await
            }
        }
    }
}

/// Delivery sink that only records messages in the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotificationTool;

#[async_trait]
impl NotificationTool for LogNotificationTool {
    async fn send_notification_to_topic(&self, topic_id: Uuid, message: &Message) -> Result<()> {
        tracing::info!(%topic_id, title = %message.title, "Notification sent to topic");
        Ok(())
    }

    async fn send_notification_to_group(&self, group_id: &str, message: &Message) -> Result<()> {
        tracing::info!(group_id, title = %message.title, "Notification sent to group");
        Ok(())
    }
}

pub fn get_topic_by_root_and_identifier(
    conn: &Connection,
    module_root: &str,
    topic_identifier: &str,
) -> Result<Option<Topic>> {
    Ok(conn
        .query_row(
            "SELECT id, name, module_root, topic_identifier, restrict_to_group_id,
                restrict_to_members
             FROM notification_topic WHERE module_root = ?1 AND topic_identifier = ?2",
            params![module_root, topic_identifier],
            |row| {
                Ok(Topic {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    module_root: row.get(2)?,
                    topic_identifier: row.get(3)?,
                    restrict_to_group_id: row.get(4)?,
                    restrict_to_members: row.get(5)?,
                })
            },
        )
        .optional()?)
}

pub fn register_new_topic(conn: &Connection, topic: &Topic) -> Result<()> {
    conn.execute(
        "INSERT INTO notification_topic
            (id, name, module_root, topic_identifier, restrict_to_group_id, restrict_to_members)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            topic.id,
            topic.name,
            topic.module_root,
            topic.topic_identifier,
            topic.restrict_to_group_id,
            topic.restrict_to_members
        ],
    )?;
    tracing::debug!(topic_id = %topic.id, name = %topic.name, "Registered notification topic");
    Ok(())
}

/// Return the topic for (`module_root`, `topic_identifier`), registering it with
/// `name` on first use.
pub fn get_or_register_topic(
    conn: &Connection,
    module_root: &str,
    topic_identifier: &str,
    name: &str,
) -> Result<Topic> {
    if let Some(topic) = get_topic_by_root_and_identifier(conn, module_root, topic_identifier)? {
        return Ok(topic);
    }

    let topic = Topic {
        id: Uuid::new_v4(),
        name: name.to_string(),
        module_root: module_root.to_string(),
        topic_identifier: Some(topic_identifier.to_string()),
        restrict_to_group_id: None,
        restrict_to_members: true,
    };
    register_new_topic(conn, &topic)?;
    Ok(topic)
}
