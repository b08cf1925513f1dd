//! Users, groups, memberships and access tokens.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::groups::{AccountType, GroupType};
use crate::security::generate_token;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub firstname: String,
    pub account_type: AccountType,
    pub created_on: DateTime<Utc>,
    pub group_ids: Vec<String>,
}

impl CoreUser {
    pub fn is_member_of(&self, group_id: &str) -> bool {
        self.group_ids.iter().any(|g| g == group_id)
    }

    pub fn is_member_of_any(&self, groups: &[GroupType]) -> bool {
        groups.iter().any(|g| self.is_member_of(g.id()))
    }

    pub fn is_school_member(&self) -> bool {
        self.account_type.is_school_member()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub name: String,
    pub firstname: String,
    pub account_type: AccountType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupCreate {
    pub name: String,
    pub description: Option<String>,
}

/// Body of membership add/remove requests.
#[derive(Debug, Clone, Deserialize)]
pub struct Membership {
    pub user_id: Uuid,
    pub group_id: String,
}

// =============================================================================
// Users
// =============================================================================

const USER_COLUMNS: &str = "id, email, name, firstname, account_type, created_on";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<CoreUser> {
    Ok(CoreUser {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        firstname: row.get(3)?,
        account_type: row.get(4)?,
        created_on: row.get(5)?,
        group_ids: Vec::new(),
    })
}

fn with_groups(conn: &Connection, user: Option<CoreUser>) -> Result<Option<CoreUser>> {
    let Some(mut user) = user else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT group_id FROM core_membership WHERE user_id = ?1 ORDER BY group_id")?;
    user.group_ids = stmt
        .query_map(params![user.id], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    Ok(Some(user))
}

pub fn create_user(conn: &Connection, user: &UserCreate) -> Result<CoreUser> {
    if get_user_by_email(conn, &user.email)?.is_some() {
        return Err(Error::BadRequest(format!(
            "An account with the email {} already exists",
            user.email
        )));
    }

    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO core_user (id, email, name, firstname, account_type, created_on)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, user.email, user.name, user.firstname, user.account_type, Utc::now()],
    )?;

    get_user_by_id(conn, id)?.ok_or(Error::NewlyAddedObjectNotFound("user"))
}

pub fn get_user_by_id(conn: &Connection, user_id: Uuid) -> Result<Option<CoreUser>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM core_user WHERE id = ?1"),
            params![user_id],
            user_from_row,
        )
        .optional()?;

    with_groups(conn, user)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<CoreUser>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM core_user WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()?;

    with_groups(conn, user)
}

/// Resolve a bearer token to its user.
pub fn get_user_by_token(conn: &Connection, token: &str) -> Result<Option<CoreUser>> {
    let user = conn
        .query_row(
            "SELECT u.id, u.email, u.name, u.firstname, u.account_type, u.created_on
             FROM core_access_token t JOIN core_user u ON u.id = t.user_id
             WHERE t.token = ?1",
            params![token],
            user_from_row,
        )
        .optional()?;

    with_groups(conn, user)
}

pub fn create_access_token(conn: &Connection, user_id: Uuid) -> Result<String> {
    let token = generate_token();
    conn.execute(
        "INSERT INTO core_access_token (token, user_id, created_on) VALUES (?1, ?2, ?3)",
        params![token, user_id, Utc::now()],
    )?;
    Ok(token)
}

// =============================================================================
// Groups
// =============================================================================

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

pub fn get_groups(conn: &Connection) -> Result<Vec<Group>> {
    let mut stmt = conn.prepare("SELECT id, name, description FROM core_group ORDER BY name")?;
    let groups = stmt
        .query_map([], group_from_row)?
        .collect::<rusqlite::Result<_>>()?;
    Ok(groups)
}

pub fn get_group_by_id(conn: &Connection, group_id: &str) -> Result<Option<Group>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description FROM core_group WHERE id = ?1",
            params![group_id],
            group_from_row,
        )
        .optional()?)
}

pub fn create_group(conn: &Connection, group: &GroupCreate) -> Result<Group> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM core_group WHERE name = ?1)",
        params![group.name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(Error::BadRequest(format!(
            "A group with the name {} already exists",
            group.name
        )));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO core_group (id, name, description) VALUES (?1, ?2, ?3)",
        params![id, group.name, group.description],
    )?;

    get_group_by_id(conn, &id)?.ok_or(Error::NewlyAddedObjectNotFound("group"))
}

pub fn add_membership(conn: &Connection, membership: &Membership) -> Result<()> {
    if get_user_by_id(conn, membership.user_id)?.is_none() {
        return Err(Error::not_found("User not found"));
    }
    if get_group_by_id(conn, &membership.group_id)?.is_none() {
        return Err(Error::not_found("Group not found"));
    }

    conn.execute(
        "INSERT OR IGNORE INTO core_membership (user_id, group_id) VALUES (?1, ?2)",
        params![membership.user_id, membership.group_id],
    )?;
    Ok(())
}

pub fn delete_membership(conn: &Connection, membership: &Membership) -> Result<()> {
    conn.execute(
        "DELETE FROM core_membership WHERE user_id = ?1 AND group_id = ?2",
        params![membership.user_id, membership.group_id],
    )?;
    Ok(())
}
