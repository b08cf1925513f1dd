//! Associations: student organisations managed by the members of one group.

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::users::{CoreUser, get_group_by_id};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub id: Uuid,
    pub name: String,
    pub group_id: String,
}

impl Association {
    /// Members of the association's group manage it.
    pub fn has_member(&self, user: &CoreUser) -> bool {
        user.is_member_of(&self.group_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociationBase {
    pub name: String,
    pub group_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssociationUpdate {
    pub name: Option<String>,
    pub group_id: Option<String>,
}

fn association_from_row(row: &Row<'_>) -> rusqlite::Result<Association> {
    Ok(Association {
        id: row.get(0)?,
        name: row.get(1)?,
        group_id: row.get(2)?,
    })
}

pub fn get_associations(conn: &Connection) -> Result<Vec<Association>> {
    let mut stmt =
        conn.prepare("SELECT id, name, group_id FROM associations_associations ORDER BY name")?;
    let associations = stmt
        .query_map([], association_from_row)?
        .collect::<rusqlite::Result<_>>()?;
    Ok(associations)
}

/// Associations whose group contains `user`.
pub fn get_associations_for_user(conn: &Connection, user: &CoreUser) -> Result<Vec<Association>> {
    Ok(get_associations(conn)?
        .into_iter()
        .filter(|a| a.has_member(user))
        .collect())
}

pub fn get_association_by_id(
    conn: &Connection,
    association_id: Uuid,
) -> Result<Option<Association>> {
    Ok(conn
        .query_row(
            "SELECT id, name, group_id FROM associations_associations WHERE id = ?1",
            params![association_id],
            association_from_row,
        )
        .optional()?)
}

pub fn get_association_by_name(conn: &Connection, name: &str) -> Result<Option<Association>> {
    Ok(conn
        .query_row(
            "SELECT id, name, group_id FROM associations_associations WHERE name = ?1",
            params![name],
            association_from_row,
        )
        .optional()?)
}

pub fn create_association(conn: &Connection, association: &AssociationBase) -> Result<Association> {
    if get_association_by_name(conn, &association.name)?.is_some() {
        return Err(Error::BadRequest(
            "An association with this name already exists".into(),
        ));
    }
    if get_group_by_id(conn, &association.group_id)?.is_none() {
        return Err(Error::not_found("Group not found"));
    }

    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO associations_associations (id, name, group_id) VALUES (?1, ?2, ?3)",
        params![id, association.name, association.group_id],
    )?;

    get_association_by_id(conn, id)?.ok_or(Error::NewlyAddedObjectNotFound("association"))
}

pub fn update_association(
    conn: &Connection,
    association_id: Uuid,
    update: &AssociationUpdate,
) -> Result<()> {
    let association = get_association_by_id(conn, association_id)?
        .ok_or_else(|| Error::not_found("Association not found"))?;

    // A rename must not collide with another association
    if let Some(name) = update.name.as_deref().filter(|n| *n != association.name) {
        if get_association_by_name(conn, name)?.is_some() {
            return Err(Error::BadRequest(
                "An association with this name already exists".into(),
            ));
        }
    }
    if let Some(group_id) = update.group_id.as_deref() {
        if get_group_by_id(conn, group_id)?.is_none() {
            return Err(Error::not_found("Group not found"));
        }
    }

    conn.execute(
        "UPDATE associations_associations
         SET name = COALESCE(?2, name), group_id = COALESCE(?3, group_id)
         WHERE id = ?1",
        params![association_id, update.name, update.group_id],
    )?;
    Ok(())
}
