//! SQLite persistence.
//!
//! A single connection is shared behind a mutex. Every request runs its reads and
//! writes inside one transaction via [`Database::transaction`]; the closure is
//! synchronous, so the lock is never held across an await point.

mod migrations;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Transaction};

use crate::error::{Error, Result};

pub use migrations::run_migrations;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let db = Self::from_connection(conn)?;

        tracing::info!("Database opened at: {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        run_migrations(&mut conn)?;

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` in a transaction that commits when `f` returns `Ok` and rolls back otherwise.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run read-only queries outside of an explicit transaction.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        f(&conn)
    }
}

/// Implement `ToSql`/`FromSql` for an enum persisted as its `as_str()` text.
macro_rules! text_enum_sql {
    ($ty:ty) => {
        impl rusqlite::types::ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $ty {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value.as_str()?.parse().map_err(|e: crate::error::Error| {
                    rusqlite::types::FromSqlError::Other(Box::new(e))
                })
            }
        }
    };
}

pub(crate) use text_enum_sql;

/// `?1, ?2, ..., ?n` for an `IN (...)` list bound with `params_from_iter`.
pub(crate) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}
