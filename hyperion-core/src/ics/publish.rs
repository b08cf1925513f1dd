//! Publication of the shared calendar file.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use tempfile::NamedTempFile;

use super::generate_calendar;
use crate::calendar::cruds::get_confirmed_events;
use crate::db::Database;
use crate::error::Result;

/// Rebuilds the calendar file from the approved events.
///
/// Rebuilds hold an exclusive lock on `<path>.lock` and read the committed
/// events while holding it, so the last rebuild to finish always reflects the
/// latest committed state. The file is replaced by rename, never rewritten in
/// place.
#[derive(Debug, Clone)]
pub struct IcsPublisher {
    path: PathBuf,
    domain: String,
}

/// The lock is released when the guard is dropped.
struct RebuildLock {
    _file: File,
}

impl IcsPublisher {
    pub fn new(path: impl Into<PathBuf>, domain: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            domain: domain.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock(&self) -> Result<RebuildLock> {
        fs::create_dir_all(self.directory())?;
        let file = File::create(self.lock_path())?;
        file.lock_exclusive()?;
        Ok(RebuildLock { _file: file })
    }

    /// Regenerate the file. Returns the number of events written.
    ///
    /// Blocks on the file lock; call it from a blocking context.
    pub fn rebuild(&self, db: &Database) -> Result<usize> {
        let _lock = self.lock()?;

        let events = db.read(get_confirmed_events)?;
        let content = generate_calendar(&events, &self.domain, Utc::now());

        let mut tmp = NamedTempFile::new_in(self.directory())?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::info!(
            "Calendar file {} rebuilt with {} events",
            self.path.display(),
            events.len()
        );
        Ok(events.len())
    }

    /// Read the published file, generating it first if it was never built.
    pub fn read_or_build(&self, db: &Database) -> Result<String> {
        if !self.path.exists() {
            self.rebuild(db)?;
        }
        Ok(fs::read_to_string(&self.path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::associations::{AssociationBase, create_association};
    use crate::calendar::{Decision, EventBase, service};
    use crate::groups::{AccountType, GroupType};
    use crate::users::{Membership, UserCreate, add_membership, create_user, get_user_by_id};
    use chrono::Duration;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn seed(db: &Database, names: &[&str], require_confirmation: bool) -> Vec<Uuid> {
        db.transaction(|tx| {
            let association = create_association(
                tx,
                &AssociationBase {
                    name: "Eclair".into(),
                    group_id: GroupType::Bde.id().into(),
                },
            )?;
            let user = create_user(
                tx,
                &UserCreate {
                    email: "bde@etu.ec-lyon.fr".into(),
                    name: "Name".into(),
                    firstname: "Firstname".into(),
                    account_type: AccountType::Student,
                },
            )?;
            add_membership(
                tx,
                &Membership {
                    user_id: user.id,
                    group_id: GroupType::Bde.id().into(),
                },
            )?;
            let user = get_user_by_id(tx, user.id)?
                .ok_or(crate::Error::NewlyAddedObjectNotFound("user"))?;

            let start = Utc::now();
            names
                .iter()
                .map(|name| {
                    let event = EventBase {
                        name: name.to_string(),
                        association_id: association.id,
                        start,
                        end: start + Duration::hours(2),
                        all_day: false,
                        location: "Foyer".into(),
                        description: None,
                        recurrence_rule: None,
                        ticket_url: None,
                        ticket_url_opening: None,
                    };
                    service::add_event(tx, &user, event, require_confirmation)
                        .map(|(created, _)| created.event.id)
                })
                .collect()
        })
        .unwrap()
    }

    #[test]
    fn test_rebuild_contains_only_approved_events() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        let ids = seed(&db, &["Pending"], true);
        let approved = db
            .transaction(|tx| {
                crate::calendar::cruds::set_decision(tx, ids[0], Decision::Approved)?;
                Ok(ids[0])
            })
            .unwrap();

        let publisher = IcsPublisher::new(dir.path().join("ics/calendar.ics"), "myecl.fr");
        assert_eq!(publisher.rebuild(&db).unwrap(), 1);

        let ics = fs::read_to_string(publisher.path()).unwrap();
        assert!(ics.contains(&format!("UID:{approved}@myecl.fr")));

        db.transaction(|tx| crate::calendar::cruds::set_decision(tx, approved, Decision::Declined))
            .unwrap();
        assert_eq!(publisher.rebuild(&db).unwrap(), 0);

        let ics = fs::read_to_string(publisher.path()).unwrap();
        assert!(!ics.contains("BEGIN:VEVENT"));
    }

    #[test]
    fn test_read_or_build_generates_missing_file() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        seed(&db, &["Gala", "Soiree"], false);

        let publisher = IcsPublisher::new(dir.path().join("calendar.ics"), "myecl.fr");
        assert!(!publisher.path().exists());

        let ics = publisher.read_or_build(&db).unwrap();

        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        assert!(publisher.path().exists());
    }

    #[test]
    fn test_concurrent_rebuilds_leave_a_complete_file() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        seed(&db, &["Un", "Deux", "Trois"], false);
        let publisher = IcsPublisher::new(dir.path().join("calendar.ics"), "myecl.fr");

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| publisher.rebuild(&db).unwrap());
            }
        });

        let ics = fs::read_to_string(publisher.path()).unwrap();
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 3);
        assert!(ics.trim_end().ends_with("END:VCALENDAR"));
    }
}
