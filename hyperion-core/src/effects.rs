//! Follow-up work produced by a mutation and carried out after commit.

use uuid::Uuid;

use crate::notification::Notification;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Effects {
    pub notifications: Vec<Notification>,
    /// The set of approved events may have changed; the calendar file must be rebuilt.
    pub refresh_ics: bool,
    /// Stored images of deleted objects, as `(directory, id)`.
    pub removed_images: Vec<(String, Uuid)>,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn remove_image(&mut self, directory: &str, id: Uuid) {
        self.removed_images.push((directory.to_string(), id));
    }

    pub fn merge(&mut self, other: Effects) {
        self.notifications.extend(other.notifications);
        self.refresh_ics |= other.refresh_ics;
        self.removed_images.extend(other.removed_images);
    }
}
