use std::sync::Arc;

use anyhow::Result;
use hyperion_core::files::FileStore;
use hyperion_core::ics::IcsPublisher;
use hyperion_core::notification::NotificationTool;
use hyperion_core::{Database, Effects, Settings};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Arc<Settings>,
    pub notifier: Arc<dyn NotificationTool>,
    pub ics: IcsPublisher,
    pub files: FileStore,
}

impl AppState {
    pub fn new(settings: Settings, notifier: Arc<dyn NotificationTool>) -> Result<Self> {
        let db = Database::open(&settings.database_path)?;
        Ok(Self::with_database(db, settings, notifier))
    }

    pub fn with_database(
        db: Database,
        settings: Settings,
        notifier: Arc<dyn NotificationTool>,
    ) -> Self {
        let ics = IcsPublisher::new(
            settings.ics_path.clone(),
            settings.school.application_domain_name.clone(),
        );
        let files = FileStore::new(settings.data_dir.clone());

        AppState {
            db,
            settings: Arc::new(settings),
            notifier,
            ics,
            files,
        }
    }

    /// Carry out the follow-up work of a committed transaction.
    ///
    /// The transaction already committed, so failures are logged rather than
    /// turned into an error response.
    pub async fn apply(&self, effects: Effects) {
        for notification in &effects.notifications {
            if let Err(e) = self.notifier.dispatch(notification).await {
                tracing::warn!(
                    title = %notification.message.title,
                    "Failed to send notification: {e}"
                );
            }
        }

        if effects.refresh_ics {
            if let Err(e) = self.rebuild_ics().await {
                tracing::error!("Failed to rebuild the calendar file: {e:#}");
            }
        }

        for (directory, id) in &effects.removed_images {
            if let Err(e) = self.files.remove_image(directory, *id) {
                tracing::warn!(%directory, %id, "Failed to remove image: {e}");
            }
        }
    }

    /// Rebuild the calendar file on the blocking pool.
    pub async fn rebuild_ics(&self) -> Result<usize> {
        let db = self.db.clone();
        let ics = self.ics.clone();
        let written = tokio::task::spawn_blocking(move || ics.rebuild(&db)).await??;
        Ok(written)
    }

    /// The calendar document, built on first request.
    pub async fn read_ics(&self) -> Result<String> {
        let db = self.db.clone();
        let ics = self.ics.clone();
        let content = tokio::task::spawn_blocking(move || ics.read_or_build(&db)).await??;
        Ok(content)
    }
}
