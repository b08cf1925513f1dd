//! Storage of uploaded images under the data directory.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Largest accepted upload.
pub const MAX_IMAGE_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Jpeg,
    Png,
    Webp,
}

impl ContentType {
    pub const IMAGES: [ContentType; 3] = [ContentType::Jpeg, ContentType::Png, ContentType::Webp];

    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Jpeg => "image/jpeg",
            ContentType::Png => "image/png",
            ContentType::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ContentType::Jpeg => "jpg",
            ContentType::Png => "png",
            ContentType::Webp => "webp",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::IMAGES.into_iter().find(|t| t.mime() == mime)
    }
}

/// Files are stored as `<root>/<directory>/<id>.<ext>`; one file per id.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, directory: &str, id: Uuid, content_type: ContentType) -> PathBuf {
        self.root
            .join(directory)
            .join(format!("{id}.{}", content_type.extension()))
    }

    /// Check and store an upload, replacing any earlier file for `id`.
    pub fn save_image(
        &self,
        directory: &str,
        id: Uuid,
        mime: Option<&str>,
        data: &[u8],
    ) -> Result<()> {
        let content_type = mime.and_then(ContentType::from_mime).ok_or_else(|| {
            Error::BadRequest(format!(
                "Invalid file format, supported {}",
                ContentType::IMAGES.map(|t| t.mime()).join(", ")
            ))
        })?;
        if data.len() > MAX_IMAGE_SIZE {
            return Err(Error::BadRequest(format!(
                "File size is too big. Limit is {} MB",
                MAX_IMAGE_SIZE / (1024 * 1024)
            )));
        }

        let dir = self.root.join(directory);
        fs::create_dir_all(&dir)?;
        self.remove_image(directory, id)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(data)?;
        tmp.persist(self.file_path(directory, id, content_type))
            .map_err(|e| e.error)?;

        tracing::debug!(directory, %id, mime = content_type.mime(), "Stored image");
        Ok(())
    }

    fn find_image(&self, directory: &str, id: Uuid) -> Option<(ContentType, PathBuf)> {
        ContentType::IMAGES
            .into_iter()
            .map(|t| (t, self.file_path(directory, id, t)))
            .find(|(_, path)| path.is_file())
    }

    pub fn read_image(&self, directory: &str, id: Uuid) -> Result<(ContentType, Vec<u8>)> {
        let (content_type, path) = self
            .find_image(directory, id)
            .ok_or_else(|| Error::not_found("The file does not exist"))?;
        Ok((content_type, fs::read(path)?))
    }

    pub fn remove_image(&self, directory: &str, id: Uuid) -> Result<()> {
        while let Some((_, path)) = self.find_image(directory, id) {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
