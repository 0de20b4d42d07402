//! Local filesystem storage backend.

use super::{StorageError, UploadedFile};
use actix_web::web;
use std::fs;
use std::path::{Path, PathBuf};

/// Local filesystem storage backend.
///
/// Every stored file lives directly under `base_path` with a generated name,
/// so the database only ever holds that bare name.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// The directory is not touched until the first upload.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn path_of(&self, stored_name: &str) -> PathBuf {
        self.base_path.join(stored_name)
    }

    pub fn exists(&self, stored_name: &str) -> bool {
        self.path_of(stored_name).is_file()
    }

    /// Writes the upload under a fresh name and returns that name.
    ///
    /// Creates the upload directory when missing. The write is not atomic; a
    /// failure part way through can leave a truncated file behind.
    pub async fn save(&self, file: UploadedFile) -> Result<String, StorageError> {
        let stored_name = change_filename(&file.filename);
        let dir = self.base_path.clone();
        let path = self.path_of(&stored_name);
        log::info!(
            "LocalStorage: storing {:?} ({} bytes) as {:?}",
            file.filename,
            file.data.len(),
            path
        );

        web::block(move || {
            if !dir.is_dir() {
                fs::create_dir_all(&dir)?;
            }
            fs::write(&path, file.data)
        })
        .await
        .map_err(|e| StorageError::Blocking(e.to_string()))??;

        Ok(stored_name)
    }
}

/// Generates a collision resistant name for an upload:
/// local timestamp, a random v4 uuid and the original extension.
///
/// `trailer.MP4` becomes something like
/// `20240131235959` + `3f2b...c1` + `.MP4`.
pub fn change_filename(original: &str) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let unique = uuid::Uuid::new_v4().simple();
    format!("{}{}{}", stamp, unique, extension_of(original))
}

/// The extension of `original` including its dot, or an empty string when it
/// has none or it contains anything but ASCII letters and digits.
fn extension_of(original: &str) -> String {
    match Path::new(original).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!(".{}", ext)
        }
        _ => String::new(),
    }
}
