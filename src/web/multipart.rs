//! Reading text fields and file uploads out of multipart forms.

use crate::storage::UploadedFile;
use actix_multipart::{Field, Multipart};
use actix_web::{error, Error};
use futures::{StreamExt, TryStreamExt};
use std::collections::HashMap;

/// Text values and uploaded files of one multipart request.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub texts: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Trimmed text value of `name`, or an empty string.
    pub fn text(&self, name: &str) -> String {
        self.texts
            .get(name)
            .map(|v| v.trim().to_owned())
            .unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Drains the whole payload. Parts carrying a filename are files; an empty
/// file input (no filename or no bytes) counts as no upload. Any single part
/// larger than `max_bytes` rejects the request.
pub async fn read_multipart(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<MultipartForm, Error> {
    let mut form = MultipartForm::default();

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("read_multipart: malformed payload: {}", e);
        error::ErrorBadRequest("Error interpreting user input.")
    })? {
        let disposition = field.content_disposition();
        let name = match disposition.get_name() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        let filename = disposition.get_filename().map(|f| f.to_owned());

        let data = read_field(&mut field, max_bytes).await?;

        match filename {
            Some(filename) if !filename.is_empty() && !data.is_empty() => {
                form.files.insert(name, UploadedFile { filename, data });
            }
            Some(_) => {}
            None => {
                form.texts
                    .insert(name, String::from_utf8_lossy(&data).into_owned());
            }
        }
    }

    Ok(form)
}

async fn read_field(field: &mut Field, max_bytes: usize) -> Result<Vec<u8>, Error> {
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    while let Some(chunk) = field.next().await {
        let bytes = chunk.map_err(|e| {
            log::error!("read_multipart: field read error: {}", e);
            error::ErrorBadRequest("Error interpreting user input.")
        })?;
        if buf.len() + bytes.len() > max_bytes {
            return Err(error::ErrorPayloadTooLarge("Upload is too large."));
        }
        buf.extend_from_slice(&bytes);
    }
    Ok(buf)
}
