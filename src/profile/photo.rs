//! Checking, storing and removing uploaded profile photos.

use std::{ffi::OsStr, path::Path};

use axum::body::Bytes;
use time::OffsetDateTime;

use crate::{Error, user::UserID};

/// The largest photo, in bytes, that may be uploaded.
pub const MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024;

/// The file extensions accepted for profile photos, lower case.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// A photo file submitted with the profile form.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
    /// The name of the file on the client.
    pub file_name: String,
    pub bytes: Bytes,
}

/// Why an uploaded photo was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    TooLarge,
    UnsupportedType,
}

impl UploadError {
    pub fn message(self) -> &'static str {
        match self {
            UploadError::TooLarge => "Ukuran file terlalu besar, maksimal 5MB",
            UploadError::UnsupportedType => "File tidak didukung",
        }
    }
}

/// Check the size and file extension of `upload`.
///
/// Returns the lower case extension the stored file should use.
pub fn validate_upload(upload: &PhotoUpload) -> Result<&'static str, UploadError> {
    if upload.bytes.len() > MAX_PHOTO_SIZE {
        return Err(UploadError::TooLarge);
    }

    let extension = Path::new(&upload.file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or(UploadError::UnsupportedType)?;

    ALLOWED_EXTENSIONS
        .into_iter()
        .find(|allowed| *allowed == extension)
        .ok_or(UploadError::UnsupportedType)
}

/// Write `bytes` to a new file in `photo_dir` and return the file's name.
///
/// The name includes the user ID and the current time in nanoseconds, so a new upload never
/// overwrites the photo it replaces.
///
/// # Errors
///
/// Returns an [Error::PhotoStorageError] if the file could not be written, or the file on disk
/// does not have the expected size. A partially written file is removed.
pub async fn store_photo(
    photo_dir: &Path,
    user_id: UserID,
    extension: &str,
    bytes: &[u8],
) -> Result<String, Error> {
    let storage_error = |error: std::io::Error| Error::PhotoStorageError(error.to_string());

    tokio::fs::create_dir_all(photo_dir)
        .await
        .map_err(storage_error)?;

    let file_name = format!(
        "profile_{user_id}_{}.{extension}",
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    );
    let path = photo_dir.join(&file_name);

    if let Err(error) = tokio::fs::write(&path, bytes).await {
        remove_quietly(&path).await;
        return Err(storage_error(error));
    }

    let written = tokio::fs::metadata(&path)
        .await
        .map_err(storage_error)?
        .len();

    if written != bytes.len() as u64 {
        remove_quietly(&path).await;
        return Err(Error::PhotoStorageError(format!(
            "wrote {written} of {} bytes",
            bytes.len()
        )));
    }

    tracing::debug!("stored {} byte photo {}", written, path.display());

    Ok(file_name)
}

/// Delete the photo `file_name` from `photo_dir`.
///
/// # Errors
///
/// Returns an [Error::PhotoStorageError] if `file_name` is not a plain file name or the file
/// could not be deleted.
pub async fn remove_photo(photo_dir: &Path, file_name: &str) -> Result<(), Error> {
    if Path::new(file_name).file_name() != Some(OsStr::new(file_name)) {
        return Err(Error::PhotoStorageError(format!(
            "invalid photo file name \"{file_name}\""
        )));
    }

    tokio::fs::remove_file(photo_dir.join(file_name))
        .await
        .map_err(|error| Error::PhotoStorageError(error.to_string()))
}

async fn remove_quietly(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await {
        tracing::warn!("could not remove {}: {error}", path.display());
    }
}
