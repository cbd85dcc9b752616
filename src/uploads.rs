//! Photo storage for posts. Files land in the uploads directory under a
//! generated name; the database row only ever stores that filename.

use std::path::Path;

use crate::error::{AppError, AppResult};

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Lowercased extension of the client-supplied filename, if it is in the
/// allow-list.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Some(ext)
    } else {
        None
    }
}

/// Write an uploaded photo to disk. The stored name is generated from a
/// random identifier plus a timestamp, so client filenames never collide
/// or reach the filesystem. Returns the generated filename.
pub fn save_photo(uploads_dir: &Path, original_name: &str, data: &[u8]) -> AppResult<String> {
    let ext = allowed_extension(original_name).ok_or(AppError::UnsupportedFileType)?;

    let filename = format!(
        "{}-{}.{}",
        uuid::Uuid::new_v4(),
        chrono::Utc::now().timestamp(),
        ext
    );

    std::fs::create_dir_all(uploads_dir)
        .map_err(|e| AppError::Internal(format!("Failed to create uploads dir: {}", e)))?;
    std::fs::write(uploads_dir.join(&filename), data)
        .map_err(|e| AppError::Internal(format!("Failed to save photo: {}", e)))?;

    Ok(filename)
}

/// Best-effort removal, used when a post is deleted or a row insert fails
/// after the file was already written. A leftover file is logged, not fatal.
pub fn remove_photo(uploads_dir: &Path, filename: &str) {
    if !is_safe_filename(filename) {
        return;
    }
    if let Err(e) = std::fs::remove_file(uploads_dir.join(filename)) {
        tracing::warn!("Could not remove photo {}: {}", filename, e);
    }
}

/// A stored filename must be a single path component.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}
