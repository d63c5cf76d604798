//! Avatar file storage.
//!
//! Uploaded images land in a flat uploads directory and are served back via
//! `ServeDir` under `/uploads`. The database stores the public URL path
//! (`/uploads/<file>`), not the filesystem path.

use std::io;
use std::path::{Path, PathBuf};

/// Maximum accepted avatar size.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Content types accepted for the avatar part.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

#[derive(Debug)]
pub enum UploadError {
    /// Content type outside [`ALLOWED_IMAGE_TYPES`].
    UnsupportedType(String),
    /// Payload exceeds [`MAX_AVATAR_BYTES`].
    TooLarge(usize),
    Io(io::Error),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::UnsupportedType(t) => write!(f, "unsupported image type: {}", t),
            UploadError::TooLarge(n) => write!(f, "image too large: {} bytes", n),
            UploadError::Io(e) => write!(f, "upload I/O error: {}", e),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<io::Error> for UploadError {
    fn from(e: io::Error) -> Self {
        UploadError::Io(e)
    }
}

/// Create the uploads directory if it does not exist.
pub fn ensure_uploads_dir(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Keep only characters that are safe in a filename; everything else
/// (separators, parent-dir dots, whitespace) becomes `_`.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build a unique avatar filename: `<user>_<millis>_<original-name>`.
fn avatar_filename(user_uuid: &str, original: &str) -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{}_{}_{}", user_uuid, millis, sanitize_filename(original))
}

/// Validate and persist an avatar image. Returns the public URL path to
/// store on the user record.
pub fn store_avatar(
    dir: &Path,
    user_uuid: &str,
    original_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<String, UploadError> {
    if !ALLOWED_IMAGE_TYPES.contains(&content_type) {
        return Err(UploadError::UnsupportedType(content_type.to_string()));
    }
    if bytes.len() > MAX_AVATAR_BYTES {
        return Err(UploadError::TooLarge(bytes.len()));
    }

    ensure_uploads_dir(dir)?;
    let filename = avatar_filename(user_uuid, original_name);
    std::fs::write(dir.join(&filename), bytes)?;
    Ok(format!("/uploads/{}", filename))
}

/// Delete a previously stored avatar, given the public URL path. Best-effort:
/// a missing file is not an error (the record is the source of truth).
pub fn remove_avatar(dir: &Path, public_path: &str) {
    let Some(filename) = public_path.strip_prefix("/uploads/") else {
        return;
    };
    // Re-check: stored paths are produced by store_avatar, but never trust
    // a value that could escape the uploads directory.
    let candidate: PathBuf = dir.join(filename);
    if candidate.parent() != Some(dir) {
        return;
    }
    if let Err(e) = std::fs::remove_file(&candidate) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %candidate.display(), error = %e, "Failed to remove old avatar");
        }
    }
}
