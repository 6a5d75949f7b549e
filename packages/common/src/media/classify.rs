use thiserror::Error;

use super::kind::MediaKind;

/// Extensions accepted for upload (compared lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "mp4", "mov", "avi"];

/// MIME type used when an extension has no entry in the table.
pub const FALLBACK_MIMETYPE: &str = "application/octet-stream";

/// Outcome of classifying an uploaded filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Lowercased extension without the leading dot.
    pub extension: String,
    pub mimetype: &'static str,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("File has no extension")]
    MissingExtension,

    #[error("File extension '{0}' is not allowed")]
    DisallowedExtension(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
}

/// Classify an upload by its original filename.
///
/// Only the text after the final `.` is considered; the client-declared
/// content type is never consulted.
pub fn classify(filename: &str) -> Result<Classification, ClassifyError> {
    let (_, raw_ext) = filename
        .rsplit_once('.')
        .ok_or(ClassifyError::MissingExtension)?;
    let extension = raw_ext.to_ascii_lowercase();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ClassifyError::DisallowedExtension(extension));
    }

    let mimetype = mimetype_for_extension(&extension);
    let kind = kind_for_mimetype(mimetype)
        .ok_or_else(|| ClassifyError::UnsupportedMediaType(mimetype.to_string()))?;

    Ok(Classification {
        extension,
        mimetype,
        kind,
    })
}

/// Static extension to MIME table. `extension` must already be lowercase.
pub fn mimetype_for_extension(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/avi",
        "webm" => "video/webm",
        "flv" => "video/flv",
        "mp3" => "audio/mp3",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "pdf" => "application/pdf",
        _ => FALLBACK_MIMETYPE,
    }
}

/// Map a MIME type to the media category it is stored under, if any.
pub fn kind_for_mimetype(mimetype: &str) -> Option<MediaKind> {
    if mimetype.starts_with("image/") {
        Some(MediaKind::Photo)
    } else if mimetype.starts_with("video/") {
        Some(MediaKind::Video)
    } else {
        None
    }
}
