use uuid::Uuid;

/// Generate an opaque, collision-resistant token for a stored file.
///
/// Backed by a random (v4) UUID. No uniqueness check against storage is made.
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Compose the on-disk filename for a freshly generated identifier.
pub fn stored_filename(extension: &str) -> String {
    format!("{}.{}", generate(), extension)
}
