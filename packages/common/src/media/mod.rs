mod classify;
mod kind;

pub mod identifier;

pub use classify::{
    ALLOWED_EXTENSIONS, Classification, ClassifyError, FALLBACK_MIMETYPE, classify,
    kind_for_mimetype, mimetype_for_extension,
};
pub use kind::{MediaKind, UnknownMediaKind};
