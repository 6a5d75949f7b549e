pub mod cascade;
pub mod media;
