pub mod auth;
pub mod listing;
pub mod media;
pub mod user;
