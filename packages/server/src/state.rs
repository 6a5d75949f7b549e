use std::sync::Arc;

use classifieds_common::MediaStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub media_store: Arc<dyn MediaStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: AppConfig,
}
