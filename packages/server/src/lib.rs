pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::Router;
use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::models::media::MEDIA_URL_PREFIX;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Classifieds API",
        version = "1.0.0",
        description = "API for the classifieds marketplace: accounts, listings and listing media"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::user::list_users,
        handlers::user::get_user,
        handlers::user::get_current_user,
        handlers::user::update_current_user,
        handlers::user::delete_current_user,
        handlers::listing::list_listings,
        handlers::listing::get_listing,
        handlers::listing::create_listing,
        handlers::listing::update_listing,
        handlers::listing::delete_listing,
        handlers::media::list_media,
        handlers::media::get_media,
        handlers::media::upload_media,
        handlers::media::reorder_media,
        handlers::media::delete_media,
    ),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Users", description = "User accounts"),
        (name = "Listings", description = "Listing CRUD and search"),
        (name = "Media", description = "Listing media upload, ordering and deletion"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let api = ApiDoc::openapi();
    let media_files = ServeDir::new(state.media_store.root());
    let cors = cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", routes::api_routes(&state.config))
        .with_state(state)
        .nest_service(MEDIA_URL_PREFIX, media_files)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
