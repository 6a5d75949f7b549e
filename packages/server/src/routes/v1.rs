use axum::{
    Router,
    routing::{get, post, put},
};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .merge(user_routes())
        .nest("/listings", listing_routes(config))
        .nest("/media", media_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::user::list_users))
        .route("/users/{id}", get(handlers::user::get_user))
        .route(
            "/user",
            get(handlers::user::get_current_user)
                .put(handlers::user::update_current_user)
                .delete(handlers::user::delete_current_user),
        )
}

fn listing_routes(config: &AppConfig) -> Router<AppState> {
    let crud = Router::new()
        .route(
            "/",
            get(handlers::listing::list_listings).post(handlers::listing::create_listing),
        )
        .route(
            "/{id}",
            get(handlers::listing::get_listing)
                .put(handlers::listing::update_listing)
                .delete(handlers::listing::delete_listing),
        )
        .route("/{id}/media/order", put(handlers::media::reorder_media));

    let upload = Router::new()
        .route("/{id}/media", post(handlers::media::upload_media))
        .layer(handlers::media::media_upload_body_limit(&config.storage));

    crud.merge(upload)
}

fn media_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::media::list_media))
        .route(
            "/{id}",
            get(handlers::media::get_media).delete(handlers::media::delete_media),
        )
}
