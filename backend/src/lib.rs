use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub mod auth;
pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod handlers;
pub mod listing;
pub mod models;
pub mod schema;
pub mod uploads;

use crate::config::AppConfig;
use crate::db::Store;

/// Room for the text fields of a listing form on top of the images.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
}

pub fn app(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(uploads::MAX_FILES * uploads::MAX_FILE_BYTES + FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/listings",
            get(handlers::list_listings)
                .post(handlers::create_listing)
                .layer(upload_limit.clone()),
        )
        .route(
            "/listings/:id",
            get(handlers::get_listing)
                .put(handlers::update_listing)
                .delete(handlers::delete_listing)
                .layer(upload_limit),
        )
        .route("/bookings", post(handlers::create_booking).get(handlers::my_bookings))
        .route("/bookings/listing/:id", get(handlers::listing_bookings))
        .route("/bookings/:id/status", put(handlers::update_booking_status))
        .nest_service(uploads::PUBLIC_PREFIX, ServeDir::new(&state.config.uploads_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
