use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::booking::{self, CreateBookingRequest, GuestBooking, StatusUpdateRequest};
use crate::error::AppError;
use crate::form::ListingForm;
use crate::listing::{self, DeletionSummary};
use crate::models::{Booking, Listing};
use crate::uploads::{self, ListingUpload};
use crate::AppState;

/// Runs a store operation on the blocking pool; the diesel store is synchronous.
async fn blocking<T, F>(op: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op).await?
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::invalid(rejection.body_text()))
}

async fn read_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ListingUpload, AppError> {
    let multipart = multipart.map_err(|rejection| AppError::invalid(rejection.body_text()))?;
    uploads::read_listing_upload(multipart, std::path::Path::new(&state.config.uploads_dir)).await
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.config.app_env,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub host: Option<String>,
}

pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Vec<Listing>>, AppError> {
    let store = state.store.clone();
    let listings = blocking(move || listing::list_listings(store.as_ref(), query.host.as_deref())).await?;
    Ok(Json(listings))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Listing>, AppError> {
    let store = state.store.clone();
    let listing = blocking(move || listing::get_listing(store.as_ref(), &id)).await?;
    Ok(Json(listing))
}

pub async fn create_listing(
    State(state): State<AppState>,
    AuthUser(host): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Listing>, AppError> {
    let upload = read_upload(&state, multipart).await?;
    let form = ListingForm::decode(&upload.fields);
    let images = upload.public_paths();

    let store = state.store.clone();
    let created = blocking(move || listing::create_listing(store.as_ref(), &host, form, images, Utc::now())).await;
    if created.is_err() {
        uploads::discard(&upload.images).await;
    }
    created.map(Json)
}

pub async fn update_listing(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Listing>, AppError> {
    let upload = read_upload(&state, multipart).await?;
    let form = ListingForm::decode(&upload.fields);
    let images = upload.public_paths();

    let store = state.store.clone();
    let updated = blocking(move || listing::update_listing(store.as_ref(), &caller, &id, form, images)).await;
    if updated.is_err() {
        uploads::discard(&upload.images).await;
    }
    updated.map(Json)
}

pub async fn delete_listing(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeletionSummary>, AppError> {
    let store = state.store.clone();
    let summary = blocking(move || listing::delete_listing(store.as_ref(), &caller, &id, Utc::now())).await?;
    Ok(Json(summary))
}

pub async fn create_booking(
    State(state): State<AppState>,
    AuthUser(guest): AuthUser,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let request = json_body(payload)?;
    let store = state.store.clone();
    let booking = blocking(move || booking::create_booking(store.as_ref(), &guest, request, Utc::now())).await?;
    Ok(Json(booking))
}

pub async fn my_bookings(
    State(state): State<AppState>,
    AuthUser(guest): AuthUser,
) -> Result<Json<Vec<GuestBooking>>, AppError> {
    let store = state.store.clone();
    let bookings = blocking(move || booking::guest_bookings(store.as_ref(), &guest)).await?;
    Ok(Json(bookings))
}

pub async fn listing_bookings(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let store = state.store.clone();
    let bookings = blocking(move || booking::listing_bookings(store.as_ref(), &caller, &id)).await?;
    Ok(Json(bookings))
}

pub async fn update_booking_status(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let request = json_body(payload)?;
    let validation = state.config.booking_status_validation;
    let store = state.store.clone();
    let booking = blocking(move || {
        booking::update_booking_status(store.as_ref(), &caller, &id, request, validation, Utc::now())
    })
    .await?;
    Ok(Json(booking))
}
