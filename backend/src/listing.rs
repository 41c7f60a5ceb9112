use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::booking::{parse_id, CANCELLATION_NOTICE};
use crate::db::Store;
use crate::error::AppError;
use crate::form::ListingForm;
use crate::models::Listing;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionSummary {
    pub msg: String,
    pub cancelled_bookings: usize,
    pub hotel_name: String,
}

pub fn list_listings(store: &dyn Store, host: Option<&str>) -> Result<Vec<Listing>, AppError> {
    Ok(store.list_listings(host)?)
}

pub fn get_listing(store: &dyn Store, id: &str) -> Result<Listing, AppError> {
    let id = parse_id(id, "Listing")?;
    store
        .find_listing(id)?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))
}

pub fn create_listing(
    store: &dyn Store,
    host: &str,
    form: ListingForm,
    images: Vec<String>,
    now: DateTime<Utc>,
) -> Result<Listing, AppError> {
    let listing = form.into_new_listing(host, images, now)?;
    store.insert_listing(&listing)?;
    log::info!(
        "Listing {} ({}) created by {} with {} room types",
        listing.id,
        listing.hotel_name,
        host,
        listing.room_types.len()
    );
    Ok(listing)
}

/// Applies the supplied fields; newly uploaded images replace the existing set.
pub fn update_listing(
    store: &dyn Store,
    caller: &str,
    id: &str,
    form: ListingForm,
    new_images: Vec<String>,
) -> Result<Listing, AppError> {
    let mut listing = get_listing(store, id)?;
    if !listing.is_hosted_by(caller) {
        log::warn!("User {} tried to update listing {}", caller, listing.id);
        return Err(AppError::Unauthorized("User not authorized".to_string()));
    }
    let replace_room_types = form.apply_to(&mut listing)?;
    if !new_images.is_empty() {
        listing.images = new_images;
    }
    store.update_listing(&listing, replace_room_types)?;
    log::info!("Listing {} updated by host", listing.id);
    // Re-read so untouched room types carry their current availability.
    get_listing(store, id)
}

pub fn delete_listing(
    store: &dyn Store,
    caller: &str,
    id: &str,
    now: DateTime<Utc>,
) -> Result<DeletionSummary, AppError> {
    let id = parse_id(id, "Hotel")?;
    let listing = store
        .find_listing(id)?
        .ok_or_else(|| AppError::NotFound("Hotel not found".to_string()))?;
    if !listing.is_hosted_by(caller) {
        log::warn!("User {} tried to delete listing {} hosted by {}", caller, id, listing.host);
        return Err(AppError::Unauthorized("Not authorized to delete this hotel".to_string()));
    }

    let cancelled_bookings = store.cancel_bookings_and_delete_listing(id, CANCELLATION_NOTICE, now)?;
    log::info!(
        "Deleted listing {} ({}), cancelled {} bookings",
        id,
        listing.hotel_name,
        cancelled_bookings
    );
    Ok(DeletionSummary {
        msg: "Hotel deleted successfully".to_string(),
        cancelled_bookings,
        hotel_name: listing.hotel_name,
    })
}
