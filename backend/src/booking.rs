use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::StatusValidation;
use crate::db::{Store, StoreError};
use crate::error::AppError;
use crate::models::{Booking, BookingStatus, HotelSummary, RoomCategory};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Appended to the special requests of every booking cancelled by a listing deletion.
pub const CANCELLATION_NOTICE: &str = "\n\n[SYSTEM MESSAGE] This booking was automatically cancelled because the hotel has been removed by the host.";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub listing_id: String,
    pub room_type: String,
    pub check_in: String,
    pub check_out: String,
    #[serde(deserialize_with = "guest_count")]
    pub guests: i32,
    #[serde(default)]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: Option<String>,
}

/// A guest's booking together with the hotel it belongs to, if that still exists.
#[derive(Debug, Clone, Serialize)]
pub struct GuestBooking {
    #[serde(flatten)]
    pub booking: Booking,
    pub hotel: Option<HotelSummary>,
}

/// Form-driven clients send numbers as strings; accept either.
fn guest_count<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| de::Error::custom("guests must be a whole number"))
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_stay_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

/// Started days between the two instants, rounded up.
pub fn nights_between(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> i64 {
    let seconds = (check_out - check_in).num_seconds();
    seconds.div_euclid(SECONDS_PER_DAY) + i64::from(seconds.rem_euclid(SECONDS_PER_DAY) > 0)
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("{} not found", what)))
}

pub fn create_booking(
    store: &dyn Store,
    guest_id: &str,
    request: CreateBookingRequest,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let listing_id = parse_id(&request.listing_id, "Hotel")?;
    let listing = store
        .find_listing(listing_id)?
        .ok_or_else(|| AppError::NotFound("Hotel not found".to_string()))?;

    let category: RoomCategory = request
        .room_type
        .parse()
        .map_err(|_| AppError::invalid("Room type not found"))?;
    let (position, room) = listing
        .room_type(category)
        .ok_or_else(|| AppError::invalid("Room type not found"))?;
    if room.available <= 0 {
        return Err(AppError::Conflict("No rooms available for this type".to_string()));
    }

    let check_in = parse_stay_date(&request.check_in)
        .ok_or_else(|| AppError::invalid("Check-in date is invalid"))?;
    let check_out = parse_stay_date(&request.check_out)
        .ok_or_else(|| AppError::invalid("Check-out date is invalid"))?;
    if check_out <= check_in {
        log::warn!(
            "Rejected booking for listing {} with check-out {} not after check-in {}",
            listing_id,
            check_out,
            check_in
        );
        return Err(AppError::invalid("Check-out must be after check-in"));
    }
    if request.guests < 1 {
        return Err(AppError::invalid("At least one guest is required"));
    }

    let nights = nights_between(check_in, check_out);
    let booking = Booking {
        id: Uuid::new_v4(),
        listing_id,
        guest_id: guest_id.to_string(),
        room_type: category,
        check_in,
        check_out,
        guests: request.guests,
        total_price: nights as f64 * room.price,
        special_requests: request.special_requests.unwrap_or_default(),
        status: BookingStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    match store.reserve_and_insert_booking(&booking, position) {
        Ok(()) => {}
        Err(StoreError::SoldOut) => {
            log::warn!("Last {} room of listing {} was taken concurrently", category, listing_id);
            return Err(StoreError::SoldOut.into());
        }
        Err(e) => return Err(e.into()),
    }
    log::info!(
        "Created booking {} for listing {} ({} nights, total {})",
        booking.id,
        listing_id,
        nights,
        booking.total_price
    );
    Ok(booking)
}

pub fn update_booking_status(
    store: &dyn Store,
    caller: &str,
    booking_id: &str,
    request: StatusUpdateRequest,
    validation: StatusValidation,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let booking_id = parse_id(booking_id, "Booking")?;
    let booking = store
        .find_booking(booking_id)?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    let listing = store
        .find_listing(booking.listing_id)?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;
    if !listing.is_hosted_by(caller) {
        log::warn!("User {} tried to update booking {} of listing {}", caller, booking_id, listing.id);
        return Err(AppError::Unauthorized("Not authorized to update this booking".to_string()));
    }

    let status = request
        .status
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(BookingStatus::from)
        .ok_or_else(|| AppError::invalid("Status is required"))?;
    if validation == StatusValidation::Strict && !status.is_known() {
        return Err(AppError::invalid(format!(
            "Invalid status `{}` (expected pending, confirmed, cancelled or completed)",
            status
        )));
    }

    let updated = store.set_booking_status(booking_id, &status, now)?;
    log::info!("Booking {} status set to {}", booking_id, updated.status);
    Ok(updated)
}

pub fn guest_bookings(store: &dyn Store, guest_id: &str) -> Result<Vec<GuestBooking>, AppError> {
    let mut hotels: HashMap<Uuid, Option<HotelSummary>> = HashMap::new();
    let mut result = Vec::new();
    for booking in store.bookings_for_guest(guest_id)? {
        let hotel = match hotels.get(&booking.listing_id) {
            Some(cached) => cached.clone(),
            None => {
                let summary = store.find_listing(booking.listing_id)?.map(|l| l.summary());
                hotels.insert(booking.listing_id, summary.clone());
                summary
            }
        };
        result.push(GuestBooking { booking, hotel });
    }
    Ok(result)
}

pub fn listing_bookings(store: &dyn Store, caller: &str, listing_id: &str) -> Result<Vec<Booking>, AppError> {
    let listing_id = parse_id(listing_id, "Listing")?;
    let listing = store
        .find_listing(listing_id)?
        .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;
    if !listing.is_hosted_by(caller) {
        log::warn!("User {} tried to read bookings of listing {}", caller, listing_id);
        return Err(AppError::Unauthorized(
            "Not authorized to view bookings for this listing".to_string(),
        ));
    }
    Ok(store.bookings_for_listing(listing_id)?)
}
