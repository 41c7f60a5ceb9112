use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Listing};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("no rooms left for the requested room type")]
    SoldOut,
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Persistence for listings (with their embedded room types) and bookings.
///
/// Listings and bookings are separate collections related only by id;
/// the two multi-record operations below are the only places that touch both.
pub trait Store: Send + Sync {
    fn insert_listing(&self, listing: &Listing) -> Result<(), StoreError>;

    fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;

    fn list_listings(&self, host: Option<&str>) -> Result<Vec<Listing>, StoreError>;

    /// Overwrites the listing's fields. Room types are only rewritten when
    /// `replace_room_types` is set, so concurrent availability decrements survive
    /// unrelated edits.
    fn update_listing(&self, listing: &Listing, replace_room_types: bool) -> Result<(), StoreError>;

    fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    fn bookings_for_guest(&self, guest_id: &str) -> Result<Vec<Booking>, StoreError>;

    fn bookings_for_listing(&self, listing_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    fn set_booking_status(
        &self,
        id: Uuid,
        status: &BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<Booking, StoreError>;

    /// Decrements `available` on the room type at `room_position` of the booking's
    /// listing, only if it is still positive, and inserts the booking in the same
    /// transaction. Returns `SoldOut` and changes nothing when no room is left.
    fn reserve_and_insert_booking(&self, booking: &Booking, room_position: usize)
        -> Result<(), StoreError>;

    /// Cancels every booking of the listing (appending `notice` to its special
    /// requests) and deletes the listing, atomically. Returns how many bookings
    /// were cancelled.
    fn cancel_bookings_and_delete_listing(
        &self,
        listing_id: Uuid,
        notice: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError>;
}
