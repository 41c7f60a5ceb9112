use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{Booking, BookingStatus, Listing};

#[derive(Default)]
struct Collections {
    listings: Vec<Listing>,
    bookings: Vec<Booking>,
}

/// In-process store. Every operation holds one lock, which gives the same
/// atomicity as the Postgres transactions. Lists come back newest first.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Store for MemoryStore {
    fn insert_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        self.lock()?.listings.push(listing.clone());
        Ok(())
    }

    fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        Ok(self.lock()?.listings.iter().find(|l| l.id == id).cloned())
    }

    fn list_listings(&self, host: Option<&str>) -> Result<Vec<Listing>, StoreError> {
        Ok(self
            .lock()?
            .listings
            .iter()
            .rev()
            .filter(|l| host.map_or(true, |h| l.host == h))
            .cloned()
            .collect())
    }

    fn update_listing(&self, listing: &Listing, replace_room_types: bool) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let stored = inner
            .listings
            .iter_mut()
            .find(|l| l.id == listing.id)
            .ok_or(StoreError::NotFound("Listing"))?;
        let room_types = if replace_room_types {
            listing.room_types.clone()
        } else {
            std::mem::take(&mut stored.room_types)
        };
        *stored = Listing {
            room_types,
            ..listing.clone()
        };
        Ok(())
    }

    fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.lock()?.bookings.iter().find(|b| b.id == id).cloned())
    }

    fn bookings_for_guest(&self, guest_id: &str) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .lock()?
            .bookings
            .iter()
            .rev()
            .filter(|b| b.guest_id == guest_id)
            .cloned()
            .collect())
    }

    fn bookings_for_listing(&self, listing_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .lock()?
            .bookings
            .iter()
            .rev()
            .filter(|b| b.listing_id == listing_id)
            .cloned()
            .collect())
    }

    fn set_booking_status(
        &self,
        id: Uuid,
        status: &BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<Booking, StoreError> {
        let mut inner = self.lock()?;
        let booking = inner
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound("Booking"))?;
        booking.status = status.clone();
        booking.updated_at = at;
        Ok(booking.clone())
    }

    fn reserve_and_insert_booking(
        &self,
        booking: &Booking,
        room_position: usize,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let listing = inner
            .listings
            .iter_mut()
            .find(|l| l.id == booking.listing_id)
            .ok_or(StoreError::NotFound("Listing"))?;
        let room = listing
            .room_types
            .get_mut(room_position)
            .filter(|rt| rt.category == booking.room_type)
            .ok_or(StoreError::SoldOut)?;
        if room.available <= 0 {
            return Err(StoreError::SoldOut);
        }
        room.available -= 1;
        inner.bookings.push(booking.clone());
        Ok(())
    }

    fn cancel_bookings_and_delete_listing(
        &self,
        listing_id: Uuid,
        notice: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let index = inner
            .listings
            .iter()
            .position(|l| l.id == listing_id)
            .ok_or(StoreError::NotFound("Listing"))?;
        let mut cancelled = 0;
        for booking in inner.bookings.iter_mut().filter(|b| b.listing_id == listing_id) {
            booking.status = BookingStatus::Cancelled;
            booking.special_requests.push_str(notice);
            booking.updated_at = at;
            cancelled += 1;
        }
        inner.listings.remove(index);
        Ok(cancelled)
    }
}
