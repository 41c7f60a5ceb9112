use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{Booking, BookingStatus, ContactInfo, Listing, Policies, RoomType};
use crate::schema::{bookings, listings, room_types};

type PgPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = listings)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ListingRow {
    id: Uuid,
    host: String,
    hotel_name: String,
    description: String,
    address: String,
    city: String,
    country: String,
    star_rating: i32,
    amenities: Vec<String>,
    images: Vec<String>,
    contact_phone: String,
    contact_email: String,
    contact_website: String,
    policy_check_in: String,
    policy_check_out: String,
    policy_cancellation: String,
    policy_pets: String,
    policy_smoking: String,
    created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = room_types)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct RoomTypeRow {
    listing_id: Uuid,
    position: i32,
    category: String,
    price: f64,
    currency: String,
    capacity: i32,
    available: i32,
    description: String,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct BookingRow {
    id: Uuid,
    listing_id: Uuid,
    guest_id: String,
    room_type: String,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    guests: i32,
    total_price: f64,
    special_requests: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Listing> for ListingRow {
    fn from(l: &Listing) -> Self {
        Self {
            id: l.id,
            host: l.host.clone(),
            hotel_name: l.hotel_name.clone(),
            description: l.description.clone(),
            address: l.address.clone(),
            city: l.city.clone(),
            country: l.country.clone(),
            star_rating: l.star_rating,
            amenities: l.amenities.clone(),
            images: l.images.clone(),
            contact_phone: l.contact_info.phone.clone(),
            contact_email: l.contact_info.email.clone(),
            contact_website: l.contact_info.website.clone(),
            policy_check_in: l.policies.check_in.clone(),
            policy_check_out: l.policies.check_out.clone(),
            policy_cancellation: l.policies.cancellation.clone(),
            policy_pets: l.policies.pet_policy.clone(),
            policy_smoking: l.policies.smoking_policy.clone(),
            created_at: l.created_at,
        }
    }
}

impl ListingRow {
    fn into_listing(self, rooms: Vec<RoomTypeRow>) -> Result<Listing, StoreError> {
        let room_types = rooms
            .into_iter()
            .map(RoomTypeRow::into_room_type)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Listing {
            id: self.id,
            host: self.host,
            hotel_name: self.hotel_name,
            description: self.description,
            address: self.address,
            city: self.city,
            country: self.country,
            star_rating: self.star_rating,
            room_types,
            amenities: self.amenities,
            images: self.images,
            contact_info: ContactInfo {
                phone: self.contact_phone,
                email: self.contact_email,
                website: self.contact_website,
            },
            policies: Policies {
                check_in: self.policy_check_in,
                check_out: self.policy_check_out,
                cancellation: self.policy_cancellation,
                pet_policy: self.policy_pets,
                smoking_policy: self.policy_smoking,
            },
            created_at: self.created_at,
        })
    }
}

impl RoomTypeRow {
    fn for_listing(listing: &Listing) -> Vec<RoomTypeRow> {
        listing
            .room_types
            .iter()
            .enumerate()
            .map(|(position, rt)| RoomTypeRow {
                listing_id: listing.id,
                position: position as i32,
                category: rt.category.as_str().to_string(),
                price: rt.price,
                currency: rt.currency.as_str().to_string(),
                capacity: rt.capacity,
                available: rt.available,
                description: rt.description.clone(),
            })
            .collect()
    }

    fn into_room_type(self) -> Result<RoomType, StoreError> {
        Ok(RoomType {
            category: self.category.parse().map_err(StoreError::Corrupt)?,
            price: self.price,
            currency: self.currency.parse().map_err(StoreError::Corrupt)?,
            capacity: self.capacity,
            available: self.available,
            description: self.description,
        })
    }
}

impl From<&Booking> for BookingRow {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id,
            listing_id: b.listing_id,
            guest_id: b.guest_id.clone(),
            room_type: b.room_type.as_str().to_string(),
            check_in: b.check_in,
            check_out: b.check_out,
            guests: b.guests,
            total_price: b.total_price,
            special_requests: b.special_requests.clone(),
            status: b.status.as_str().to_string(),
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            listing_id: row.listing_id,
            guest_id: row.guest_id,
            room_type: row.room_type.parse().map_err(StoreError::Corrupt)?,
            check_in: row.check_in,
            check_out: row.check_out,
            guests: row.guests,
            total_price: row.total_price,
            special_requests: row.special_requests,
            status: BookingStatus::from(row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, StoreError> {
    rows.into_iter().map(Booking::try_from).collect()
}

/// Postgres-backed store over an r2d2 pool of diesel connections.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Opens the pool and runs a test query so a bad `DATABASE_URL` fails at startup.
    pub fn connect(database_url: &str, pool_size: u32) -> Result<Self, StoreError> {
        log::info!("Connecting to database (pool size {})", pool_size);
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder().max_size(pool_size).build(manager)?;
        let store = Self { pool };
        let test_query: i32 =
            diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
                .get_result(&mut store.conn()?)?;
        log::info!("Database test query result: {}", test_query);
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        Ok(self.pool.get()?)
    }

    fn attach_room_types(
        conn: &mut PgConnection,
        rows: Vec<ListingRow>,
    ) -> Result<Vec<Listing>, StoreError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut rooms: HashMap<Uuid, Vec<RoomTypeRow>> = HashMap::new();
        for room in room_types::table
            .filter(room_types::listing_id.eq_any(ids))
            .order((room_types::listing_id, room_types::position))
            .select(RoomTypeRow::as_select())
            .load(conn)?
        {
            rooms.entry(room.listing_id).or_default().push(room);
        }
        rows.into_iter()
            .map(|row| {
                let own = rooms.remove(&row.id).unwrap_or_default();
                row.into_listing(own)
            })
            .collect()
    }
}

impl Store for PgStore {
    fn insert_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            diesel::insert_into(listings::table)
                .values(ListingRow::from(listing))
                .execute(conn)?;
            diesel::insert_into(room_types::table)
                .values(RoomTypeRow::for_listing(listing))
                .execute(conn)?;
            Ok(())
        })
    }

    fn find_listing(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        let mut conn = self.conn()?;
        let row = listings::table
            .find(id)
            .select(ListingRow::as_select())
            .first(&mut conn)
            .optional()?;
        match row {
            Some(row) => Ok(Self::attach_room_types(&mut conn, vec![row])?.pop()),
            None => Ok(None),
        }
    }

    fn list_listings(&self, host: Option<&str>) -> Result<Vec<Listing>, StoreError> {
        let mut conn = self.conn()?;
        let mut query = listings::table
            .select(ListingRow::as_select())
            .order(listings::created_at.desc())
            .into_boxed();
        if let Some(host) = host {
            query = query.filter(listings::host.eq(host.to_string()));
        }
        let rows = query.load(&mut conn)?;
        Self::attach_room_types(&mut conn, rows)
    }

    fn update_listing(&self, listing: &Listing, replace_room_types: bool) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            let updated = diesel::update(listings::table.find(listing.id))
                .set(&ListingRow::from(listing))
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::NotFound("Listing"));
            }
            if replace_room_types {
                diesel::delete(room_types::table.filter(room_types::listing_id.eq(listing.id)))
                    .execute(conn)?;
                diesel::insert_into(room_types::table)
                    .values(RoomTypeRow::for_listing(listing))
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let mut conn = self.conn()?;
        bookings::table
            .find(id)
            .select(BookingRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Booking::try_from)
            .transpose()
    }

    fn bookings_for_guest(&self, guest_id: &str) -> Result<Vec<Booking>, StoreError> {
        let mut conn = self.conn()?;
        let rows = bookings::table
            .filter(bookings::guest_id.eq(guest_id))
            .order(bookings::created_at.desc())
            .select(BookingRow::as_select())
            .load(&mut conn)?;
        into_bookings(rows)
    }

    fn bookings_for_listing(&self, listing_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let mut conn = self.conn()?;
        let rows = bookings::table
            .filter(bookings::listing_id.eq(listing_id))
            .order(bookings::created_at.desc())
            .select(BookingRow::as_select())
            .load(&mut conn)?;
        into_bookings(rows)
    }

    fn set_booking_status(
        &self,
        id: Uuid,
        status: &BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<Booking, StoreError> {
        let mut conn = self.conn()?;
        diesel::update(bookings::table.find(id))
            .set((bookings::status.eq(status.as_str()), bookings::updated_at.eq(at)))
            .returning(BookingRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .ok_or(StoreError::NotFound("Booking"))
            .and_then(Booking::try_from)
    }

    fn reserve_and_insert_booking(
        &self,
        booking: &Booking,
        room_position: usize,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            let reserved = diesel::update(
                room_types::table
                    .filter(room_types::listing_id.eq(booking.listing_id))
                    .filter(room_types::position.eq(room_position as i32))
                    .filter(room_types::category.eq(booking.room_type.as_str()))
                    .filter(room_types::available.gt(0)),
            )
            .set(room_types::available.eq(room_types::available - 1))
            .execute(conn)?;
            if reserved == 0 {
                return Err(StoreError::SoldOut);
            }
            diesel::insert_into(bookings::table)
                .values(BookingRow::from(booking))
                .execute(conn)?;
            Ok(())
        })
    }

    fn cancel_bookings_and_delete_listing(
        &self,
        listing_id: Uuid,
        notice: &str,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        conn.transaction::<_, StoreError, _>(|conn| {
            let cancelled = diesel::update(bookings::table.filter(bookings::listing_id.eq(listing_id)))
                .set((
                    bookings::status.eq(BookingStatus::Cancelled.as_str()),
                    bookings::special_requests.eq(bookings::special_requests.concat(notice)),
                    bookings::updated_at.eq(at),
                ))
                .execute(conn)?;
            diesel::delete(room_types::table.filter(room_types::listing_id.eq(listing_id)))
                .execute(conn)?;
            let deleted = diesel::delete(listings::table.find(listing_id)).execute(conn)?;
            if deleted == 0 {
                return Err(StoreError::NotFound("Listing"));
            }
            Ok(cancelled)
        })
    }
}
