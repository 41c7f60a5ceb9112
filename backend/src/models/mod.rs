use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomCategory {
    Standard,
    Deluxe,
    Suite,
    Executive,
    Presidential,
    Family,
    Business,
}

impl RoomCategory {
    pub const ALL: [RoomCategory; 7] = [
        RoomCategory::Standard,
        RoomCategory::Deluxe,
        RoomCategory::Suite,
        RoomCategory::Executive,
        RoomCategory::Presidential,
        RoomCategory::Family,
        RoomCategory::Business,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomCategory::Standard => "Standard",
            RoomCategory::Deluxe => "Deluxe",
            RoomCategory::Suite => "Suite",
            RoomCategory::Executive => "Executive",
            RoomCategory::Presidential => "Presidential",
            RoomCategory::Family => "Family",
            RoomCategory::Business => "Business",
        }
    }
}

impl FromStr for RoomCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoomCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("`{}` is not a valid room type", s))
    }
}

impl fmt::Display for RoomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    USD,
    INR,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::INR => "INR",
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::USD),
            "INR" => Ok(Currency::INR),
            other => Err(format!("`{}` is not a supported currency", other)),
        }
    }
}

/// One category of room in a listing, with its own inventory counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomType {
    #[serde(rename = "type")]
    pub category: RoomCategory,
    pub price: f64,
    pub currency: Currency,
    pub capacity: i32,
    pub available: i32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub phone: String,
    pub email: String,
    /// Empty when the hotel has no website.
    #[serde(default)]
    pub website: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policies {
    pub check_in: String,
    pub check_out: String,
    pub cancellation: String,
    pub pet_policy: String,
    pub smoking_policy: String,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            check_in: "15:00".to_string(),
            check_out: "11:00".to_string(),
            cancellation: "Standard cancellation policy".to_string(),
            pet_policy: "No pets allowed".to_string(),
            smoking_policy: "No smoking".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub host: String,
    pub hotel_name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub star_rating: i32,
    pub room_types: Vec<RoomType>,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub contact_info: ContactInfo,
    pub policies: Policies,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_hosted_by(&self, user_id: &str) -> bool {
        self.host == user_id
    }

    /// First room type of the given category, with its position in the listing.
    pub fn room_type(&self, category: RoomCategory) -> Option<(usize, &RoomType)> {
        self.room_types
            .iter()
            .enumerate()
            .find(|(_, rt)| rt.category == category)
    }

    pub fn summary(&self) -> HotelSummary {
        HotelSummary {
            id: self.id,
            hotel_name: self.hotel_name.clone(),
            images: self.images.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSummary {
    pub id: Uuid,
    pub hotel_name: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    /// Host-supplied value outside the known set (permissive validation only).
    Other(String),
}

impl BookingStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, BookingStatus::Other(_))
    }
}

impl From<String> for BookingStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => BookingStatus::Pending,
            "confirmed" => BookingStatus::Confirmed,
            "cancelled" => BookingStatus::Cancelled,
            "completed" => BookingStatus::Completed,
            _ => BookingStatus::Other(s),
        }
    }
}

impl From<BookingStatus> for String {
    fn from(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A guest's reservation of one room type. The price is captured at booking time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    #[serde(rename = "listing")]
    pub listing_id: Uuid,
    #[serde(rename = "user")]
    pub guest_id: String,
    pub room_type: RoomCategory,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub guests: i32,
    pub total_price: f64,
    pub special_requests: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
