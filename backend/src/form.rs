//! Decoding of listing form submissions.
//!
//! Listing forms arrive as multipart text fields, and the nested parts
//! (room types, contact info, policies) come in one of two shapes: a JSON
//! document in a single field (`roomTypes`, `contactInfo`, `policies`) or one
//! field per key in bracket notation (`roomTypes[0][price]`,
//! `contactInfo[phone]`, `policies[checkIn]`). [`ListingForm::decode`] is the
//! only place that knows about either shape; everything after it works on the
//! typed [`ListingForm`], and validation happens once when the form is turned
//! into a [`Listing`] or applied to one.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ContactInfo, Currency, Listing, Policies, RoomCategory, RoomType};

const DEFAULT_STAR_RATING: i32 = 3;

/// Text fields of a multipart submission, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// First non-empty value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomTypeInput {
    pub category: Option<String>,
    pub price: f64,
    pub currency: Option<String>,
    pub capacity: i64,
    pub available: i64,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactInput {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoliciesInput {
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub cancellation: Option<String>,
    pub pet_policy: Option<String>,
    pub smoking_policy: Option<String>,
}

/// Canonical, still unvalidated, listing submission. `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingForm {
    pub hotel_name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub star_rating: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub room_types: Option<Vec<RoomTypeInput>>,
    pub contact_info: Option<ContactInput>,
    /// Top-level `phone`/`email`/`website` keys; only consulted on creation.
    pub bare_contact: ContactInput,
    pub policies: Option<PoliciesInput>,
}

impl ListingForm {
    pub fn decode(fields: &FormFields) -> Self {
        let text = |key: &str| fields.get(key).map(str::to_string);
        Self {
            hotel_name: text("hotelName"),
            description: text("description"),
            address: text("address"),
            city: text("city"),
            country: text("country"),
            star_rating: text("starRating"),
            amenities: fields.get("amenities").map(decode_amenities),
            room_types: decode_room_types(fields),
            contact_info: decode_contact(fields),
            bare_contact: decode_bare_contact(fields),
            policies: decode_policies(fields),
        }
    }

    /// Validates a creation submission and builds the listing it describes.
    pub fn into_new_listing(
        self,
        host: &str,
        images: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Listing, AppError> {
        let hotel_name = required(self.hotel_name, "Hotel name is required")?;
        let description = required(self.description, "Description is required")?;
        let address = required(self.address, "Address is required")?;
        let city = required(self.city, "City is required")?;
        let country = required(self.country, "Country is required")?;

        if images.is_empty() {
            return Err(AppError::invalid("At least one image is required."));
        }
        let room_types = match self.room_types {
            Some(inputs) => validate_room_types(inputs)?,
            None => return Err(AppError::invalid("At least one room type is required.")),
        };
        let contact_info = self
            .contact_info
            .unwrap_or_default()
            .or(self.bare_contact)
            .validate()?;
        let policies = self.policies.unwrap_or_default().into_policies();
        let star_rating = star_rating(self.star_rating.as_deref())?;

        Ok(Listing {
            id: Uuid::new_v4(),
            host: host.to_string(),
            hotel_name,
            description,
            address,
            city,
            country,
            star_rating,
            room_types,
            amenities: self.amenities.unwrap_or_default(),
            images,
            contact_info,
            policies,
            created_at: now,
        })
    }

    /// Applies the supplied parts of an update submission. Returns whether the
    /// room types were replaced. On error the listing is left untouched.
    pub fn apply_to(self, listing: &mut Listing) -> Result<bool, AppError> {
        let star_rating = match self.star_rating.as_deref() {
            Some(raw) => Some(star_rating(Some(raw))?),
            None => None,
        };
        let room_types = self.room_types.map(validate_room_types).transpose()?;
        let contact_info = self
            .contact_info
            .map(|supplied| supplied.over(&listing.contact_info).validate())
            .transpose()?;

        let mut updated = listing.clone();
        let scalars = [
            (self.hotel_name, &mut updated.hotel_name),
            (self.description, &mut updated.description),
            (self.address, &mut updated.address),
            (self.city, &mut updated.city),
            (self.country, &mut updated.country),
        ];
        for (value, field) in scalars {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(rating) = star_rating {
            updated.star_rating = rating;
        }
        if let Some(amenities) = self.amenities {
            updated.amenities = amenities;
        }
        if let Some(contact_info) = contact_info {
            updated.contact_info = contact_info;
        }
        if let Some(policies) = self.policies {
            updated.policies = policies.into_policies();
        }
        let replaced = room_types.is_some();
        if let Some(room_types) = room_types {
            updated.room_types = room_types;
        }
        *listing = updated;
        Ok(replaced)
    }
}

impl RoomTypeInput {
    fn validate(self, index: usize) -> Result<RoomType, AppError> {
        let invalid = |msg: String| AppError::invalid(format!("Validation error: room type {}: {}", index, msg));
        let category: RoomCategory = self
            .category
            .ok_or_else(|| invalid("type is required".to_string()))?
            .parse()
            .map_err(invalid)?;
        let currency: Currency = match self.currency {
            Some(c) => c.parse().map_err(invalid)?,
            None => Currency::default(),
        };
        if self.price < 0.0 {
            return Err(invalid("price must not be negative".to_string()));
        }
        let capacity = i32::try_from(self.capacity)
            .ok()
            .filter(|c| *c >= 1)
            .ok_or_else(|| invalid("capacity must be a positive integer".to_string()))?;
        let available = i32::try_from(self.available)
            .ok()
            .filter(|a| *a >= 0)
            .ok_or_else(|| invalid("available must not be negative".to_string()))?;
        Ok(RoomType {
            category,
            price: self.price,
            currency,
            capacity,
            available,
            description: self.description,
        })
    }
}

impl ContactInput {
    fn set(&mut self, key: &str, value: &str) {
        let value = non_empty(value);
        match key {
            "phone" => self.phone = value,
            "email" => self.email = value,
            "website" => self.website = value,
            _ => {}
        }
    }

    fn is_incomplete(&self) -> bool {
        self.phone.is_none() || self.email.is_none()
    }

    /// Fills the keys this input lacks from `fallback`.
    fn or(self, fallback: ContactInput) -> ContactInput {
        ContactInput {
            phone: self.phone.or(fallback.phone),
            email: self.email.or(fallback.email),
            website: self.website.or(fallback.website),
        }
    }

    /// Keys not supplied keep their stored value.
    fn over(self, stored: &ContactInfo) -> ContactInput {
        self.or(ContactInput {
            phone: Some(stored.phone.clone()),
            email: Some(stored.email.clone()),
            website: Some(stored.website.clone()),
        })
    }

    fn validate(self) -> Result<ContactInfo, AppError> {
        let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let phone = trimmed(self.phone)
            .ok_or_else(|| AppError::invalid("Phone is required in contact information."))?;
        let email = trimmed(self.email)
            .ok_or_else(|| AppError::invalid("Email is required in contact information."))?;
        Ok(ContactInfo {
            phone,
            email,
            website: trimmed(self.website).unwrap_or_default(),
        })
    }
}

impl PoliciesInput {
    fn fill(&mut self, key: &str, value: &str, overwrite: bool) {
        let slot = match key {
            "checkIn" => &mut self.check_in,
            "checkOut" => &mut self.check_out,
            "cancellation" => &mut self.cancellation,
            "petPolicy" => &mut self.pet_policy,
            "smokingPolicy" => &mut self.smoking_policy,
            _ => return,
        };
        if overwrite || slot.is_none() {
            if let Some(value) = non_empty(value) {
                *slot = Some(value);
            }
        }
    }

    fn into_policies(self) -> Policies {
        let defaults = Policies::default();
        Policies {
            check_in: self.check_in.unwrap_or(defaults.check_in),
            check_out: self.check_out.unwrap_or(defaults.check_out),
            cancellation: self.cancellation.unwrap_or(defaults.cancellation),
            pet_policy: self.pet_policy.unwrap_or(defaults.pet_policy),
            smoking_policy: self.smoking_policy.unwrap_or(defaults.smoking_policy),
        }
    }
}

fn required(value: Option<String>, msg: &str) -> Result<String, AppError> {
    value.ok_or_else(|| AppError::invalid(msg))
}

fn star_rating(raw: Option<&str>) -> Result<i32, AppError> {
    let rating = raw
        .and_then(parse_int)
        .filter(|r| *r != 0)
        .unwrap_or(DEFAULT_STAR_RATING as i64);
    if !(1..=5).contains(&rating) {
        return Err(AppError::invalid("Validation error: star rating must be between 1 and 5"));
    }
    Ok(rating as i32)
}

fn validate_room_types(inputs: Vec<RoomTypeInput>) -> Result<Vec<RoomType>, AppError> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| input.validate(index))
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| parse_float(raw).map(|f| f.trunc() as i64))
}

fn json_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float(s),
        _ => None,
    }
}

fn json_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int(s),
        _ => None,
    }
}

fn json_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn decode_amenities(raw: &str) -> Vec<String> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) {
        return items
            .iter()
            .filter_map(|item| json_string(Some(item)))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn room_type_input(
    category: Option<String>,
    price: Option<f64>,
    currency: Option<String>,
    capacity: Option<i64>,
    available: Option<i64>,
    description: Option<String>,
) -> RoomTypeInput {
    RoomTypeInput {
        category,
        price: price.unwrap_or(0.0),
        currency,
        capacity: capacity.filter(|c| *c != 0).unwrap_or(1),
        available: available.unwrap_or(0),
        description: description.unwrap_or_default(),
    }
}

fn decode_room_types(fields: &FormFields) -> Option<Vec<RoomTypeInput>> {
    let from_json: Vec<RoomTypeInput> = fields
        .get("roomTypes")
        .and_then(|raw| match serde_json::from_str(raw) {
            Ok(Value::Array(items)) => Some(items),
            _ => None,
        })
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_object)
        .map(|rt| {
            room_type_input(
                json_string(rt.get("type")),
                json_float(rt.get("price")),
                json_string(rt.get("currency")),
                json_int(rt.get("capacity")),
                json_int(rt.get("available")),
                json_string(rt.get("description")),
            )
        })
        .collect();
    if !from_json.is_empty() {
        return Some(from_json);
    }

    let mut from_brackets = Vec::new();
    for index in 0.. {
        let field = |name: &str| fields.get(&format!("roomTypes[{}][{}]", index, name));
        let Some(category) = field("type") else { break };
        from_brackets.push(room_type_input(
            Some(category.to_string()),
            field("price").and_then(parse_float),
            field("currency").map(str::to_string),
            field("capacity").and_then(parse_int),
            field("available").and_then(parse_int),
            field("description").map(str::to_string),
        ));
    }
    (!from_brackets.is_empty()).then_some(from_brackets)
}

fn decode_contact(fields: &FormFields) -> Option<ContactInput> {
    let mut contact = ContactInput::default();
    let mut supplied = false;

    if let Some(map) = fields.get("contactInfo").and_then(json_object) {
        supplied = true;
        contact.phone = json_string(map.get("phone"));
        contact.email = json_string(map.get("email"));
        contact.website = json_string(map.get("website"));
    }
    if contact.is_incomplete() {
        for (key, value) in fields.iter() {
            let sub_key = key
                .strip_prefix("contactInfo[")
                .and_then(|k| k.strip_suffix(']'))
                .or_else(|| key.strip_prefix("contactInfo."));
            if let Some(sub_key) = sub_key {
                supplied = true;
                contact.set(sub_key, value);
            }
        }
    }
    supplied.then_some(contact)
}

fn decode_bare_contact(fields: &FormFields) -> ContactInput {
    let mut contact = ContactInput::default();
    for key in ["phone", "email", "website"] {
        if let Some(value) = fields.get(key) {
            contact.set(key, value);
        }
    }
    contact
}

fn decode_policies(fields: &FormFields) -> Option<PoliciesInput> {
    let mut policies = PoliciesInput::default();
    let mut supplied = false;

    if let Some(map) = fields.get("policies").and_then(json_object) {
        supplied = true;
        for (key, value) in &map {
            if let Some(value) = json_string(Some(value)) {
                policies.fill(key, &value, true);
            }
        }
    }
    for (key, value) in fields.iter() {
        let sub_key = key
            .strip_prefix("policies[")
            .and_then(|k| k.strip_suffix(']'))
            .or_else(|| key.strip_prefix("policies."));
        if let Some(sub_key) = sub_key {
            supplied = true;
            policies.fill(sub_key, value, false);
        }
    }
    supplied.then_some(policies)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("hotelName", "Grand Plaza"),
            ("description", "Downtown luxury"),
            ("address", "123 Main Street"),
            ("city", "New York"),
            ("country", "USA"),
            ("starRating", "5"),
            ("amenities", "WiFi, Pool ,Spa"),
        ]
    }

    fn images() -> Vec<String> {
        vec!["/uploads/images-1.jpg".to_string()]
    }

    #[test]
    fn json_and_bracket_encodings_decode_to_the_same_form() {
        let mut json = base_fields();
        json.push((
            "roomTypes",
            r#"[{"type":"Standard","price":"150","currency":"USD","capacity":2,"available":"10","description":"Queen bed"}]"#,
        ));
        json.push(("contactInfo", r#"{"phone":"+1 555 0100","email":"desk@plaza.test"}"#));
        json.push(("policies", r#"{"checkIn":"14:00","checkOut":"12:00"}"#));

        let mut brackets = base_fields();
        brackets.extend([
            ("roomTypes[0][type]", "Standard"),
            ("roomTypes[0][price]", "150"),
            ("roomTypes[0][currency]", "USD"),
            ("roomTypes[0][capacity]", "2"),
            ("roomTypes[0][available]", "10"),
            ("roomTypes[0][description]", "Queen bed"),
            ("contactInfo[phone]", "+1 555 0100"),
            ("contactInfo[email]", "desk@plaza.test"),
            ("policies[checkIn]", "14:00"),
            ("policies[checkOut]", "12:00"),
        ]);

        let from_json = ListingForm::decode(&json.into_iter().collect());
        let from_brackets = ListingForm::decode(&brackets.into_iter().collect());
        assert_eq!(from_json, from_brackets);

        let listing = from_json.into_new_listing("host-1", images(), Utc::now()).unwrap();
        assert_eq!(listing.amenities, vec!["WiFi", "Pool", "Spa"]);
        assert_eq!(listing.room_types[0].category, RoomCategory::Standard);
        assert_eq!(listing.room_types[0].price, 150.0);
        assert_eq!(listing.room_types[0].available, 10);
        assert_eq!(listing.policies.check_in, "14:00");
        assert_eq!(listing.policies.cancellation, "Standard cancellation policy");
    }

    #[test]
    fn malformed_json_falls_back_to_brackets() {
        let mut fields = base_fields();
        fields.extend([
            ("roomTypes", "[{not json"),
            ("roomTypes[0][type]", "Suite"),
            ("roomTypes[0][price]", "abc"),
            ("roomTypes[1][type]", "Family"),
            ("roomTypes[1][currency]", "INR"),
            ("roomTypes[3][type]", "Deluxe"),
        ]);
        let form = ListingForm::decode(&fields.into_iter().collect());
        let rooms = form.room_types.unwrap();
        assert_eq!(rooms.len(), 2, "decoding stops at the first missing index");
        assert_eq!(rooms[0].price, 0.0);
        assert_eq!(rooms[0].capacity, 1);
        assert_eq!(rooms[0].available, 0);
        assert_eq!(rooms[1].currency.as_deref(), Some("INR"));
    }

    #[test]
    fn contact_falls_back_to_dotted_and_bare_keys() {
        let mut fields = base_fields();
        fields.extend([
            ("contactInfo", r#"{"phone":"  555  "}"#),
            ("contactInfo.website", "https://plaza.test"),
            ("email", " desk@plaza.test "),
            ("roomTypes[0][type]", "Deluxe"),
        ]);
        let listing = ListingForm::decode(&fields.into_iter().collect())
            .into_new_listing("host-1", images(), Utc::now())
            .unwrap();
        assert_eq!(listing.contact_info.phone, "555");
        assert_eq!(listing.contact_info.email, "desk@plaza.test");
        assert_eq!(listing.contact_info.website, "https://plaza.test");
    }

    #[test]
    fn creation_checks_run_in_order() {
        let missing_city: FormFields = base_fields()
            .into_iter()
            .filter(|(k, _)| *k != "city")
            .collect();
        let err = ListingForm::decode(&missing_city)
            .into_new_listing("h", images(), Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "City is required");

        let no_rooms: FormFields = base_fields().into_iter().collect();
        let err = ListingForm::decode(&no_rooms)
            .into_new_listing("h", Vec::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "At least one image is required.");
        let err = ListingForm::decode(&no_rooms)
            .into_new_listing("h", images(), Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "At least one room type is required.");

        let mut blank_phone = base_fields();
        blank_phone.extend([
            ("roomTypes[0][type]", "Standard"),
            ("contactInfo[phone]", "   "),
            ("contactInfo[email]", "a@b.test"),
        ]);
        let err = ListingForm::decode(&blank_phone.into_iter().collect())
            .into_new_listing("h", images(), Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "Phone is required in contact information.");
    }

    #[test]
    fn rejects_values_outside_enumerations_and_ranges() {
        let mut fields = base_fields();
        fields.extend([
            ("roomTypes[0][type]", "Penthouse"),
            ("contactInfo[phone]", "1"),
            ("contactInfo[email]", "a@b.test"),
        ]);
        let err = ListingForm::decode(&fields.into_iter().collect())
            .into_new_listing("h", images(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let mut fields = base_fields();
        fields.retain(|(k, _)| *k != "starRating");
        fields.extend([
            ("starRating", "7"),
            ("roomTypes[0][type]", "Standard"),
            ("contactInfo[phone]", "1"),
            ("contactInfo[email]", "a@b.test"),
        ]);
        let err = ListingForm::decode(&fields.into_iter().collect())
            .into_new_listing("h", images(), Utc::now())
            .unwrap_err();
        assert!(err.to_string().contains("star rating"));
    }

    #[test]
    fn unparsable_star_rating_defaults_to_three() {
        assert_eq!(star_rating(Some("lots")).unwrap(), 3);
        assert_eq!(star_rating(None).unwrap(), 3);
        assert_eq!(star_rating(Some("4.9")).unwrap(), 4);
    }

    #[test]
    fn apply_replaces_only_supplied_parts() {
        let mut fields = base_fields();
        fields.extend([
            ("roomTypes[0][type]", "Standard"),
            ("roomTypes[0][available]", "4"),
            ("contactInfo[phone]", "1"),
            ("contactInfo[email]", "a@b.test"),
        ]);
        let mut listing = ListingForm::decode(&fields.into_iter().collect())
            .into_new_listing("h", images(), Utc::now())
            .unwrap();

        let patch: FormFields = [("city", "Boston"), ("policies[petPolicy]", "Pets welcome")]
            .into_iter()
            .collect();
        let replaced = ListingForm::decode(&patch).apply_to(&mut listing).unwrap();
        assert!(!replaced);
        assert_eq!(listing.city, "Boston");
        assert_eq!(listing.hotel_name, "Grand Plaza");
        assert_eq!(listing.policies.pet_policy, "Pets welcome");
        assert_eq!(listing.policies.check_in, "15:00");
        assert_eq!(listing.room_types[0].available, 4);

        let patch: FormFields = [
            ("roomTypes", r#"[{"type":"Suite","price":400,"currency":"INR","capacity":4,"available":1}]"#),
            ("starRating", "9"),
        ]
        .into_iter()
        .collect();
        let before = listing.clone();
        assert!(ListingForm::decode(&patch).apply_to(&mut listing).is_err());
        assert_eq!(listing, before);

        let patch: FormFields = [(
            "roomTypes",
            r#"[{"type":"Suite","price":400,"currency":"INR","capacity":4,"available":1}]"#,
        )]
        .into_iter()
        .collect();
        assert!(ListingForm::decode(&patch).apply_to(&mut listing).unwrap());
        assert_eq!(listing.room_types.len(), 1);
        assert_eq!(listing.room_types[0].currency, Currency::INR);
    }
}
