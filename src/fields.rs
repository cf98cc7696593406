//! Typed builders for request field maps.
//!
//! Every entity has an explicit allow-list of field names and one typed
//! setter per field. Unknown names are rejected instead of being assigned.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::engine::{EngineError, Violation};
use crate::limits::*;
use crate::model::*;

/// A decoded JSON request body.
pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

// ── Rooms ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomPatch {
    pub id: Option<Id>,
    pub name: Option<String>,
    /// `Some(None)` clears the capacity.
    pub capacity: Option<Option<u32>>,
    pub is_active: Option<bool>,
}

impl RoomPatch {
    const CREATE_ALLOWED: &'static [&'static str] = &["name", "capacity", "is_active"];
    const CREATE_REQUIRED: &'static [&'static str] = &["name"];
    const UPDATE_ALLOWED: &'static [&'static str] = &["id", "name", "capacity", "is_active"];

    pub fn from_fields(fields: &Fields, mode: Mode) -> Result<Self, EngineError> {
        match mode {
            Mode::Create => check_keys(fields, Self::CREATE_ALLOWED, Self::CREATE_REQUIRED)?,
            Mode::Update => check_keys(fields, Self::UPDATE_ALLOWED, &[])?,
        }
        let mut patch = Self::default();
        for (key, value) in fields {
            match key.as_str() {
                "id" => patch.id = Some(parse_id("id", value)?),
                "name" => patch.name = Some(parse_text("name", value, MAX_NAME_LEN)?),
                "capacity" => patch.capacity = Some(parse_occupancy("capacity", value)?),
                "is_active" => patch.is_active = Some(parse_bool("is_active", value)?),
                other => return Err(EngineError::UnknownFields(vec![other.to_string()])),
            }
        }
        Ok(patch)
    }

    pub fn into_room(self, id: Id, now: DateTime<Utc>) -> Room {
        Room {
            id,
            name: self.name.unwrap_or_default(),
            capacity: self.capacity.flatten(),
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: None,
        }
    }

    pub fn apply_to(self, room: &mut Room) {
        if let Some(name) = self.name {
            room.name = name;
        }
        if let Some(capacity) = self.capacity {
            room.capacity = capacity;
        }
        if let Some(is_active) = self.is_active {
            room.is_active = is_active;
        }
    }
}

// ── Guests ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestPatch {
    pub document: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
}

impl GuestPatch {
    const ALLOWED: &'static [&'static str] = &["document", "first_name", "last_name", "is_active"];
    const CREATE_REQUIRED: &'static [&'static str] = &["document", "first_name", "last_name"];

    pub fn from_fields(fields: &Fields, mode: Mode) -> Result<Self, EngineError> {
        let required = match mode {
            Mode::Create => Self::CREATE_REQUIRED,
            Mode::Update => &[],
        };
        check_keys(fields, Self::ALLOWED, required)?;

        let mut patch = Self::default();
        for (key, value) in fields {
            match key.as_str() {
                "document" => {
                    patch.document = Some(parse_text("document", value, MAX_DOCUMENT_LEN)?)
                }
                "first_name" => {
                    patch.first_name = Some(parse_text("first_name", value, MAX_NAME_LEN)?)
                }
                "last_name" => {
                    patch.last_name = Some(parse_text("last_name", value, MAX_NAME_LEN)?)
                }
                "is_active" => patch.is_active = Some(parse_bool("is_active", value)?),
                other => return Err(EngineError::UnknownFields(vec![other.to_string()])),
            }
        }
        Ok(patch)
    }

    pub fn into_guest(self, id: Id, now: DateTime<Utc>) -> Guest {
        Guest {
            id,
            document: self.document.unwrap_or_default(),
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: None,
        }
    }

    pub fn apply_to(self, guest: &mut Guest) {
        if let Some(document) = self.document {
            guest.document = document;
        }
        if let Some(first_name) = self.first_name {
            guest.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            guest.last_name = last_name;
        }
        if let Some(is_active) = self.is_active {
            guest.is_active = is_active;
        }
    }
}

// ── Reservations ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationPatch {
    pub id: Option<Id>,
    pub room_id: Option<Id>,
    pub guest_id: Option<Id>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    /// `Some(None)` clears the guest count.
    pub amount_of_guests: Option<Option<u32>>,
    pub status: Option<ReservationStatus>,
}

impl ReservationPatch {
    const CREATE_ALLOWED: &'static [&'static str] = &[
        "guest_id",
        "room_id",
        "start_date",
        "end_date",
        "amount_of_guests",
        "status",
    ];
    const CREATE_REQUIRED: &'static [&'static str] =
        &["guest_id", "room_id", "start_date", "end_date"];
    const UPDATE_ALLOWED: &'static [&'static str] = &[
        "id",
        "guest_id",
        "room_id",
        "start_date",
        "end_date",
        "amount_of_guests",
        "status",
    ];

    pub fn from_fields(fields: &Fields, mode: Mode) -> Result<Self, EngineError> {
        match mode {
            Mode::Create => check_keys(fields, Self::CREATE_ALLOWED, Self::CREATE_REQUIRED)?,
            Mode::Update => check_keys(fields, Self::UPDATE_ALLOWED, &[])?,
        }

        let mut patch = Self::default();
        for (key, value) in fields {
            match key.as_str() {
                "id" => patch.id = Some(parse_id("id", value)?),
                "room_id" => patch.room_id = Some(parse_id("room_id", value)?),
                "guest_id" => patch.guest_id = Some(parse_id("guest_id", value)?),
                "start_date" => patch.start_date = Some(parse_timestamp("start_date", value)?),
                "end_date" => patch.end_date = Some(parse_timestamp("end_date", value)?),
                "amount_of_guests" => {
                    patch.amount_of_guests = Some(parse_occupancy("amount_of_guests", value)?)
                }
                "status" => patch.status = Some(parse_status(value)?),
                other => return Err(EngineError::UnknownFields(vec![other.to_string()])),
            }
        }

        if mode == Mode::Create && patch.status == Some(ReservationStatus::Canceled) {
            return Err(EngineError::InvalidField {
                field: "status",
                reason: "a new reservation must be SCHEDULED",
            });
        }
        Ok(patch)
    }

    /// True when the change can move the reservation in time, to another
    /// room, or back into the schedule.
    pub fn touches_schedule(&self) -> bool {
        self.room_id.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.status.is_some()
    }

    /// Build a new reservation. Only valid on a patch built in `Mode::Create`.
    pub fn into_reservation(self, id: Id, now: DateTime<Utc>) -> Result<Reservation, EngineError> {
        let (Some(room_id), Some(guest_id), Some(start_date), Some(end_date)) =
            (self.room_id, self.guest_id, self.start_date, self.end_date)
        else {
            return Err(EngineError::MissingFields(
                Self::CREATE_REQUIRED.to_vec(),
            ));
        };
        Ok(Reservation {
            id,
            room_id,
            guest_id,
            start_date,
            end_date,
            amount_of_guests: self.amount_of_guests.flatten(),
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: None,
        })
    }

    pub fn apply_to(self, reservation: &mut Reservation) {
        if let Some(room_id) = self.room_id {
            reservation.room_id = room_id;
        }
        if let Some(guest_id) = self.guest_id {
            reservation.guest_id = guest_id;
        }
        if let Some(start_date) = self.start_date {
            reservation.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            reservation.end_date = end_date;
        }
        if let Some(amount) = self.amount_of_guests {
            reservation.amount_of_guests = amount;
        }
        if let Some(status) = self.status {
            reservation.status = status;
        }
    }
}

// ── Availability ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub room_id: Id,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    /// Reservation to leave out of the check, when probing an edit.
    pub exclude: Option<Id>,
}

impl AvailabilityQuery {
    const ALLOWED: &'static [&'static str] =
        &["room_id", "start_date", "end_date", "reservation_id"];
    const REQUIRED: &'static [&'static str] = &["room_id", "start_date", "end_date"];

    pub fn from_fields(fields: &Fields) -> Result<Self, EngineError> {
        check_keys(fields, Self::ALLOWED, Self::REQUIRED)?;
        let field = |name: &str| fields.get(name).unwrap_or(&Value::Null);
        Ok(Self {
            room_id: parse_id("room_id", field("room_id"))?,
            start_date: parse_timestamp("start_date", field("start_date"))?,
            end_date: parse_timestamp("end_date", field("end_date"))?,
            exclude: fields
                .get("reservation_id")
                .map(|v| parse_id("reservation_id", v))
                .transpose()?,
        })
    }
}

// ── Field setters ─────────────────────────────────────────────

fn check_keys(
    fields: &Fields,
    allowed: &[&str],
    required: &[&'static str],
) -> Result<(), EngineError> {
    if fields.is_empty() {
        return Err(EngineError::EmptyRequest);
    }
    let mut unknown: Vec<String> = fields
        .keys()
        .filter(|k| !allowed.contains(&k.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        unknown.sort();
        return Err(EngineError::UnknownFields(unknown));
    }
    let missing: Vec<&'static str> = required
        .iter()
        .copied()
        .filter(|k| !fields.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::MissingFields(missing));
    }
    Ok(())
}

fn parse_id(field: &'static str, value: &Value) -> Result<Id, EngineError> {
    value
        .as_u64()
        .filter(|id| *id > 0)
        .ok_or(EngineError::InvalidField {
            field,
            reason: "expected a positive integer",
        })
}

/// Positive head count, or null.
fn parse_occupancy(field: &'static str, value: &Value) -> Result<Option<u32>, EngineError> {
    if value.is_null() {
        return Ok(None);
    }
    let n = value
        .as_u64()
        .filter(|n| *n > 0)
        .ok_or(EngineError::InvalidField {
            field,
            reason: "expected a positive integer or null",
        })?;
    if n > MAX_OCCUPANCY as u64 {
        return Err(EngineError::LimitExceeded("occupancy too large"));
    }
    Ok(Some(n as u32))
}

fn parse_text(field: &'static str, value: &Value, max_len: usize) -> Result<String, EngineError> {
    let text = value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(EngineError::InvalidField {
            field,
            reason: "expected a non-empty string",
        })?;
    if text.len() > max_len {
        return Err(EngineError::LimitExceeded("text field too long"));
    }
    Ok(text.to_string())
}

fn parse_bool(field: &'static str, value: &Value) -> Result<bool, EngineError> {
    value.as_bool().ok_or(EngineError::InvalidField {
        field,
        reason: "expected a boolean",
    })
}

fn parse_status(value: &Value) -> Result<ReservationStatus, EngineError> {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or(EngineError::InvalidField {
            field: "status",
            reason: "expected SCHEDULED or CANCELED",
        })
}

/// ISO 8601 timestamp with an offset. A well-formed timestamp without one
/// is a booking rule failure, not a malformed field.
pub fn parse_timestamp(field: &'static str, value: &Value) -> Result<Timestamp, EngineError> {
    let invalid = EngineError::InvalidField {
        field,
        reason: "expected an ISO 8601 timestamp",
    };
    let Some(raw) = value.as_str().map(str::trim) else {
        return Err(invalid);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(ts);
    }
    if NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").is_ok() {
        return Err(EngineError::Rejected(vec![Violation::TimezoneMissing]));
    }
    Err(invalid)
}
