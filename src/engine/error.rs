use std::fmt;

use crate::model::{EntityKind, Id};

use super::rules::{
    MAX_DAYS_IN_ADVANCE, MAX_STAY_DAYS, MIN_DAYS_BEFORE_RESERVATION_START, MIN_STAY_DAYS,
};

/// A single failed booking rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    TimezoneMissing,
    EndNotAfterStart,
    StayTooLong { days: i64 },
    StayTooShort { days: i64 },
    StartsTooSoon { days: i64 },
    StartsTooFarAhead { days: i64 },
    RoomInactive(Id),
    GuestInactive(Id),
    CapacityExceeded { room_id: Id, capacity: u32, requested: u32 },
    RoomUnavailable { room_id: Id, conflicting: Id },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::TimezoneMissing => {
                write!(f, "start_date and end_date must include timezone information")
            }
            Violation::EndNotAfterStart => write!(f, "end_date must be after start_date"),
            Violation::StayTooLong { days } => write!(
                f,
                "a reservation cannot last more than {MAX_STAY_DAYS} days (requested {days})"
            ),
            Violation::StayTooShort { days } => write!(
                f,
                "a reservation must last at least {MIN_STAY_DAYS} day(s) (requested {days})"
            ),
            Violation::StartsTooSoon { days } => write!(
                f,
                "a reservation must start at least {MIN_DAYS_BEFORE_RESERVATION_START} day(s) from now (starts in {days})"
            ),
            Violation::StartsTooFarAhead { days } => write!(
                f,
                "a reservation cannot start more than {MAX_DAYS_IN_ADVANCE} days in advance (starts in {days})"
            ),
            Violation::RoomInactive(id) => write!(f, "room {id} is not active"),
            Violation::GuestInactive(id) => write!(f, "guest {id} is not active"),
            Violation::CapacityExceeded {
                room_id,
                capacity,
                requested,
            } => write!(
                f,
                "room {room_id} has capacity {capacity}, {requested} guests requested"
            ),
            Violation::RoomUnavailable {
                room_id,
                conflicting,
            } => write!(
                f,
                "room {room_id} is not available for the requested dates (conflicts with reservation {conflicting})"
            ),
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    NotFound(EntityKind, Id),
    /// Business rules failed. Never empty; ordered as evaluated.
    Rejected(Vec<Violation>),
    EmptyRequest,
    UnknownFields(Vec<String>),
    MissingFields(Vec<&'static str>),
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
    HasReservations(EntityKind, Id),
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    /// Violations carried by a `Rejected` error, empty for every other kind.
    pub fn violations(&self) -> &[Violation] {
        match self {
            EngineError::Rejected(v) => v,
            _ => &[],
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(..))
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotFound(kind, id) => write!(f, "{kind} {id} not found"),
            // Callers see the last rule that failed.
            EngineError::Rejected(violations) => match violations.last() {
                Some(last) => write!(f, "{last}"),
                None => write!(f, "reservation rejected"),
            },
            EngineError::EmptyRequest => {
                write!(f, "data was expected in the request, but none was found")
            }
            EngineError::UnknownFields(fields) => {
                write!(f, "unknown fields in request: {}", fields.join(", "))
            }
            EngineError::MissingFields(fields) => {
                write!(f, "missing required fields: {}", fields.join(", "))
            }
            EngineError::InvalidField { field, reason } => write!(f, "invalid '{field}': {reason}"),
            EngineError::HasReservations(kind, id) => {
                write!(f, "cannot delete {kind} {id}: it has reservations")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
