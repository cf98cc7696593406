use chrono::{DateTime, Utc};

use crate::model::*;

use super::availability::find_conflict;
use super::store::Tables;
use super::{EngineError, Violation};

pub const MAX_STAY_DAYS: i64 = 3;
pub const MIN_STAY_DAYS: i64 = 1;
pub const MIN_DAYS_BEFORE_RESERVATION_START: i64 = 1;
pub const MAX_DAYS_IN_ADVANCE: i64 = 30;

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Which rule families an evaluation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RuleSet {
    /// Stay duration, lead time and availability.
    pub date_window: bool,
    /// Active flags and capacity.
    pub room_and_guest: bool,
}

impl RuleSet {
    pub const ALL: RuleSet = RuleSet {
        date_window: true,
        room_and_guest: true,
    };
}

/// Duration and lead-time checks, in that order. Pushes nothing when the
/// range itself is empty or reversed; that is reported by `check_range`.
pub(crate) fn check_date_window(range: &DateRange, now: DateTime<Utc>, out: &mut Vec<Violation>) {
    let days = range.stay_days();
    if days > MAX_STAY_DAYS {
        out.push(Violation::StayTooLong { days });
    }
    if days < MIN_STAY_DAYS {
        out.push(Violation::StayTooShort { days });
    }

    let lead = range.lead_days(now);
    if lead < MIN_DAYS_BEFORE_RESERVATION_START {
        out.push(Violation::StartsTooSoon { days: lead });
    }
    if lead > MAX_DAYS_IN_ADVANCE {
        out.push(Violation::StartsTooFarAhead { days: lead });
    }
}

pub(crate) fn check_range(
    reservation: &Reservation,
    out: &mut Vec<Violation>,
) -> Option<DateRange> {
    let range = reservation.dates();
    if range.is_none() {
        out.push(Violation::EndNotAfterStart);
    }
    range
}

pub(crate) fn check_room_and_guest(
    reservation: &Reservation,
    room: &Room,
    guest: &Guest,
    out: &mut Vec<Violation>,
) {
    if !room.is_active {
        out.push(Violation::RoomInactive(room.id));
    }
    if !guest.is_active {
        out.push(Violation::GuestInactive(guest.id));
    }
    if let (Some(requested), Some(capacity)) = (reservation.amount_of_guests, room.capacity)
        && requested > capacity
    {
        out.push(Violation::CapacityExceeded {
            room_id: room.id,
            capacity,
            requested,
        });
    }
}

/// Run `rules` against `reservation` as it would be stored.
///
/// The room and guest must exist. Every failing rule is collected in
/// evaluation order; availability is only checked when the date window
/// family runs and the range is valid.
pub(crate) fn evaluate(
    tables: &Tables,
    reservation: &Reservation,
    rules: RuleSet,
    exclude: Option<Id>,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let room = tables
        .room(reservation.room_id)
        .ok_or(EngineError::NotFound(EntityKind::Room, reservation.room_id))?;
    let guest = tables
        .guest(reservation.guest_id)
        .ok_or(EngineError::NotFound(EntityKind::Guest, reservation.guest_id))?;

    let mut violations = Vec::new();
    let range = check_range(reservation, &mut violations);
    if rules.date_window
        && let Some(range) = &range
    {
        check_date_window(range, now, &mut violations);
    }
    if rules.room_and_guest {
        check_room_and_guest(reservation, room, guest, &mut violations);
    }
    if rules.date_window
        && let Some(range) = &range
        && let Some(conflicting) =
            find_conflict(tables.reservations(), reservation.room_id, range, exclude)
    {
        violations.push(Violation::RoomUnavailable {
            room_id: reservation.room_id,
            conflicting,
        });
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Rejected(violations))
    }
}
