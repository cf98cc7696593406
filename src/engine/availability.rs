use crate::model::*;

// ── Room availability ─────────────────────────────────────────────

/// First SCHEDULED reservation of `room_id` whose dates overlap `range`,
/// ignoring the reservation with id `exclude` (the one being updated).
///
/// Whether a conflict exists does not depend on iteration order; which
/// conflicting id gets reported does.
pub fn find_conflict<'a>(
    reservations: impl IntoIterator<Item = &'a Reservation>,
    room_id: Id,
    range: &DateRange,
    exclude: Option<Id>,
) -> Option<Id> {
    reservations
        .into_iter()
        .filter(|r| r.is_scheduled() && r.room_id == room_id)
        .filter(|r| exclude != Some(r.id))
        .find(|r| r.dates().is_some_and(|dates| dates.overlaps(range)))
        .map(|r| r.id)
}

pub fn is_room_available<'a>(
    reservations: impl IntoIterator<Item = &'a Reservation>,
    room_id: Id,
    range: &DateRange,
    exclude: Option<Id>,
) -> bool {
    find_conflict(reservations, room_id, range, exclude).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn base() -> Timestamp {
        DateTime::parse_from_rfc3339("2030-03-01T15:00:00+01:00").unwrap()
    }

    fn range(from_day: i64, to_day: i64) -> DateRange {
        DateRange::new(base() + Duration::days(from_day), base() + Duration::days(to_day))
    }

    fn reservation(
        id: Id,
        room_id: Id,
        from_day: i64,
        to_day: i64,
        status: ReservationStatus,
    ) -> Reservation {
        let r = range(from_day, to_day);
        Reservation {
            id,
            room_id,
            guest_id: 1,
            start_date: r.start,
            end_date: r.end,
            amount_of_guests: None,
            status,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn empty_room_is_available() {
        assert!(is_room_available(std::iter::empty(), 1, &range(0, 2), None));
    }

    #[test]
    fn overlapping_scheduled_reservation_conflicts() {
        let existing = vec![reservation(7, 1, 3, 5, ReservationStatus::Scheduled)];
        assert_eq!(find_conflict(&existing, 1, &range(4, 5), None), Some(7));
        assert_eq!(find_conflict(&existing, 1, &range(6, 7), None), None);
    }

    #[test]
    fn touching_checkout_and_checkin_conflict() {
        let existing = vec![reservation(7, 1, 3, 5, ReservationStatus::Scheduled)];
        assert_eq!(find_conflict(&existing, 1, &range(5, 6), None), Some(7));
        assert_eq!(find_conflict(&existing, 1, &range(1, 3), None), Some(7));
    }

    #[test]
    fn other_rooms_and_canceled_reservations_are_ignored() {
        let existing = vec![
            reservation(1, 2, 3, 5, ReservationStatus::Scheduled),
            reservation(2, 1, 3, 5, ReservationStatus::Canceled),
        ];
        assert!(is_room_available(&existing, 1, &range(3, 5), None));
    }

    #[test]
    fn excluded_reservation_does_not_conflict_with_itself() {
        let existing = vec![reservation(7, 1, 3, 5, ReservationStatus::Scheduled)];
        assert!(!is_room_available(&existing, 1, &range(3, 4), None));
        assert!(is_room_available(&existing, 1, &range(3, 4), Some(7)));
    }

    #[test]
    fn exclusion_only_drops_the_named_reservation() {
        let existing = vec![
            reservation(7, 1, 3, 5, ReservationStatus::Scheduled),
            reservation(8, 1, 6, 8, ReservationStatus::Scheduled),
        ];
        assert_eq!(find_conflict(&existing, 1, &range(4, 6), Some(7)), Some(8));
    }

    #[test]
    fn result_is_independent_of_order() {
        let mut existing = vec![
            reservation(1, 1, 0, 1, ReservationStatus::Scheduled),
            reservation(2, 1, 10, 12, ReservationStatus::Canceled),
            reservation(3, 1, 20, 22, ReservationStatus::Scheduled),
            reservation(4, 2, 10, 12, ReservationStatus::Scheduled),
        ];
        let probes = [range(2, 4), range(10, 12), range(21, 23), range(1, 2)];
        let forward: Vec<bool> = probes
            .iter()
            .map(|p| is_room_available(&existing, 1, p, None))
            .collect();
        existing.reverse();
        let backward: Vec<bool> = probes
            .iter()
            .map(|p| is_room_available(&existing, 1, p, None))
            .collect();
        assert_eq!(forward, backward);
        assert_eq!(forward, vec![true, true, false, false]);
    }
}
