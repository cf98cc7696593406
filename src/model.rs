use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned row id. Always positive.
pub type Id = u64;

/// Timezone-aware instant as supplied by clients.
pub type Timestamp = DateTime<FixedOffset>;

/// Closed interval `[start, end]`. Touching endpoints overlap.
///
/// Only built through [`DateRange::new`], never decoded:
///
/// ```compile_fail
/// fn decodable<T: serde::de::DeserializeOwned>() {}
/// decodable::<innkeep::model::DateRange>();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl DateRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        assert!(start < end, "DateRange start must be before end");
        Self { start, end }
    }

    /// Whole days between start and end, truncated toward zero.
    pub fn stay_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Whole days from `now` until the range starts, truncated toward zero.
    pub fn lead_days(&self, now: DateTime<Utc>) -> i64 {
        (self.start.with_timezone(&Utc) - now).num_days()
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        let latest_start = self.start.max(other.start);
        let earliest_end = self.end.min(other.end);
        earliest_end >= latest_start
    }
}

/// Inclusive overlap test over two `[start, end]` ranges.
///
/// Panics if either range is empty or reversed.
pub fn overlaps(
    start_a: Timestamp,
    end_a: Timestamp,
    start_b: Timestamp,
    end_b: Timestamp,
) -> bool {
    DateRange::new(start_a, end_a).overlaps(&DateRange::new(start_b, end_b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Room,
    Guest,
    Reservation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Room => f.write_str("room"),
            EntityKind::Guest => f.write_str("guest"),
            EntityKind::Reservation => f.write_str("reservation"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Live reservation; takes part in the no-overlap invariant.
    #[default]
    Scheduled,
    /// Kept for history. May be rescheduled if the slot is still free.
    Canceled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Scheduled => "SCHEDULED",
            ReservationStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(ReservationStatus::Scheduled),
            "CANCELED" => Ok(ReservationStatus::Canceled),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Id,
    pub name: String,
    pub capacity: Option<u32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: Id,
    pub document: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Id,
    pub room_id: Id,
    pub guest_id: Id,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub amount_of_guests: Option<u32>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn is_scheduled(&self) -> bool {
        self.status == ReservationStatus::Scheduled
    }

    /// `None` when end_date is not after start_date.
    pub fn dates(&self) -> Option<DateRange> {
        (self.start_date < self.end_date).then(|| DateRange::new(self.start_date, self.end_date))
    }
}

/// Next id to hand out, per entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequences {
    pub room: Id,
    pub guest: Id,
    pub reservation: Id,
}

impl Default for Sequences {
    fn default() -> Self {
        Self {
            room: 1,
            guest: 1,
            reservation: 1,
        }
    }
}

impl Sequences {
    /// Make sure `id` is never handed out again for `kind`.
    pub fn observe(&mut self, kind: EntityKind, id: Id) {
        let slot = self.slot(kind);
        *slot = (*slot).max(id + 1);
    }

    pub fn allocate(&mut self, kind: EntityKind) -> Id {
        let slot = self.slot(kind);
        let id = *slot;
        *slot += 1;
        id
    }

    fn slot(&mut self, kind: EntityKind) -> &mut Id {
        match kind {
            EntityKind::Room => &mut self.room,
            EntityKind::Guest => &mut self.guest,
            EntityKind::Reservation => &mut self.reservation,
        }
    }
}

/// The event types. One committed transaction is one WAL entry holding
/// a `Vec<Event>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomSaved(Room),
    RoomDeleted { id: Id },
    GuestSaved(Guest),
    GuestDeleted { id: Id },
    ReservationSaved(Reservation),
    ReservationDeleted { id: Id },
    /// Written by compaction so ids of deleted rows stay retired.
    SequencesAdvanced(Sequences),
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub rooms: usize,
    pub guests: usize,
    pub reservations: usize,
    pub scheduled: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(s: &str) -> Timestamp {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn range_overlap_is_symmetric() {
        let a = DateRange::new(ts("2021-08-10T00:00:00+00:00"), ts("2021-08-22T00:00:00+00:00"));
        let b = DateRange::new(ts("2021-08-21T00:00:00+00:00"), ts("2021-08-30T00:00:00+00:00"));
        let c = DateRange::new(ts("2021-09-01T00:00:00+00:00"), ts("2021-09-02T00:00:00+00:00"));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn touching_ranges_overlap() {
        let a = DateRange::new(ts("2021-08-10T00:00:00+00:00"), ts("2021-08-20T12:00:00+00:00"));
        let b = DateRange::new(ts("2021-08-20T12:00:00+00:00"), ts("2021-08-25T00:00:00+00:00"));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn disjoint_ranges_do_not_overlap() {
        assert!(!overlaps(
            ts("2021-08-10T00:00:00.343959+00:00"),
            ts("2021-08-20T00:00:00.343959+00:00"),
            ts("2021-08-21T00:00:00.343959+00:00"),
            ts("2021-08-30T00:00:00.343959+00:00"),
        ));
    }

    #[test]
    fn one_second_gap_does_not_overlap() {
        assert!(!overlaps(
            ts("2021-08-10T00:00:00+00:00"),
            ts("2021-08-20T00:00:00+00:00"),
            ts("2021-08-20T00:00:01+00:00"),
            ts("2021-08-30T00:00:00+00:00"),
        ));
    }

    #[test]
    fn identical_and_nested_ranges_overlap() {
        let outer =
            DateRange::new(ts("2021-08-10T00:00:00+00:00"), ts("2021-08-22T00:00:00+00:00"));
        let inner =
            DateRange::new(ts("2021-08-12T00:00:00+00:00"), ts("2021-08-13T00:00:00+00:00"));
        assert!(outer.overlaps(&outer));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn overlap_compares_instants_across_offsets() {
        // 10:00+02:00 is 08:00Z, which touches the end of the first range.
        let a = DateRange::new(ts("2021-08-10T00:00:00Z"), ts("2021-08-10T08:00:00Z"));
        let b = DateRange::new(ts("2021-08-10T10:00:00+02:00"), ts("2021-08-11T10:00:00+02:00"));
        assert!(a.overlaps(&b));
    }

    #[test]
    #[should_panic(expected = "start must be before end")]
    fn reversed_range_panics() {
        overlaps(
            ts("2021-08-20T00:00:00Z"),
            ts("2021-08-10T00:00:00Z"),
            ts("2021-08-10T00:00:00Z"),
            ts("2021-08-11T00:00:00Z"),
        );
    }

    #[test]
    fn day_counts_truncate() {
        let start = ts("2021-08-10T00:00:00Z");
        let range = DateRange::new(start, start + Duration::hours(71));
        assert_eq!(range.stay_days(), 2);

        let now = (start - Duration::hours(47)).with_timezone(&Utc);
        assert_eq!(range.lead_days(now), 1);

        let past = (start + Duration::hours(5)).with_timezone(&Utc);
        assert_eq!(range.lead_days(past), 0);
    }

    #[test]
    fn status_text_roundtrip() {
        for status in [ReservationStatus::Scheduled, ReservationStatus::Canceled] {
            assert_eq!(status.as_str().parse::<ReservationStatus>(), Ok(status));
        }
        assert!("scheduled".parse::<ReservationStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&ReservationStatus::Canceled).unwrap(),
            "\"CANCELED\""
        );
    }

    #[test]
    fn sequences_never_reuse_observed_ids() {
        let mut seq = Sequences::default();
        assert_eq!(seq.allocate(EntityKind::Room), 1);
        seq.observe(EntityKind::Room, 7);
        assert_eq!(seq.allocate(EntityKind::Room), 8);
        seq.observe(EntityKind::Room, 3);
        assert_eq!(seq.allocate(EntityKind::Room), 9);
        assert_eq!(seq.allocate(EntityKind::Guest), 1);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ReservationSaved(Reservation {
            id: 4,
            room_id: 1,
            guest_id: 2,
            start_date: ts("2030-01-01T14:00:00-07:00"),
            end_date: ts("2030-01-03T11:00:00-07:00"),
            amount_of_guests: Some(2),
            status: ReservationStatus::Scheduled,
            created_at: ts("2029-12-01T00:00:00Z").with_timezone(&Utc),
            updated_at: None,
        });
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
