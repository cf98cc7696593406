use std::collections::BTreeMap;

use crate::model::*;

/// Committed state. Rows are keyed by id so listings come out in id order.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    rooms: BTreeMap<Id, Room>,
    guests: BTreeMap<Id, Guest>,
    reservations: BTreeMap<Id, Reservation>,
    sequences: Sequences,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lookups ──────────────────────────────────────────────

    pub fn room(&self, id: Id) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn guest(&self, id: Id) -> Option<&Guest> {
        self.guests.get(&id)
    }

    pub fn reservation(&self, id: Id) -> Option<&Reservation> {
        self.reservations.get(&id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn guests(&self) -> impl Iterator<Item = &Guest> {
        self.guests.values()
    }

    pub fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn guest_count(&self) -> usize {
        self.guests.len()
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    pub fn sequences(&self) -> Sequences {
        self.sequences
    }

    // ── Event application ────────────────────────────────────

    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::RoomSaved(room) => {
                self.sequences.observe(EntityKind::Room, room.id);
                self.rooms.insert(room.id, room.clone());
            }
            Event::RoomDeleted { id } => {
                self.rooms.remove(id);
            }
            Event::GuestSaved(guest) => {
                self.sequences.observe(EntityKind::Guest, guest.id);
                self.guests.insert(guest.id, guest.clone());
            }
            Event::GuestDeleted { id } => {
                self.guests.remove(id);
            }
            Event::ReservationSaved(reservation) => {
                self.sequences
                    .observe(EntityKind::Reservation, reservation.id);
                self.reservations.insert(reservation.id, reservation.clone());
            }
            Event::ReservationDeleted { id } => {
                self.reservations.remove(id);
            }
            Event::SequencesAdvanced(seq) => {
                self.sequences.room = self.sequences.room.max(seq.room);
                self.sequences.guest = self.sequences.guest.max(seq.guest);
                self.sequences.reservation = self.sequences.reservation.max(seq.reservation);
            }
        }
    }

    /// Minimal event list that recreates this state, sequences first.
    pub fn snapshot(&self) -> Vec<Event> {
        let mut events = Vec::with_capacity(
            1 + self.rooms.len() + self.guests.len() + self.reservations.len(),
        );
        events.push(Event::SequencesAdvanced(self.sequences));
        events.extend(self.rooms.values().cloned().map(Event::RoomSaved));
        events.extend(self.guests.values().cloned().map(Event::GuestSaved));
        events.extend(
            self.reservations
                .values()
                .cloned()
                .map(Event::ReservationSaved),
        );
        events
    }

    pub fn stats(&self) -> Stats {
        Stats {
            rooms: self.rooms.len(),
            guests: self.guests.len(),
            reservations: self.reservations.len(),
            scheduled: self.reservations.values().filter(|r| r.is_scheduled()).count(),
        }
    }
}
