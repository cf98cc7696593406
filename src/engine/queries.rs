use crate::fields::{AvailabilityQuery, Fields};
use crate::model::*;

use super::availability::is_room_available;
use super::mutations::observed;
use super::{Engine, EngineError, Violation};

impl Engine {
    // ── Availability ─────────────────────────────────────────

    /// True when no other SCHEDULED reservation of the room overlaps
    /// `[start, end]`. `exclude` leaves one reservation out of the check.
    pub async fn check_room_availability(
        &self,
        room_id: Id,
        start: Timestamp,
        end: Timestamp,
        exclude: Option<Id>,
    ) -> Result<bool, EngineError> {
        observed("check_room_availability", async {
            if start >= end {
                return Err(EngineError::Rejected(vec![Violation::EndNotAfterStart]));
            }
            let range = DateRange::new(start, end);
            let tables = self.read_tables().await;
            if tables.room(room_id).is_none() {
                return Err(EngineError::NotFound(EntityKind::Room, room_id));
            }
            Ok(is_room_available(tables.reservations(), room_id, &range, exclude))
        })
        .await
    }

    /// Field-map form of `check_room_availability`.
    pub async fn check_room_availability_fields(
        &self,
        fields: &Fields,
    ) -> Result<bool, EngineError> {
        let query = AvailabilityQuery::from_fields(fields)?;
        self.check_room_availability(query.room_id, query.start_date, query.end_date, query.exclude)
            .await
    }

    // ── Reservations ─────────────────────────────────────────

    pub async fn get_reservation(&self, id: Id) -> Result<Reservation, EngineError> {
        self.read_tables()
            .await
            .reservation(id)
            .cloned()
            .ok_or(EngineError::NotFound(EntityKind::Reservation, id))
    }

    pub async fn list_reservations(&self) -> Vec<Reservation> {
        self.read_tables().await.reservations().cloned().collect()
    }

    pub async fn reservations_for_room(
        &self,
        room_id: Id,
    ) -> Result<Vec<Reservation>, EngineError> {
        let tables = self.read_tables().await;
        if tables.room(room_id).is_none() {
            return Err(EngineError::NotFound(EntityKind::Room, room_id));
        }
        Ok(tables
            .reservations()
            .filter(|r| r.room_id == room_id)
            .cloned()
            .collect())
    }

    pub async fn reservations_for_guest(
        &self,
        guest_id: Id,
    ) -> Result<Vec<Reservation>, EngineError> {
        let tables = self.read_tables().await;
        if tables.guest(guest_id).is_none() {
            return Err(EngineError::NotFound(EntityKind::Guest, guest_id));
        }
        Ok(tables
            .reservations()
            .filter(|r| r.guest_id == guest_id)
            .cloned()
            .collect())
    }

    // ── Rooms and guests ─────────────────────────────────────

    pub async fn get_room(&self, id: Id) -> Result<Room, EngineError> {
        self.read_tables()
            .await
            .room(id)
            .cloned()
            .ok_or(EngineError::NotFound(EntityKind::Room, id))
    }

    pub async fn list_rooms(&self) -> Vec<Room> {
        self.read_tables().await.rooms().cloned().collect()
    }

    pub async fn get_guest(&self, id: Id) -> Result<Guest, EngineError> {
        self.read_tables()
            .await
            .guest(id)
            .cloned()
            .ok_or(EngineError::NotFound(EntityKind::Guest, id))
    }

    pub async fn list_guests(&self) -> Vec<Guest> {
        self.read_tables().await.guests().cloned().collect()
    }

    pub async fn stats(&self) -> Stats {
        self.read_tables().await.stats()
    }
}
