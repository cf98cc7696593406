use tokio::sync::{mpsc, OwnedRwLockWriteGuard};

use crate::model::*;

use super::store::Tables;
use super::{wal_append, EngineError, WalCommand};

/// Exclusive unit of work over the tables.
///
/// Holds the table write lock from `Engine::begin` until commit or rollback.
/// Writes are staged and only reach the WAL and the tables on `commit`.
/// Reads see committed state. Dropping an unfinished transaction rolls it back.
pub(crate) struct Transaction {
    tables: OwnedRwLockWriteGuard<Tables>,
    wal_tx: mpsc::Sender<WalCommand>,
    sequences: Sequences,
    staged: Vec<Event>,
    finished: bool,
}

impl Transaction {
    pub(super) fn new(
        tables: OwnedRwLockWriteGuard<Tables>,
        wal_tx: mpsc::Sender<WalCommand>,
    ) -> Self {
        let sequences = tables.sequences();
        Self {
            tables,
            wal_tx,
            sequences,
            staged: Vec::new(),
            finished: false,
        }
    }

    pub(super) fn tables(&self) -> &Tables {
        &self.tables
    }

    pub(super) fn room(&self, id: Id) -> Result<&Room, EngineError> {
        self.tables
            .room(id)
            .ok_or(EngineError::NotFound(EntityKind::Room, id))
    }

    pub(super) fn guest(&self, id: Id) -> Result<&Guest, EngineError> {
        self.tables
            .guest(id)
            .ok_or(EngineError::NotFound(EntityKind::Guest, id))
    }

    pub(super) fn reservation(&self, id: Id) -> Result<&Reservation, EngineError> {
        self.tables
            .reservation(id)
            .ok_or(EngineError::NotFound(EntityKind::Reservation, id))
    }

    pub(super) fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.tables.reservations()
    }

    /// Next id for `kind`. Returned to nobody if the transaction rolls back.
    pub(super) fn allocate(&mut self, kind: EntityKind) -> Id {
        self.sequences.allocate(kind)
    }

    pub(super) fn save_room(&mut self, room: Room) {
        self.staged.push(Event::RoomSaved(room));
    }

    pub(super) fn save_guest(&mut self, guest: Guest) {
        self.staged.push(Event::GuestSaved(guest));
    }

    pub(super) fn save_reservation(&mut self, reservation: Reservation) {
        self.staged.push(Event::ReservationSaved(reservation));
    }

    pub(super) fn delete_room(&mut self, id: Id) {
        self.staged.push(Event::RoomDeleted { id });
    }

    pub(super) fn delete_guest(&mut self, id: Id) {
        self.staged.push(Event::GuestDeleted { id });
    }

    pub(super) fn delete_reservation(&mut self, id: Id) {
        self.staged.push(Event::ReservationDeleted { id });
    }

    /// Write staged events as one WAL entry, then apply them.
    /// Nothing is applied if the WAL write fails.
    pub(super) async fn commit(mut self) -> Result<(), EngineError> {
        self.finished = true;
        if self.staged.is_empty() {
            return Ok(());
        }
        let events = std::mem::take(&mut self.staged);
        if let Err(e) = wal_append(&self.wal_tx, events.clone()).await {
            tracing::warn!("transaction of {} events not committed: {e}", events.len());
            return Err(e);
        }
        for event in &events {
            self.tables.apply_event(event);
        }
        for (table, rows) in [
            ("rooms", self.tables.room_count()),
            ("guests", self.tables.guest_count()),
            ("reservations", self.tables.reservation_count()),
        ] {
            metrics::gauge!(crate::observability::TABLE_ROWS, "table" => table).set(rows as f64);
        }
        Ok(())
    }

    pub(super) fn rollback(mut self) {
        self.finished = true;
        tracing::debug!("transaction rolled back, {} staged events discarded", self.staged.len());
    }

    /// Commit when `staged` is `Ok`, roll back otherwise.
    pub(super) async fn finish<T>(self, staged: Result<T, EngineError>) -> Result<T, EngineError> {
        match staged {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished && !self.staged.is_empty() {
            tracing::debug!("transaction dropped, discarding {} staged events", self.staged.len());
        }
    }
}
