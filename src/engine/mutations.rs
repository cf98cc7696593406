use std::future::Future;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::fields::{Fields, GuestPatch, Mode, ReservationPatch, RoomPatch};
use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::rules::{evaluate, now, RuleSet};
use super::txn::Transaction;
use super::{Engine, EngineError, WalCommand};

/// Await `op`, recording its outcome under `operation`.
pub(super) async fn observed<T>(
    operation: &'static str,
    op: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    let started = Instant::now();
    let result = op.await;
    observability::record_operation(operation, started, &result);
    if let Err(e) = &result {
        tracing::debug!("{operation} failed: {e}");
    }
    result
}

impl Engine {
    // ── Reservations ─────────────────────────────────────────

    /// Validate and store a new reservation. Returns its id.
    pub async fn create_reservation(&self, fields: &Fields) -> Result<Id, EngineError> {
        observed("create_reservation", async {
            let patch = ReservationPatch::from_fields(fields, Mode::Create)?;
            let mut tx = self.begin().await;
            let staged = stage_new_reservation(&mut tx, patch);
            let id = tx.finish(staged).await?;
            tracing::info!("reservation {id} created");
            Ok(id)
        })
        .await
    }

    /// Apply a partial update. Date rules and availability are re-checked
    /// only when the change touches the schedule and the result is SCHEDULED.
    pub async fn update_reservation(
        &self,
        id: Id,
        fields: &Fields,
    ) -> Result<Reservation, EngineError> {
        observed("update_reservation", async {
            let patch = ReservationPatch::from_fields(fields, Mode::Update)?;
            check_path_id(patch.id, id)?;

            let mut tx = self.begin().await;
            let staged = stage_reservation_update(&mut tx, id, patch);
            let reservation = tx.finish(staged).await?;
            tracing::info!("reservation {id} updated (status {})", reservation.status);
            Ok(reservation)
        })
        .await
    }

    pub async fn delete_reservation(&self, id: Id) -> Result<(), EngineError> {
        observed("delete_reservation", async {
            let mut tx = self.begin().await;
            let staged = stage_reservation_removal(&mut tx, id);
            tx.finish(staged).await?;
            tracing::info!("reservation {id} deleted");
            Ok(())
        })
        .await
    }

    // ── Rooms ────────────────────────────────────────────────

    pub async fn create_room(&self, fields: &Fields) -> Result<Id, EngineError> {
        observed("create_room", async {
            let patch = RoomPatch::from_fields(fields, Mode::Create)?;
            let mut tx = self.begin().await;
            let staged = if tx.tables().room_count() >= MAX_ROOMS {
                Err(EngineError::LimitExceeded("too many rooms"))
            } else {
                let id = tx.allocate(EntityKind::Room);
                tx.save_room(patch.into_room(id, now()));
                Ok(id)
            };
            let id = tx.finish(staged).await?;
            tracing::info!("room {id} created");
            Ok(id)
        })
        .await
    }

    pub async fn update_room(&self, id: Id, fields: &Fields) -> Result<Room, EngineError> {
        observed("update_room", async {
            let patch = RoomPatch::from_fields(fields, Mode::Update)?;
            check_path_id(patch.id, id)?;

            let mut tx = self.begin().await;
            let staged = tx.room(id).cloned().map(|mut room| {
                patch.apply_to(&mut room);
                room.updated_at = Some(now());
                tx.save_room(room.clone());
                room
            });
            let room = tx.finish(staged).await?;
            tracing::info!("room {id} updated");
            Ok(room)
        })
        .await
    }

    /// Delete a room together with every reservation that references it.
    pub async fn delete_room(&self, id: Id) -> Result<(), EngineError> {
        observed("delete_room", async {
            let mut tx = self.begin().await;
            let staged = stage_room_removal(&mut tx, id);
            let removed = tx.finish(staged).await?;
            tracing::info!("room {id} deleted with {removed} reservations");
            Ok(())
        })
        .await
    }

    // ── Guests ───────────────────────────────────────────────

    pub async fn create_guest(&self, fields: &Fields) -> Result<Id, EngineError> {
        observed("create_guest", async {
            let patch = GuestPatch::from_fields(fields, Mode::Create)?;
            let mut tx = self.begin().await;
            let staged = if tx.tables().guest_count() >= MAX_GUESTS {
                Err(EngineError::LimitExceeded("too many guests"))
            } else {
                let id = tx.allocate(EntityKind::Guest);
                tx.save_guest(patch.into_guest(id, now()));
                Ok(id)
            };
            let id = tx.finish(staged).await?;
            tracing::info!("guest {id} created");
            Ok(id)
        })
        .await
    }

    pub async fn update_guest(&self, id: Id, fields: &Fields) -> Result<Guest, EngineError> {
        observed("update_guest", async {
            let patch = GuestPatch::from_fields(fields, Mode::Update)?;
            let mut tx = self.begin().await;
            let staged = tx.guest(id).cloned().map(|mut guest| {
                patch.apply_to(&mut guest);
                guest.updated_at = Some(now());
                tx.save_guest(guest.clone());
                guest
            });
            let guest = tx.finish(staged).await?;
            tracing::info!("guest {id} updated");
            Ok(guest)
        })
        .await
    }

    /// Rejected while any reservation still references the guest.
    pub async fn delete_guest(&self, id: Id) -> Result<(), EngineError> {
        observed("delete_guest", async {
            let mut tx = self.begin().await;
            let staged = stage_guest_removal(&mut tx, id);
            tx.finish(staged).await?;
            tracing::info!("guest {id} deleted");
            Ok(())
        })
        .await
    }

    // ── WAL maintenance ──────────────────────────────────────

    /// Rewrite the WAL as a single entry holding the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        // Hold the read lock so no transaction commits between the
        // snapshot and the file swap.
        let tables = self.read_tables().await;
        let events = tables.snapshot();
        let count = events.len();

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        drop(tables);

        metrics::counter!(observability::WAL_COMPACTIONS_TOTAL).increment(1);
        tracing::info!("WAL compacted to {count} events");
        Ok(())
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

fn check_path_id(body_id: Option<Id>, path_id: Id) -> Result<(), EngineError> {
    match body_id {
        Some(body_id) if body_id != path_id => Err(EngineError::InvalidField {
            field: "id",
            reason: "does not match the id being updated",
        }),
        _ => Ok(()),
    }
}

fn stage_new_reservation(tx: &mut Transaction, patch: ReservationPatch) -> Result<Id, EngineError> {
    if tx.tables().reservation_count() >= MAX_RESERVATIONS {
        return Err(EngineError::LimitExceeded("too many reservations"));
    }
    let now = now();
    let id = tx.allocate(EntityKind::Reservation);
    let reservation = patch.into_reservation(id, now)?;
    evaluate(tx.tables(), &reservation, RuleSet::ALL, None, now)?;
    tx.save_reservation(reservation);
    Ok(id)
}

fn stage_reservation_update(
    tx: &mut Transaction,
    id: Id,
    patch: ReservationPatch,
) -> Result<Reservation, EngineError> {
    let mut reservation = tx.reservation(id)?.clone();
    let touches_schedule = patch.touches_schedule();
    patch.apply_to(&mut reservation);

    let rules = RuleSet {
        date_window: touches_schedule && reservation.is_scheduled(),
        room_and_guest: true,
    };
    let now = now();
    evaluate(tx.tables(), &reservation, rules, Some(id), now)?;

    reservation.updated_at = Some(now);
    tx.save_reservation(reservation.clone());
    Ok(reservation)
}

fn stage_reservation_removal(tx: &mut Transaction, id: Id) -> Result<(), EngineError> {
    tx.reservation(id)?;
    tx.delete_reservation(id);
    Ok(())
}

/// Stage the room delete and its cascade. Returns the number of reservations removed.
fn stage_room_removal(tx: &mut Transaction, id: Id) -> Result<usize, EngineError> {
    tx.room(id)?;
    let reservations: Vec<Id> = tx
        .reservations()
        .filter(|r| r.room_id == id)
        .map(|r| r.id)
        .collect();
    for reservation_id in &reservations {
        tx.delete_reservation(*reservation_id);
    }
    tx.delete_room(id);
    Ok(reservations.len())
}

fn stage_guest_removal(tx: &mut Transaction, id: Id) -> Result<(), EngineError> {
    tx.guest(id)?;
    if tx.reservations().any(|r| r.guest_id == id) {
        return Err(EngineError::HasReservations(EntityKind::Guest, id));
    }
    tx.delete_guest(id);
    Ok(())
}
