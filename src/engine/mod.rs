mod availability;
mod error;
mod mutations;
mod queries;
mod rules;
mod store;
mod txn;

pub use availability::{find_conflict, is_room_available};
pub use error::{EngineError, Violation};
pub use rules::{
    MAX_DAYS_IN_ADVANCE, MAX_STAY_DAYS, MIN_DAYS_BEFORE_RESERVATION_START, MIN_STAY_DAYS,
};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, RwLock};

use crate::model::*;
use crate::wal::Wal;

use store::Tables;
use txn::Transaction;

// ── WAL writer channel ───────────────────────────────────

pub(super) enum WalCommand {
    Append {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL file.
///
/// Commits hold the table write lock until their append is answered, so
/// appends arrive one at a time and each gets its own fsync.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { events, response } => {
                let flush_start = Instant::now();
                let result = wal.append(&events);
                metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                    .record(flush_start.elapsed().as_secs_f64());
                if let Err(e) = &result {
                    tracing::warn!("WAL append of {} events failed: {e}", events.len());
                }
                let _ = response.send(result);
            }
            WalCommand::Compact { events, response } => {
                let result = Wal::write_compact_file(wal.path(), &events)
                    .and_then(|()| wal.swap_compact_file());
                let _ = response.send(result);
            }
            WalCommand::AppendsSinceCompact { response } => {
                let _ = response.send(wal.appends_since_compact());
            }
        }
    }
}

/// Send one transaction's events to the WAL writer and wait for the fsync.
pub(super) async fn wal_append(
    wal_tx: &mpsc::Sender<WalCommand>,
    events: Vec<Event>,
) -> Result<(), EngineError> {
    let (tx, rx) = oneshot::channel();
    wal_tx
        .send(WalCommand::Append { events, response: tx })
        .await
        .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
    rx.await
        .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
        .map_err(|e| EngineError::WalError(e.to_string()))
}

/// Hotel tables plus the WAL that makes them durable.
///
/// Must be created inside a tokio runtime; the WAL writer runs as a
/// spawned task for the lifetime of the engine.
///
/// Every write goes through a validating operation. Transactions are
/// internal to the engine:
///
/// ```compile_fail
/// # async fn write_unchecked(engine: &innkeep::engine::Engine) {
/// let tx = engine.begin().await;
/// # }
/// ```
///
/// ```compile_fail
/// use innkeep::engine::Transaction;
/// ```
pub struct Engine {
    tables: Arc<RwLock<Tables>>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    replayed_entries: u64,
}

impl Engine {
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let replay = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let mut tables = Tables::new();
        for event in &replay.events {
            tables.apply_event(event);
        }
        tracing::debug!(
            "replayed {} WAL entries ({} events) from {}",
            replay.entries,
            replay.events.len(),
            wal_path.display()
        );

        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
            wal_tx,
            replayed_entries: replay.entries,
        })
    }

    /// Open a transaction. Blocks other transactions and readers until it
    /// commits or rolls back.
    pub(crate) async fn begin(&self) -> Transaction {
        let guard = self.tables.clone().write_owned().await;
        Transaction::new(guard, self.wal_tx.clone())
    }

    /// Number of WAL entries read when the engine was opened.
    pub fn replayed_entries(&self) -> u64 {
        self.replayed_entries
    }

    pub(super) async fn read_tables(&self) -> tokio::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }
}
