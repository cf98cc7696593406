use crate::engine::{EngineError, Violation};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total engine operations. Labels: operation, status.
pub const OPERATIONS_TOTAL: &str = "innkeep_operations_total";

/// Histogram: operation latency in seconds. Labels: operation.
pub const OPERATION_DURATION_SECONDS: &str = "innkeep_operation_duration_seconds";

/// Counter: reservation rule violations. Labels: rule.
pub const VIOLATIONS_TOTAL: &str = "innkeep_violations_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: rows per table after the last committed mutation. Labels: table.
pub const TABLE_ROWS: &str = "innkeep_table_rows";

/// Histogram: WAL append + fsync duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "innkeep_wal_flush_duration_seconds";

/// Counter: WAL compactions run.
pub const WAL_COMPACTIONS_TOTAL: &str = "innkeep_wal_compactions_total";

/// Short label for the `status` of an operation.
pub fn status_label(result: &Result<(), &EngineError>) -> &'static str {
    match result {
        Ok(()) => "ok",
        Err(EngineError::NotFound(..)) => "not_found",
        Err(EngineError::Rejected(_)) => "rejected",
        Err(
            EngineError::EmptyRequest
            | EngineError::UnknownFields(_)
            | EngineError::MissingFields(_)
            | EngineError::InvalidField { .. },
        ) => "bad_request",
        Err(EngineError::HasReservations(..)) => "conflict",
        Err(EngineError::LimitExceeded(_)) => "limit_exceeded",
        Err(EngineError::WalError(_)) => "wal_error",
    }
}

pub fn violation_label(violation: &Violation) -> &'static str {
    match violation {
        Violation::TimezoneMissing => "timezone_missing",
        Violation::EndNotAfterStart => "end_not_after_start",
        Violation::StayTooLong { .. } => "stay_too_long",
        Violation::StayTooShort { .. } => "stay_too_short",
        Violation::StartsTooSoon { .. } => "starts_too_soon",
        Violation::StartsTooFarAhead { .. } => "starts_too_far_ahead",
        Violation::RoomInactive(_) => "room_inactive",
        Violation::GuestInactive(_) => "guest_inactive",
        Violation::CapacityExceeded { .. } => "capacity_exceeded",
        Violation::RoomUnavailable { .. } => "room_unavailable",
    }
}

/// Record the outcome and latency of one engine operation.
pub fn record_operation<T>(
    operation: &'static str,
    started: std::time::Instant,
    result: &Result<T, EngineError>,
) {
    let status = status_label(&result.as_ref().map(|_| ()));
    metrics::counter!(OPERATIONS_TOTAL, "operation" => operation, "status" => status).increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
    if let Err(err) = result {
        for violation in err.violations() {
            metrics::counter!(VIOLATIONS_TOTAL, "rule" => violation_label(violation)).increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(status_label(&Ok(())), "ok");
        assert_eq!(
            status_label(&Err(&EngineError::Rejected(vec![Violation::EndNotAfterStart]))),
            "rejected"
        );
        assert_eq!(
            status_label(&Err(&EngineError::UnknownFields(vec!["x".into()]))),
            "bad_request"
        );
        assert_eq!(
            violation_label(&Violation::RoomUnavailable {
                room_id: 1,
                conflicting: 2
            }),
            "room_unavailable"
        );
    }

    #[test]
    fn recording_without_recorder_is_a_noop() {
        let result: Result<u64, EngineError> = Err(EngineError::Rejected(vec![
            Violation::StayTooLong { days: 4 },
            Violation::GuestInactive(2),
        ]));
        record_operation("create_reservation", std::time::Instant::now(), &result);
    }
}
