//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Wall-clock milliseconds since the Unix epoch.
///
/// Whole seconds times 1000 plus the sub-second microseconds divided by
/// 1000, so any sub-millisecond remainder is truncated.
pub fn current_timestamp_ms() -> i64 {
    timestamp_ms(&now())
}

/// Millisecond timestamp of `at`, truncating sub-millisecond precision.
pub fn timestamp_ms(at: &DateTime<Utc>) -> i64 {
    at.timestamp() * 1000 + i64::from(at.timestamp_subsec_micros() / 1000)
}
