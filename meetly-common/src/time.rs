//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds elapsed between two instants, never negative
///
/// Clock skew between the stored join time and `to` contributes zero rather
/// than shrinking an accumulated duration.
pub fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().max(0)
}
