//! Wall clock in cache units (epoch seconds)

use chrono::Utc;

/// Current time as epoch seconds.
#[must_use]
pub fn now_epoch_secs() -> i64 {
    Utc::now().timestamp()
}
