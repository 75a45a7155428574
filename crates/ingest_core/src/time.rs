//! Timestamp helper.

use chrono::{DateTime, Utc};

/// Current UTC time. A thin wrapper so call sites depend on this crate
/// rather than reaching for `chrono::Utc::now()` directly, keeping the
/// one place that would need faking under test central.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}
