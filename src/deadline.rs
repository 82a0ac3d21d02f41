//! Response deadline policy

use chrono::{DateTime, Duration, Utc};

use crate::message::Priority;

/// Minutes allowed for a response at a given priority.
///
/// `default_minutes` only applies to `Low`; every other priority has a fixed
/// window.
pub fn deadline_minutes(priority: Priority, default_minutes: i64) -> i64 {
    match priority {
        Priority::Emergency => 5,
        Priority::Critical => 30,
        Priority::High => 60,
        Priority::Medium => 120,
        Priority::Low => default_minutes,
    }
}

/// Absolute response deadline for a message created at `now`
pub fn deadline(priority: Priority, default_minutes: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(deadline_minutes(priority, default_minutes))
}
