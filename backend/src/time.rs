use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// UTC calendar day an instant belongs to. Daily histories and tables are
/// keyed by it.
pub fn trading_day(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Time left until the next wall-clock multiple of `interval`.
///
/// On an exact boundary a full interval is returned, so a tick that finishes
/// instantly never fires twice for the same slot.
pub fn until_next_tick(now: DateTime<Utc>, interval: Duration) -> Duration {
    let interval_ms = interval.as_millis().max(1) as i64;
    let elapsed = now.timestamp_millis().rem_euclid(interval_ms);
    Duration::from_millis((interval_ms - elapsed) as u64)
}
