use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

// Fast path: returns 0 on any error instead of double error handling
#[inline]
pub fn get_current_time_or_zero() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Current instant truncated to the millisecond, the precision dates are stored with.
#[inline]
pub fn now_millis() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

#[inline]
pub fn truncate_to_millis(date: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(date.timestamp_millis()).unwrap_or(date)
}
