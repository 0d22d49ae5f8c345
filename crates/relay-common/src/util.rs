//! Small helpers shared by relay services.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// Returns a random identifier (a v4 UUID in hyphenated form).
#[must_use]
pub fn random_id() -> String {
    Uuid::new_v4().to_string()
}

/// Midnight UTC at the start of the given calendar date.
#[must_use]
pub fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
