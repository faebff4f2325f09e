pub mod client;
pub mod enums;
pub mod user;

pub use client::*;
pub use enums::*;
pub use user::*;

use chrono::{Duration, NaiveDateTime};

/// Storage format for every timestamp column (server-local, microseconds).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Current server-local time.
pub fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts rows written without fractional seconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Next `updated_at` value: now, or one microsecond past `previous` when the
/// clock has not advanced (or went backwards).
pub fn next_update_stamp(previous: &NaiveDateTime) -> NaiveDateTime {
    let now = now_local();
    if now > *previous {
        now
    } else {
        *previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trips_with_microseconds() {
        let ts = NaiveDateTime::parse_from_str("2026-03-04 05:06:07.123456", TIMESTAMP_FORMAT)
            .unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(&ts)), Some(ts));
    }

    #[test]
    fn parse_accepts_whole_seconds() {
        assert!(parse_timestamp("2026-03-04 05:06:07").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn update_stamp_moves_past_future_previous() {
        let future = now_local() + Duration::hours(1);
        let next = next_update_stamp(&future);
        assert!(next > future);
    }
}
