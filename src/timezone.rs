//! Resolves the server's configured timezone to the current date.

use time::{Date, OffsetDateTime};
use time_tz::{Offset, TimeZone};

/// The current date in `canonical_timezone`, e.g. "Pacific/Auckland".
///
/// Returns `None` if the name is not a known canonical timezone. The month
/// window for the dashboard summary is anchored to this date, so a server
/// configured for its users' timezone rolls the month over at their
/// midnight, not UTC's.
pub fn today_in(canonical_timezone: &str) -> Option<Date> {
    let timezone = time_tz::timezones::get_by_name(canonical_timezone)?;
    let now = OffsetDateTime::now_utc();

    Some(now.to_offset(timezone.get_offset_utc(&now).to_utc()).date())
}

#[cfg(test)]
mod timezone_tests {
    use super::today_in;

    #[test]
    fn resolves_known_timezones() {
        assert!(today_in("Etc/UTC").is_some());
        assert!(today_in("Pacific/Auckland").is_some());
    }

    #[test]
    fn rejects_unknown_timezone() {
        assert_eq!(today_in("Middle/Nowhere"), None);
    }
}
