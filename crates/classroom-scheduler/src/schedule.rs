//! Timing helpers for the §4.8 event handlers.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// One minute past the UTC midnight following `from` — where
/// `overview_statistics` reschedules its own follow-up run (§4.8).
pub fn next_midnight_plus_one_minute(from: DateTime<Utc>) -> DateTime<Utc> {
    let next_day = (from + Duration::days(1)).date_naive();
    let at = next_day
        .and_hms_opt(0, 1, 0)
        .expect("00:01:00 is always a valid time");
    Utc.from_utc_datetime(&at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lands_one_minute_after_midnight_the_next_day() {
        let from = Utc.with_ymd_and_hms(2026, 7, 28, 15, 30, 0).unwrap();
        let next = next_midnight_plus_one_minute(from);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 7, 29, 0, 1, 0).unwrap());
    }
}
