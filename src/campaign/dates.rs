//! Whole-day date arithmetic for the campaign calendar.

use chrono::{Days, Local, NaiveDate, Utc};

/// Signed day count from `first` to `second` (positive when `second` is
/// later).
pub fn days_between(first: NaiveDate, second: NaiveDate) -> i32 {
    second.signed_duration_since(first).num_days() as i32
}

pub fn next_day(d: NaiveDate) -> NaiveDate {
    d.checked_add_days(Days::new(1))
        .expect("campaign dates stay far away from the calendar limits")
}

pub fn add_days(d: NaiveDate, days: i32) -> NaiveDate {
    if days >= 0 {
        d.checked_add_days(Days::new(days as u64))
    } else {
        d.checked_sub_days(Days::new((-days) as u64))
    }
    .expect("campaign dates stay far away from the calendar limits")
}

/// The wall-clock date in the local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// UTC seconds since the epoch, stamped on generated records.
pub fn utc_now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Margins within half a tenth of a point of zero are reported as exactly
/// zero, so a near-tie renders as a tie instead of D+0.0 or R+0.0.
pub fn round_margin(margin: f64) -> f64 {
    if (margin * 10.0).round() == 0.0 {
        return 0.0;
    }
    margin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_days_between() {
        assert_eq!(days_between(d(2020, 11, 1), d(2020, 11, 3)), 2);
        assert_eq!(days_between(d(2020, 11, 3), d(2020, 11, 1)), -2);
        assert_eq!(days_between(d(2020, 2, 28), d(2020, 3, 1)), 2); // leap year
    }

    #[test]
    fn test_next_day_month_boundary() {
        assert_eq!(next_day(d(2020, 10, 31)), d(2020, 11, 1));
    }

    #[test]
    fn test_add_days_negative() {
        assert_eq!(add_days(d(2020, 3, 1), -60), d(2020, 1, 1));
    }

    #[test]
    fn test_round_margin_zeroes_near_ties() {
        assert_eq!(round_margin(0.04), 0.0);
        assert_eq!(round_margin(-0.04), 0.0);
        assert_eq!(round_margin(0.3), 0.3);
        assert_eq!(round_margin(-2.5), -2.5);
    }
}
