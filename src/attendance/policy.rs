use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, Timelike, Utc, Weekday};
use once_cell::sync::Lazy;
use serde::Serialize;
use strum_macros::AsRefStr;
use thiserror::Error;
use utoipa::ToSchema;

use crate::attendance::geo::Geofence;

/// Western Indonesia Time (WIB), UTC+7.
pub const CIVIL_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// National holidays on which the office is closed.
const HOLIDAY_DATES: &[(i32, u32, u32)] = &[
    (2025, 1, 1),
    (2025, 1, 27),
    (2025, 1, 29),
    (2025, 3, 29),
    (2025, 3, 31),
    (2025, 4, 1),
    (2025, 4, 18),
    (2025, 5, 1),
    (2025, 5, 12),
    (2025, 5, 29),
    (2025, 6, 6),
    (2025, 6, 27),
    (2025, 8, 17),
    (2025, 9, 5),
    (2025, 12, 25),
    (2026, 1, 1),
    (2026, 1, 16),
    (2026, 2, 17),
    (2026, 3, 19),
    (2026, 3, 20),
    (2026, 4, 3),
    (2026, 5, 1),
    (2026, 5, 14),
    (2026, 5, 27),
    (2026, 5, 31),
    (2026, 6, 1),
    (2026, 6, 16),
    (2026, 8, 17),
    (2026, 8, 25),
    (2026, 12, 25),
];

static HOLIDAYS: Lazy<BTreeSet<NaiveDate>> = Lazy::new(|| {
    HOLIDAY_DATES
        .iter()
        .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .collect()
});

/// Why a scan was refused by the eligibility window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutsideWindow {
    #[error("Attendance is closed on Sundays")]
    RestDay,
    #[error("Attendance is closed on public holidays")]
    Holiday,
    #[error("Attendance has not opened yet")]
    TooEarly,
    #[error("Attendance has closed for today")]
    TooLate,
}

/// A server instant projected onto the civil calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilMoment {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Every attendance rule in one place, shared by the scan engine and the
/// reporting queries.
#[derive(Debug, Clone)]
pub struct AttendancePolicy {
    pub offset: FixedOffset,
    pub rest_day: Weekday,
    pub partial_day: Weekday,
    pub holidays: BTreeSet<NaiveDate>,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub partial_day_end: NaiveTime,
    pub late_cutoff: NaiveTime,
    pub location_timeout: Duration,
    pub duplicate_window: Duration,
    pub require_location: bool,
    pub geofence: Option<Geofence>,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(CIVIL_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix()),
            rest_day: Weekday::Sun,
            partial_day: Weekday::Sat,
            holidays: HOLIDAYS.clone(),
            window_start: hm(8, 0),
            window_end: hm(16, 0),
            partial_day_end: hm(12, 0),
            late_cutoff: hm(11, 0),
            location_timeout: Duration::from_secs(5),
            duplicate_window: Duration::from_secs(10),
            require_location: false,
            geofence: None,
        }
    }
}

impl AttendancePolicy {
    pub fn civil(&self, instant: DateTime<Utc>) -> CivilMoment {
        let local = instant.with_timezone(&self.offset);
        CivilMoment {
            date: local.date_naive(),
            time: local.time(),
        }
    }

    pub fn civil_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.civil(instant).date
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Opening hours for `date`, or the reason the office is closed all day.
    pub fn window_for(&self, date: NaiveDate) -> Result<(NaiveTime, NaiveTime), OutsideWindow> {
        let weekday = date.weekday();
        if weekday == self.rest_day {
            return Err(OutsideWindow::RestDay);
        }
        if self.is_holiday(date) {
            return Err(OutsideWindow::Holiday);
        }

        let end = if weekday == self.partial_day {
            self.partial_day_end
        } else {
            self.window_end
        };
        Ok((self.window_start, end))
    }

    /// Checks `instant` against the window `[start, end)` of its civil date.
    pub fn check_window(&self, instant: DateTime<Utc>) -> Result<CivilMoment, OutsideWindow> {
        let moment = self.civil(instant);
        let (start, end) = self.window_for(moment.date)?;

        if moment.time < start {
            return Err(OutsideWindow::TooEarly);
        }
        if moment.time >= end {
            return Err(OutsideWindow::TooLate);
        }
        Ok(moment)
    }

    /// A check-in is late when its civil time-of-day is after the cutoff.
    pub fn is_late(&self, instant: DateTime<Utc>) -> bool {
        let time = self.civil(instant).time;
        // sub-second precision never makes a scan late on its own
        let time = time.with_nanosecond(0).unwrap_or(time);
        time > self.late_cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::test_support::civil_instant;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case::tuesday_open(2025, 6, 10, 8, 0, Ok(()))]
    #[case::tuesday_before_open(2025, 6, 10, 7, 59, Err(OutsideWindow::TooEarly))]
    #[case::tuesday_last_minute(2025, 6, 10, 15, 59, Ok(()))]
    #[case::tuesday_closing(2025, 6, 10, 16, 0, Err(OutsideWindow::TooLate))]
    #[case::tuesday_evening(2025, 6, 10, 17, 0, Err(OutsideWindow::TooLate))]
    #[case::saturday_morning(2025, 6, 14, 11, 59, Ok(()))]
    #[case::saturday_noon(2025, 6, 14, 12, 0, Err(OutsideWindow::TooLate))]
    #[case::saturday_after_noon(2025, 6, 14, 12, 1, Err(OutsideWindow::TooLate))]
    #[case::sunday_midday(2025, 6, 15, 10, 0, Err(OutsideWindow::RestDay))]
    #[case::sunday_early(2025, 6, 15, 6, 0, Err(OutsideWindow::RestDay))]
    #[case::monday_after_independence_day(2025, 8, 18, 9, 0, Ok(()))]
    #[case::holiday(2025, 5, 1, 9, 0, Err(OutsideWindow::Holiday))]
    fn window_cases(
        #[case] y: i32,
        #[case] m: u32,
        #[case] d: u32,
        #[case] hh: u32,
        #[case] mm: u32,
        #[case] expected: Result<(), OutsideWindow>,
    ) {
        let policy = AttendancePolicy::default();
        let result = policy.check_window(civil_instant(y, m, d, hh, mm)).map(|_| ());
        assert_eq!(result, expected);
    }

    #[test]
    fn civil_date_uses_fixed_offset_not_utc() {
        let policy = AttendancePolicy::default();
        // 2025-06-09 18:30 UTC is already 01:30 on the 10th in WIB
        let instant = Utc.with_ymd_and_hms(2025, 6, 9, 18, 30, 0).unwrap();
        let moment = policy.civil(instant);
        assert_eq!(moment.date, NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
        assert_eq!(moment.time, hm(1, 30));
    }

    #[test]
    fn rest_day_wins_over_holiday() {
        let mut policy = AttendancePolicy::default();
        let sunday = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        policy.holidays.insert(sunday);
        assert_eq!(policy.window_for(sunday), Err(OutsideWindow::RestDay));
    }

    #[test]
    fn late_is_strictly_after_cutoff() {
        let policy = AttendancePolicy::default();
        assert!(!policy.is_late(civil_instant(2025, 6, 10, 10, 59)));
        assert!(!policy.is_late(civil_instant(2025, 6, 10, 11, 0)));
        assert!(policy.is_late(civil_instant(2025, 6, 10, 11, 1)));
    }

    #[test]
    fn reason_codes_are_snake_case() {
        assert_eq!(OutsideWindow::RestDay.as_ref(), "rest_day");
        assert_eq!(OutsideWindow::TooEarly.to_string(), "Attendance has not opened yet");
    }
}
