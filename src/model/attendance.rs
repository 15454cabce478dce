use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::attendance::geo::GeoPoint;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceKind {
    CheckIn,
    CheckOut,
}

/// One immutable check-in or check-out event.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "employeeId": "E1",
    "employeeName": "Siti Rahma",
    "division": "Finance",
    "date": "2025-06-10",
    "timestamp": "2025-06-10T01:05:00Z",
    "type": "check-in",
    "location": { "latitude": -6.2088, "longitude": 106.8456 }
}))]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: String,
    pub employee_name: String,
    pub division: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: AttendanceKind,
    pub location: Option<GeoPoint>,
}

/// A record about to be appended; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub employee_id: String,
    pub employee_name: String,
    pub division: Option<String>,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub kind: AttendanceKind,
    pub location: Option<GeoPoint>,
}

impl NewAttendance {
    pub fn into_record(self, id: u64) -> AttendanceRecord {
        AttendanceRecord {
            id,
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            division: self.division,
            date: self.date,
            timestamp: self.timestamp,
            kind: self.kind,
            location: self.location,
        }
    }
}

/// Where a subject stands for one civil date; derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyState {
    NotStarted,
    CheckedIn,
    Complete,
}

impl DailyState {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let has = |kind| records.iter().any(|r| r.kind == kind);
        match (has(AttendanceKind::CheckIn), has(AttendanceKind::CheckOut)) {
            (false, _) => DailyState::NotStarted,
            (true, false) => DailyState::CheckedIn,
            (true, true) => DailyState::Complete,
        }
    }

    /// The only event this state accepts, if any.
    pub fn next_kind(self) -> Option<AttendanceKind> {
        match self {
            DailyState::NotStarted => Some(AttendanceKind::CheckIn),
            DailyState::CheckedIn => Some(AttendanceKind::CheckOut),
            DailyState::Complete => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn record(kind: AttendanceKind) -> AttendanceRecord {
        NewAttendance {
            employee_id: "E1".into(),
            employee_name: "Siti".into(),
            division: None,
            date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            timestamp: Utc::now(),
            kind,
            location: None,
        }
        .into_record(1)
    }

    #[test]
    fn state_follows_recorded_kinds() {
        use AttendanceKind::*;
        assert_eq!(DailyState::from_records(&[]), DailyState::NotStarted);
        assert_eq!(DailyState::from_records(&[record(CheckIn)]), DailyState::CheckedIn);
        assert_eq!(
            DailyState::from_records(&[record(CheckIn), record(CheckOut)]),
            DailyState::Complete
        );
        // a stray check-out without check-in still needs a check-in
        assert_eq!(DailyState::from_records(&[record(CheckOut)]), DailyState::NotStarted);
    }

    #[test]
    fn kind_uses_wire_names() {
        assert_eq!(AttendanceKind::CheckIn.as_ref(), "check-in");
        assert_eq!(AttendanceKind::from_str("check-out").unwrap(), AttendanceKind::CheckOut);
        let json = serde_json::to_value(record(AttendanceKind::CheckOut)).unwrap();
        assert_eq!(json["type"], "check-out");
        assert_eq!(json["employeeId"], "E1");
        assert_eq!(json["date"], "2025-06-10");
    }
}
