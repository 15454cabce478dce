use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::attendance::policy::AttendancePolicy;
use crate::model::attendance::{AttendanceKind, AttendanceRecord};
use crate::model::employee::Employee;

/// An employee's check-in on the reported date.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PresenceEntry {
    pub employee_id: String,
    pub employee_name: String,
    pub division: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub checked_in_at: DateTime<Utc>,
    #[schema(value_type = String, example = "08:05:00")]
    pub civil_time: NaiveTime,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub checked_out_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AbsentEntry {
    pub employee_id: String,
    pub name: String,
    pub division: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailySummary {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub total_employees: usize,
    pub present_count: usize,
    pub late_count: usize,
    pub absent_count: usize,
    pub present: Vec<PresenceEntry>,
    pub late: Vec<PresenceEntry>,
    pub absent: Vec<AbsentEntry>,
}

/// Everyone with a check-in among `records`, ordered by check-in time.
pub fn present(records: &[AttendanceRecord], policy: &AttendancePolicy) -> Vec<PresenceEntry> {
    let check_outs: BTreeMap<&str, DateTime<Utc>> = records
        .iter()
        .filter(|r| r.kind == AttendanceKind::CheckOut)
        .map(|r| (r.employee_id.as_str(), r.timestamp))
        .collect();

    let mut seen = HashSet::new();
    let mut entries: Vec<PresenceEntry> = records
        .iter()
        .filter(|r| r.kind == AttendanceKind::CheckIn)
        .filter(|r| seen.insert(r.employee_id.as_str()))
        .map(|r| PresenceEntry {
            employee_id: r.employee_id.clone(),
            employee_name: r.employee_name.clone(),
            division: r.division.clone(),
            checked_in_at: r.timestamp,
            civil_time: policy.civil(r.timestamp).time,
            checked_out_at: check_outs.get(r.employee_id.as_str()).copied(),
        })
        .collect();

    entries.sort_by_key(|e| e.checked_in_at);
    entries
}

/// Check-ins after the late cutoff.
pub fn late(records: &[AttendanceRecord], policy: &AttendancePolicy) -> Vec<PresenceEntry> {
    present(records, policy)
        .into_iter()
        .filter(|e| policy.is_late(e.checked_in_at))
        .collect()
}

/// Roster members with no check-in among `records`.
pub fn absent(roster: &[Employee], records: &[AttendanceRecord]) -> Vec<AbsentEntry> {
    let checked_in: HashSet<&str> = records
        .iter()
        .filter(|r| r.kind == AttendanceKind::CheckIn)
        .map(|r| r.employee_id.as_str())
        .collect();

    roster
        .iter()
        .filter(|e| !checked_in.contains(e.id.as_str()))
        .map(|e| AbsentEntry {
            employee_id: e.id.clone(),
            name: e.name.clone(),
            division: e.division.clone(),
        })
        .collect()
}

pub fn daily_summary(
    date: NaiveDate,
    roster: &[Employee],
    records: &[AttendanceRecord],
    policy: &AttendancePolicy,
) -> DailySummary {
    let on_date: Vec<AttendanceRecord> = records.iter().filter(|r| r.date == date).cloned().collect();

    let present = present(&on_date, policy);
    let late = late(&on_date, policy);
    let absent = absent(roster, &on_date);

    DailySummary {
        date,
        total_employees: roster.len(),
        present_count: present.len(),
        late_count: late.len(),
        absent_count: absent.len(),
        present,
        late,
        absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::test_support::civil_instant;
    use crate::model::attendance::NewAttendance;

    fn employee(id: &str) -> Employee {
        Employee {
            id: id.into(),
            name: format!("Employee {id}"),
            division: Some("Ops".into()),
            email: None,
            phone: None,
            position: None,
            status: "active".into(),
        }
    }

    fn scan(id: &str, kind: AttendanceKind, hh: u32, mm: u32) -> AttendanceRecord {
        NewAttendance {
            employee_id: id.into(),
            employee_name: format!("Employee {id}"),
            division: Some("Ops".into()),
            date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            timestamp: civil_instant(2025, 6, 10, hh, mm),
            kind,
            location: None,
        }
        .into_record(0)
    }

    #[test]
    fn summary_splits_present_late_and_absent() {
        use AttendanceKind::*;
        let policy = AttendancePolicy::default();
        let roster = vec![employee("E1"), employee("E2"), employee("E3"), employee("E4")];
        let records = vec![
            scan("E2", CheckIn, 11, 30),
            scan("E1", CheckIn, 8, 5),
            scan("E1", CheckOut, 15, 45),
            scan("E3", CheckIn, 11, 0),
        ];

        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let summary = daily_summary(date, &roster, &records, &policy);

        let present: Vec<&str> = summary.present.iter().map(|e| e.employee_id.as_str()).collect();
        assert_eq!(present, ["E1", "E3", "E2"]);
        assert_eq!(summary.present[0].checked_out_at, Some(civil_instant(2025, 6, 10, 15, 45)));
        assert_eq!(summary.late.len(), 1);
        assert_eq!(summary.late[0].employee_id, "E2");
        assert_eq!(summary.absent, vec![AbsentEntry {
            employee_id: "E4".into(),
            name: "Employee E4".into(),
            division: Some("Ops".into()),
        }]);
        assert_eq!(
            (summary.total_employees, summary.present_count, summary.late_count, summary.absent_count),
            (4, 3, 1, 1)
        );
    }

    #[test]
    fn check_out_alone_does_not_count_as_present() {
        let policy = AttendancePolicy::default();
        let records = vec![scan("E1", AttendanceKind::CheckOut, 15, 0)];
        assert!(present(&records, &policy).is_empty());
        assert_eq!(absent(&[employee("E1")], &records).len(), 1);
    }

    #[test]
    fn late_uses_civil_time_of_day() {
        let policy = AttendancePolicy::default();
        let records = vec![scan("E1", AttendanceKind::CheckIn, 11, 1)];
        let late = late(&records, &policy);
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].civil_time, NaiveTime::from_hms_opt(11, 1, 0).unwrap());
    }
}
