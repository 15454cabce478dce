use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::attendance::{AttendanceRecord, NewAttendance};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same (employee, date, kind) already exists.
    #[error("attendance record already exists")]
    Conflict,

    #[error("attendance store failure: {0}")]
    Backend(String),
}

/// Append-only persistence of attendance records.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn records_for_day(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn insert(&self, record: NewAttendance) -> Result<AttendanceRecord, StoreError>;
}
