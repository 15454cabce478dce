use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::attendance::store::{AttendanceStore, StoreError};
use crate::model::attendance::{AttendanceRecord, NewAttendance};

/// Vec-backed store with the same uniqueness rule as the database schema.
#[derive(Default)]
pub struct InMemoryAttendanceStore {
    records: Mutex<Vec<AttendanceRecord>>,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<AttendanceRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    async fn records_for_day(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(records
            .iter()
            .filter(|r| r.employee_id == employee_id && r.date == date)
            .cloned()
            .collect())
    }

    async fn insert(&self, record: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let duplicate = records.iter().any(|r| {
            r.employee_id == record.employee_id && r.date == record.date && r.kind == record.kind
        });
        if duplicate {
            return Err(StoreError::Conflict);
        }

        let stored = record.into_record(records.len() as u64 + 1);
        records.push(stored.clone());
        Ok(stored)
    }
}
