use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::{Stream, StreamExt};
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, error};

use crate::attendance::geo::GeoPoint;
use crate::attendance::store::{AttendanceStore, StoreError};
use crate::model::attendance::{AttendanceKind, AttendanceRecord, NewAttendance};
use crate::utils::db_utils::{ConstraintViolation, constraint_violation};

const SELECT_COLUMNS: &str = r#"
    SELECT id, employee_id, employee_name, division, date, recorded_at, kind, latitude, longitude
    FROM attendance
"#;

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: String,
    employee_name: String,
    division: Option<String>,
    date: NaiveDate,
    recorded_at: DateTime<Utc>,
    kind: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<AttendanceKind>()
            .map_err(|_| StoreError::Backend(format!("unknown attendance kind {:?}", row.kind)))?;

        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
            _ => None,
        };

        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            employee_name: row.employee_name,
            division: row.division,
            date: row.date,
            timestamp: row.recorded_at,
            kind,
            location,
        })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        // unique key on employee/date/kind
        match constraint_violation(&e) {
            Some(ConstraintViolation::Unique) => StoreError::Conflict,
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

/// Filters for the administrative listing.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub employee_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut conditions = Vec::new();
        if filter.employee_id.is_some() {
            conditions.push("employee_id = ?");
        }
        if filter.from.is_some() {
            conditions.push("date >= ?");
        }
        if filter.to.is_some() {
            conditions.push("date <= ?");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!("{SELECT_COLUMNS} {where_clause} ORDER BY date DESC, recorded_at DESC");
        debug!(sql = %sql, ?filter, "Listing attendance");

        let mut query = sqlx::query_as::<_, AttendanceRow>(&sql);
        if let Some(employee_id) = &filter.employee_id {
            query = query.bind(employee_id);
        }
        if let Some(from) = filter.from {
            query = query.bind(from);
        }
        if let Some(to) = filter.to {
            query = query.bind(to);
        }

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }

    pub async fn on_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.list(&RecordFilter {
            from: Some(date),
            to: Some(date),
            ..RecordFilter::default()
        })
        .await
    }

    /// Records in `[from, to]`, oldest first, streamed row by row.
    pub fn stream_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Stream<Item = Result<AttendanceRecord, StoreError>> + '_ {
        sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, employee_id, employee_name, division, date, recorded_at, kind, latitude, longitude
            FROM attendance
            WHERE date BETWEEN ? AND ?
            ORDER BY date, employee_id, recorded_at
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch(&self.pool)
        .map(|row| AttendanceRecord::try_from(row?))
    }

    pub async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn records_for_day(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE employee_id = ? AND date = ? ORDER BY recorded_at");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }

    async fn insert(&self, record: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, employee_name, division, date, recorded_at, kind, latitude, longitude)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.employee_id)
        .bind(&record.employee_name)
        .bind(&record.division)
        .bind(record.date)
        .bind(record.timestamp)
        .bind(record.kind.as_ref())
        .bind(record.location.map(|p| p.latitude))
        .bind(record.location.map(|p| p.longitude))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = StoreError::from(e);
            if !matches!(err, StoreError::Conflict) {
                error!(error = %err, employee_id = %record.employee_id, "Attendance insert failed");
            }
            err
        })?;

        Ok(record.into_record(result.last_insert_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::db_utils::fake_db_error::db_error;
    use sqlx::error::ErrorKind;

    #[test]
    fn only_unique_violations_are_conflicts() {
        assert!(matches!(
            StoreError::from(db_error(ErrorKind::UniqueViolation)),
            StoreError::Conflict
        ));
        assert!(matches!(
            StoreError::from(db_error(ErrorKind::ForeignKeyViolation)),
            StoreError::Backend(_)
        ));
        assert!(matches!(StoreError::from(sqlx::Error::PoolTimedOut), StoreError::Backend(_)));
    }
}
