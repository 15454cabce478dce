use crate::api::employee::active_roster;
use crate::attendance::engine::AttendanceEngine;
use crate::attendance::mysql_store::MySqlAttendanceStore;
use crate::attendance::policy::AttendancePolicy;
use crate::attendance::reports::{self, DailySummary};
use crate::auth::auth::AuthUser;
use crate::model::attendance::{AttendanceKind, AttendanceRecord};
use actix_web::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use futures_util::{StreamExt, pin_mut};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

/// Longest range a single export may cover.
const MAX_EXPORT_DAYS: i64 = 366;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct DailyQuery {
    /// Civil date to report on, defaults to today
    #[schema(example = "2025-06-10", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    #[schema(example = "2025-06-01", format = "date", value_type = String)]
    pub from: NaiveDate,
    #[schema(example = "2025-06-30", format = "date", value_type = String)]
    pub to: NaiveDate,
}

/// One line of the attendance export.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    date: NaiveDate,
    employee_id: &'a str,
    employee_name: &'a str,
    division: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    local_time: String,
    timestamp: String,
    late: &'a str,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl<'a> ExportRow<'a> {
    fn new(record: &'a AttendanceRecord, policy: &AttendancePolicy) -> Self {
        let late = match record.kind {
            AttendanceKind::CheckIn if policy.is_late(record.timestamp) => "yes",
            AttendanceKind::CheckIn => "no",
            AttendanceKind::CheckOut => "",
        };
        Self {
            date: record.date,
            employee_id: &record.employee_id,
            employee_name: &record.employee_name,
            division: record.division.as_deref().unwrap_or(""),
            kind: record.kind.as_ref(),
            local_time: policy.civil(record.timestamp).time.format("%H:%M:%S").to_string(),
            timestamp: record.timestamp.to_rfc3339(),
            late,
            latitude: record.location.map(|p| p.latitude),
            longitude: record.location.map(|p| p.longitude),
        }
    }
}

/// Accumulates export rows as CSV.
struct ExportWriter {
    inner: csv::Writer<Vec<u8>>,
    rows: usize,
}

impl ExportWriter {
    fn new() -> Self {
        Self {
            inner: csv::Writer::from_writer(Vec::new()),
            rows: 0,
        }
    }

    fn push(&mut self, record: &AttendanceRecord, policy: &AttendancePolicy) -> csv::Result<()> {
        self.inner.serialize(ExportRow::new(record, policy))?;
        self.rows += 1;
        Ok(())
    }

    fn finish(self) -> anyhow::Result<(Vec<u8>, usize)> {
        let rows = self.rows;
        let bytes = self.inner.into_inner().map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Ok((bytes, rows))
    }
}

/// The requested date, or today on the engine's clock.
fn report_date(query: &DailyQuery, engine: &AttendanceEngine) -> NaiveDate {
    query.date.unwrap_or_else(|| engine.today())
}

/// Present, late and absent employees for one day
#[utoipa::path(
    get,
    path = "/api/reports/daily",
    params(DailyQuery),
    responses(
        (status = 200, description = "Daily attendance summary", body = DailySummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn daily_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    engine: web::Data<AttendanceEngine>,
    store: web::Data<MySqlAttendanceStore>,
    query: web::Query<DailyQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let policy = engine.policy();
    let date = report_date(&query, &engine);

    let roster = active_roster(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load employee roster");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let records = store.on_date(date).await.map_err(|e| {
        error!(error = %e, %date, "Failed to load attendance");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(reports::daily_summary(date, &roster, &records, policy)))
}

/// Download attendance records as CSV
#[utoipa::path(
    get,
    path = "/api/reports/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid date range"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn export_csv(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    store: web::Data<MySqlAttendanceStore>,
    query: web::Query<ExportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let ExportQuery { from, to } = query.into_inner();

    if from > to {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "from cannot be after to"
        })));
    }
    if (to - from).num_days() >= MAX_EXPORT_DAYS {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": format!("Export range is limited to {MAX_EXPORT_DAYS} days")
        })));
    }

    let policy = engine.policy();
    let mut writer = ExportWriter::new();

    let records = store.stream_between(from, to);
    pin_mut!(records);
    while let Some(record) = records.next().await {
        let record = record.map_err(|e| {
            error!(error = %e, %from, %to, "Failed to stream attendance");
            ErrorInternalServerError("Internal Server Error")
        })?;
        writer.push(&record, policy).map_err(|e| {
            error!(error = %e, record_id = record.id, "Failed to write CSV row");
            ErrorInternalServerError("Internal Server Error")
        })?;
    }

    let (body, rows) = writer.finish().map_err(|e| {
        error!(error = %e, "Failed to finish CSV export");
        ErrorInternalServerError("Internal Server Error")
    })?;

    info!(admin = %auth.username, %from, %to, rows, "Attendance exported");

    Ok(HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/csv; charset=utf-8"))
        .insert_header((
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"attendance_{from}_{to}.csv\""),
        ))
        .body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::geo::GeoPoint;
    use crate::attendance::memory_store::InMemoryAttendanceStore;
    use crate::attendance::test_support::{FixedClock, civil_instant};
    use crate::model::attendance::NewAttendance;
    use std::sync::Arc;

    #[test]
    fn daily_report_defaults_to_today_on_the_engine_clock() {
        let engine = AttendanceEngine::new(
            Arc::new(InMemoryAttendanceStore::new()),
            Arc::new(FixedClock::new(civil_instant(2025, 6, 10, 0, 30))),
            Arc::new(AttendancePolicy::default()),
        );

        let today = report_date(&DailyQuery { date: None }, &engine);
        assert_eq!(today, NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());

        let asked = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        assert_eq!(report_date(&DailyQuery { date: Some(asked) }, &engine), asked);
    }

    fn record(id: u64, kind: AttendanceKind, hh: u32, mm: u32) -> AttendanceRecord {
        NewAttendance {
            employee_id: "E1".into(),
            employee_name: "Siti Rahma".into(),
            division: Some("Finance".into()),
            date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            timestamp: civil_instant(2025, 6, 10, hh, mm),
            kind,
            location: Some(GeoPoint::new(-6.2, 106.8)),
        }
        .into_record(id)
    }

    #[test]
    fn export_writes_header_and_civil_times() {
        let policy = AttendancePolicy::default();
        let mut writer = ExportWriter::new();
        writer.push(&record(1, AttendanceKind::CheckIn, 11, 30), &policy).unwrap();
        writer.push(&record(2, AttendanceKind::CheckOut, 15, 0), &policy).unwrap();

        let (bytes, rows) = writer.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(rows, 2);
        assert_eq!(
            lines[0],
            "date,employee_id,employee_name,division,type,local_time,timestamp,late,latitude,longitude"
        );
        assert!(lines[1].starts_with("2025-06-10,E1,Siti Rahma,Finance,check-in,11:30:00,"));
        assert!(lines[1].ends_with(",yes,-6.2,106.8"));
        assert!(lines[2].contains(",check-out,15:00:00,"));
        assert!(lines[2].ends_with(",,-6.2,106.8"));
    }

    #[test]
    fn empty_export_has_no_rows() {
        let (bytes, rows) = ExportWriter::new().finish().unwrap();
        assert_eq!(rows, 0);
        assert!(bytes.is_empty());
    }
}
