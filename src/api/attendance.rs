use crate::attendance::engine::{AttendanceEngine, ScanOutcome};
use crate::attendance::error::ScanError;
use crate::attendance::geo::{GeoPoint, SubmittedLocation};
use crate::attendance::mysql_store::{MySqlAttendanceStore, RecordFilter};
use crate::auth::auth::AuthUser;
use crate::model::attendance::{AttendanceKind, AttendanceRecord};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Raw text decoded from the QR code
    #[schema(example = r#"{"id":"E1","name":"Siti Rahma","division":"Finance"}"#)]
    pub token: String,
    /// Device position, if the browser granted it
    pub location: Option<GeoPoint>,
}

#[derive(Serialize, ToSchema)]
pub struct ScanResponse {
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub kind: AttendanceKind,
    pub record: AttendanceRecord,
    #[schema(example = 42.5, nullable = true)]
    pub distance_from_office_m: Option<f64>,
    #[schema(example = true, nullable = true)]
    pub within_geofence: Option<bool>,
}

impl From<ScanOutcome> for ScanResponse {
    fn from(outcome: ScanOutcome) -> Self {
        let message = match outcome.kind {
            AttendanceKind::CheckIn => "Checked in successfully",
            AttendanceKind::CheckOut => "Checked out successfully",
        };
        Self {
            message: message.to_string(),
            kind: outcome.kind,
            record: outcome.record,
            distance_from_office_m: outcome.distance_from_office_m,
            within_geofence: outcome.within_geofence,
        }
    }
}

fn scan_error_status(err: &ScanError) -> StatusCode {
    match err {
        ScanError::InvalidToken => StatusCode::BAD_REQUEST,
        ScanError::ImpersonationRejected => StatusCode::FORBIDDEN,
        ScanError::OutsideWindow(_) | ScanError::LocationRequired => StatusCode::UNPROCESSABLE_ENTITY,
        ScanError::AlreadyComplete | ScanError::DuplicateSubmission => StatusCode::CONFLICT,
        ScanError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Record a check-in or check-out from a scanned QR code
#[utoipa::path(
    post,
    path = "/api/attendance/scan",
    request_body = ScanRequest,
    responses(
        (status = 201, description = "Attendance recorded", body = ScanResponse),
        (status = 400, description = "Not an attendance code", body = Object, example = json!({
            "code": "invalid_token",
            "message": "The scanned code is not a valid attendance code"
        })),
        (status = 403, description = "Code belongs to another employee", body = Object, example = json!({
            "code": "impersonation_rejected",
            "message": "You can only record attendance for yourself"
        })),
        (status = 409, description = "Already complete or duplicate scan", body = Object, example = json!({
            "code": "already_complete",
            "message": "You have already checked in and out today"
        })),
        (status = 422, description = "Outside attendance hours", body = Object, example = json!({
            "code": "outside_window.too_late",
            "message": "Attendance has closed for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Attendance could not be saved")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn scan(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<ScanRequest>,
) -> actix_web::Result<impl Responder> {
    let caller_id = auth.employee_id()?;
    let payload = payload.into_inner();
    let location = SubmittedLocation(payload.location);

    match engine.scan(&payload.token, caller_id, &location).await {
        Ok(outcome) => Ok(HttpResponse::Created().json(ScanResponse::from(outcome))),
        Err(e) => {
            if e.is_infrastructure() {
                error!(error = ?e, employee_id = caller_id, "Scan failed");
            }
            Ok(HttpResponse::build(scan_error_status(&e)).json(json!({
                "code": e.code(),
                "message": e.to_string(),
            })))
        }
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RecordQuery {
    /// Single civil date (overrides from/to)
    #[schema(example = "2025-06-10", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    #[schema(example = "2025-06-01", format = "date", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    #[schema(example = "2025-06-30", format = "date", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    /// Filter by employee (admin only)
    #[schema(example = "E1")]
    pub employee_id: Option<String>,
}

impl RecordQuery {
    fn into_filter(self, employee_id: Option<String>) -> RecordFilter {
        let (from, to) = match self.date {
            Some(date) => (Some(date), Some(date)),
            None => (self.from, self.to),
        };
        RecordFilter {
            employee_id,
            from,
            to,
        }
    }
}

async fn list_with(
    store: &MySqlAttendanceStore,
    filter: RecordFilter,
) -> actix_web::Result<HttpResponse> {
    let records = store.list(&filter).await.map_err(|e| {
        error!(error = %e, "Failed to list attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;
    Ok(HttpResponse::Ok().json(records))
}

/// Own attendance history
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    params(RecordQuery),
    responses(
        (status = 200, description = "Own attendance records", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_records(
    auth: AuthUser,
    store: web::Data<MySqlAttendanceStore>,
    query: web::Query<RecordQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?.to_string();
    list_with(&store, query.into_inner().into_filter(Some(employee_id))).await
}

/// Attendance records of all employees
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(RecordQuery),
    responses(
        (status = 200, description = "Attendance records", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_records(
    auth: AuthUser,
    store: web::Data<MySqlAttendanceStore>,
    query: web::Query<RecordQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let mut query = query.into_inner();
    let employee_id = query.employee_id.take();
    list_with(&store, query.into_filter(employee_id)).await
}

/// Remove a stray attendance record
#[utoipa::path(
    delete,
    path = "/api/attendance/{record_id}",
    params(("record_id" = u64, Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({"message": "Successfully deleted"})),
        (status = 404, description = "Record not found"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete_record(
    auth: AuthUser,
    store: web::Data<MySqlAttendanceStore>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let record_id = path.into_inner();

    let deleted = store.delete(record_id).await.map_err(|e| {
        error!(error = %e, record_id, "Failed to delete attendance record");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if !deleted {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance record not found"
        })));
    }

    tracing::info!(record_id, admin = %auth.username, "Attendance record deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
