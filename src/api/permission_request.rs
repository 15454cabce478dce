use crate::auth::auth::AuthUser;
use crate::model::permission_request::PermissionRequest;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use strum_macros::AsRefStr;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PermissionKind {
    Sick,
    Leave,
    Other,
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePermission {
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "sick")]
    pub kind: PermissionKind, // enum ensures Swagger dropdown
    #[schema(example = "Fever, doctor's note attached")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PermissionFilter {
    /// Filter by employee ID (admins only)
    #[schema(example = "E1")]
    pub employee_id: Option<String>,
    /// Filter by request status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct PermissionListResponse {
    pub data: Vec<PermissionRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Create permission request
========================= */
#[utoipa::path(
    post,
    path = "/api/permission",
    request_body(
        content = CreatePermission,
        description = "Permission request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Permission request submitted", body = Object, example = json!({
            "message": "Permission request submitted",
            "status": "pending"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Permission"
)]
pub async fn create_permission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePermission>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;

    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "A reason is required"
        })));
    }

    sqlx::query(
        r#"
        INSERT INTO permission_requests (employee_id, date, kind, reason)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.date)
    .bind(payload.kind.as_ref())
    .bind(reason)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to create permission request");
        ErrorInternalServerError("Internal Server Error")
    })?;

    info!(employee_id, date = %payload.date, kind = payload.kind.as_ref(), "Permission requested");

    Ok(HttpResponse::Created().json(json!({
        "message": "Permission request submitted",
        "status": "pending"
    })))
}

async fn decide(
    pool: &MySqlPool,
    request_id: u64,
    status: &str,
) -> actix_web::Result<HttpResponse> {
    let result = sqlx::query(
        r#"
        UPDATE permission_requests
        SET status = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(status)
    .bind(request_id)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, request_id, status, "Permission decision failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Permission request not found or already processed"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Permission {status}")
    })))
}

/* =========================
Approve / reject (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/permission/{request_id}/approve",
    params(
        ("request_id" = u64, Path, description = "ID of the permission request to approve")
    ),
    responses(
        (status = 200, description = "Permission approved", body = Object, example = json!({
            "message": "Permission approved"
        })),
        (status = 400, description = "Not found or already processed", body = Object, example = json!({
            "message": "Permission request not found or already processed"
        })),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Permission"
)]
pub async fn approve_permission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    decide(pool.get_ref(), path.into_inner(), "approved").await
}

#[utoipa::path(
    put,
    path = "/api/permission/{request_id}/reject",
    params(
        ("request_id" = u64, Path, description = "ID of the permission request to reject")
    ),
    responses(
        (status = 200, description = "Permission rejected", body = Object, example = json!({
            "message": "Permission rejected"
        })),
        (status = 400, description = "Not found or already processed"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Permission"
)]
pub async fn reject_permission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    decide(pool.get_ref(), path.into_inner(), "rejected").await
}

#[utoipa::path(
    get,
    path = "/api/permission/{request_id}",
    params(
        ("request_id" = u64, Path, description = "ID of the permission request to fetch")
    ),
    responses(
        (status = 200, description = "Permission request found", body = PermissionRequest),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Permission request not found", body = Object, example = json!({
            "message": "Permission request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Permission"
)]
pub async fn get_permission(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request_id = path.into_inner();

    let request = sqlx::query_as::<_, PermissionRequest>(
        r#"
        SELECT id, employee_id, date, kind, reason, status, created_at
        FROM permission_requests
        WHERE id = ?
        "#,
    )
    .bind(request_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, request_id, "Failed to fetch permission request");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match request {
        Some(data) => {
            auth.require_self_or_admin(&data.employee_id)?;
            Ok(HttpResponse::Ok().json(data))
        }
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Permission request not found"
        }))),
    }
}

#[utoipa::path(
    get,
    path = "/api/permission",
    params(PermissionFilter),
    responses(
        (status = 200, description = "Paginated permission list", body = PermissionListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Permission"
)]
pub async fn permission_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PermissionFilter>,
) -> actix_web::Result<impl Responder> {
    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<&str> = Vec::new();

    // employees only ever see their own requests
    let employee_filter = if auth.is_employee() {
        Some(auth.employee_id()?)
    } else {
        query.employee_id.as_deref()
    };

    if let Some(emp_id) = employee_filter {
        where_sql.push_str(" AND employee_id = ?");
        args.push(emp_id);
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(status);
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM permission_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = count_q.bind(*arg);
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count permission requests");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT id, employee_id, date, kind, reason, status, created_at
        FROM permission_requests
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, PermissionRequest>(&data_sql);
    for arg in &args {
        data_q = data_q.bind(*arg);
    }

    let data = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch permission requests");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(PermissionListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_use_lowercase_names() {
        let kind: PermissionKind = serde_json::from_str(r#""sick""#).unwrap();
        assert_eq!(kind.as_ref(), "sick");
        assert_eq!(PermissionKind::Leave.as_ref(), "leave");
        assert!(serde_json::from_str::<PermissionKind>(r#""holiday""#).is_err());
    }
}
