use crate::{
    attendance::token::IdentityToken,
    auth::auth::AuthUser,
    model::employee::Employee,
    utils::db_utils::{
        ConstraintViolation, SqlValue, build_update_sql, constraint_violation, execute_update,
    },
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

/// Columns an admin may change through `PUT /employee/{id}`.
const UPDATABLE_COLUMNS: &[&str] = &["name", "division", "email", "phone", "position", "status"];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "E1")]
    pub id: String,
    #[schema(example = "Siti Rahma")]
    pub name: String,
    #[schema(example = "Finance", nullable = true)]
    pub division: Option<String>,
    #[schema(example = "siti.rahma@company.co.id", format = "email", nullable = true)]
    pub email: Option<String>,
    #[schema(example = "+6281234567890", nullable = true)]
    pub phone: Option<String>,
    #[schema(example = "Accountant", nullable = true)]
    pub position: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub division: Option<String>,
    pub status: Option<String>,
    /// Search by id, name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// What a badge printer needs to render an attendance QR code.
#[derive(Serialize, ToSchema)]
pub struct QrCodeResponse {
    pub token: IdentityToken,
    /// Exact text to encode in the QR code
    #[schema(example = r#"{"id":"E1","name":"Siti Rahma","division":"Finance"}"#)]
    pub payload: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub division: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    #[schema(example = "inactive")]
    pub status: Option<String>,
}

/// Active employees, the roster used by absentee reports.
pub async fn active_roster(pool: &MySqlPool) -> Result<Vec<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, name, division, email, phone, position, status
        FROM employees
        WHERE status = 'active'
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

async fn find_employee(pool: &MySqlPool, employee_id: &str) -> actix_web::Result<Option<Employee>> {
    sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, name, division, email, phone, position, status
        FROM employees
        WHERE id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee");
        ErrorInternalServerError("Internal Server Error")
    })
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created successfully", body = Object, example = json!({
            "message": "Employee created successfully"
        })),
        (status = 400, description = "Missing id or name"),
        (status = 409, description = "Employee id or email already exists"),
        (status = 403, description = "Admin only"),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "message": "Something went wrong, Contact with system admin"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let id = payload.id.trim();
    let name = payload.name.trim();
    if id.is_empty() || name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Employee id and name are required"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO employees (id, name, division, email, phone, position)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(&payload.division)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.position)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            info!(employee_id = id, "Employee created");
            Ok(HttpResponse::Created().json(json!({
                "message": "Employee created successfully"
            })))
        }
        Err(e) if constraint_violation(&e) == Some(ConstraintViolation::Unique) => {
            Ok(HttpResponse::Conflict().json(json!({
                "message": "Employee id or email already exists"
            })))
        }
        Err(e) => {
            error!(error = %e, "Failed to Create Employee");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, Contact with system admin"
            })))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(division) = &query.division {
        conditions.push("division = ?");
        bindings.push(division.clone());
    }

    if let Some(status) = &query.status {
        conditions.push("status = ?");
        bindings.push(status.clone());
    }

    if let Some(search) = &query.search {
        conditions.push("(id LIKE ? OR name LIKE ? OR email LIKE ?)");
        let like = format!("%{}%", search);
        bindings.extend([like.clone(), like.clone(), like]);
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) as total FROM employees {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count employees");
        ErrorInternalServerError("Database error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT id, name, division, email, phone, position, status FROM employees {} ORDER BY id LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, bindings = ?bindings, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let employees = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch employees");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated successfully", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Unknown or empty fields"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let update = build_update_sql(
        "employees",
        &body,
        UPDATABLE_COLUMNS,
        "id",
        SqlValue::String(employee_id.clone()),
    )?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, employee_id = %employee_id, "Failed to update employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error", body = Object)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    // attendance history keeps its denormalized name and stays
    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(&employee_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) if res.rows_affected() == 0 => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
        Ok(_) => {
            info!(employee_id = %employee_id, admin = %auth.username, "Employee deleted");
            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }
        Err(e) => {
            error!(error = %e, employee_id = %employee_id, "Failed to delete employee");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_admin(&employee_id)?;

    match find_employee(pool.get_ref(), &employee_id).await? {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}

/// QR payload for an employee's attendance card
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}/qr",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Identity token to encode as QR", body = QrCodeResponse),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn employee_qr(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_admin(&employee_id)?;

    let token = match badge_token(find_employee(pool.get_ref(), &employee_id).await?) {
        Ok(token) => token,
        Err(BadgeRefusal::NotFound) => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Employee not found"
            })));
        }
        Err(BadgeRefusal::Inactive) => {
            return Ok(HttpResponse::Forbidden().json(json!({
                "message": "Employee is not active"
            })));
        }
    };

    let payload = token.encode().map_err(|e| {
        error!(error = %e, employee_id = %employee_id, "Failed to encode identity token");
        ErrorInternalServerError("Internal Server Error")
    })?;
    Ok(HttpResponse::Ok().json(QrCodeResponse { token, payload }))
}

#[derive(Debug, PartialEq)]
enum BadgeRefusal {
    NotFound,
    Inactive,
}

/// Only active employees get a scannable badge.
fn badge_token(employee: Option<Employee>) -> Result<IdentityToken, BadgeRefusal> {
    match employee {
        Some(emp) if emp.status == "active" => Ok(emp.identity_token()),
        Some(_) => Err(BadgeRefusal::Inactive),
        None => Err(BadgeRefusal::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token};
    use crate::auth::middleware::auth_middleware;
    use crate::config::Config;
    use actix_web::http::StatusCode;
    use actix_web::middleware::from_fn;
    use actix_web::{App, test};
    use sqlx::mysql::MySqlPoolOptions;

    fn employee(status: &str) -> Employee {
        Employee {
            id: "E1".into(),
            name: "Siti Rahma".into(),
            division: Some("Finance".into()),
            email: None,
            phone: None,
            position: None,
            status: status.into(),
        }
    }

    #[::core::prelude::v1::test]
    fn active_employee_gets_badge_token() {
        let token = badge_token(Some(employee("active"))).unwrap();
        assert_eq!(token.id, "E1");
        assert_eq!(token.division.as_deref(), Some("Finance"));
        assert_eq!(
            token.encode().unwrap(),
            r#"{"id":"E1","name":"Siti Rahma","division":"Finance"}"#
        );
    }

    #[::core::prelude::v1::test]
    fn inactive_or_missing_employee_gets_no_badge() {
        assert_eq!(badge_token(Some(employee("inactive"))), Err(BadgeRefusal::Inactive));
        assert_eq!(badge_token(None), Err(BadgeRefusal::NotFound));
    }

    fn bearer(employee_id: Option<&str>, role: u8) -> String {
        let subject = TokenSubject {
            user_id: 1,
            username: "tester".into(),
            role,
            employee_id: employee_id.map(str::to_string),
        };
        let token = generate_access_token(&subject, &Config::for_tests().jwt_secret, 900).unwrap();
        format!("Bearer {token}")
    }

    #[actix_web::test]
    async fn employee_cannot_fetch_another_employees_badge() {
        // never connects: the role check answers first
        let pool = MySqlPoolOptions::new()
            .connect_lazy(&Config::for_tests().database_url)
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(pool))
                .service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .route("/employee/{id}/qr", web::get().to(employee_qr)),
                ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/employee/E1/qr")
            .insert_header(("Authorization", bearer(Some("E2"), 3)))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
