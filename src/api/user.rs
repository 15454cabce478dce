use crate::{
    auth::{auth::AuthUser, password::hash_password},
    model::{role::Role, user::User},
    utils::db_utils::{
        ConstraintViolation, SqlValue, build_update_sql, constraint_violation, execute_update,
    },
};
use actix_web::{
    HttpResponse, Responder,
    error::{ErrorBadRequest, ErrorInternalServerError},
    web,
};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

const UPDATABLE_COLUMNS: &[&str] = &["role_id", "employee_id", "is_active", "password"];

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "siti")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    /// 1 = super admin, 2 = admin, 3 = employee (default)
    #[schema(example = 3, nullable = true)]
    pub role_id: Option<u8>,
    #[schema(example = "E1", nullable = true)]
    pub employee_id: Option<String>,
}

/// Client error for a write the schema refused, `None` for server-side failures.
fn constraint_response(e: &sqlx::Error, duplicate: &str) -> Option<HttpResponse> {
    match constraint_violation(e)? {
        ConstraintViolation::Unique => Some(HttpResponse::Conflict().json(json!({
            "message": duplicate
        }))),
        ConstraintViolation::ForeignKey => Some(HttpResponse::BadRequest().json(json!({
            "message": "Unknown employee"
        }))),
    }
}

/// Validates the role and hashes any new password in place.
fn prepare_update(mut body: Value) -> actix_web::Result<Value> {
    let Some(obj) = body.as_object_mut() else {
        return Err(ErrorBadRequest("Payload must be a JSON object"));
    };

    if let Some(role_id) = obj.get("role_id") {
        let valid = role_id
            .as_u64()
            .and_then(|id| u8::try_from(id).ok())
            .and_then(Role::from_id)
            .is_some();
        if !valid {
            return Err(ErrorBadRequest("Unknown role_id"));
        }
    }

    if let Some(password) = obj.get("password") {
        let Some(plain) = password.as_str().filter(|p| !p.is_empty()) else {
            return Err(ErrorBadRequest("Password must be a non-empty string"));
        };
        let hashed = hash_password(plain).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            ErrorInternalServerError("Internal Server Error")
        })?;
        obj.insert("password".to_string(), Value::String(hashed));
    }

    Ok(body)
}

/// Create a login account
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created successfully",
            "id": 7
        })),
        (status = 400, description = "Invalid payload or unknown employee"),
        (status = 403, description = "Super admin only"),
        (status = 409, description = "Username already taken")
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
#[instrument(name = "create_user", skip(auth, pool, payload), fields(username = %payload.username))]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Username and password are required"
        })));
    }

    let Some(role) = Role::from_id(payload.role_id.unwrap_or(Role::Employee.id())) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Unknown role_id"
        })));
    };

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, password, role_id, employee_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(&hashed)
    .bind(role.id())
    .bind(&payload.employee_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => {
            info!(user_id = res.last_insert_id(), role = %role, "User created");
            Ok(HttpResponse::Created().json(json!({
                "message": "User created successfully",
                "id": res.last_insert_id()
            })))
        }
        Err(e) => match constraint_response(&e, "Username already taken") {
            Some(resp) => Ok(resp),
            None => {
                error!(error = %e, "Failed to create user");
                Ok(HttpResponse::InternalServerError().json(json!({
                    "message": "Something went wrong, Contact with system admin"
                })))
            }
        },
    }
}

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All login accounts", body = [User]),
        (status = 403, description = "Super admin only")
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;

    let users = sqlx::query_as::<_, User>(
        "SELECT id, username, role_id, employee_id, is_active FROM users ORDER BY id",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list users");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found")
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;
    let user_id = path.into_inner();

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, role_id, employee_id, is_active FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to fetch user");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match user {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        }))),
    }
}

/// Change role, linked employee, active flag or password
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    request_body(content = Object, example = json!({
        "role_id": 2,
        "is_active": false
    })),
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "User not found")
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;
    let user_id = path.into_inner();

    let body = prepare_update(body.into_inner())?;
    let update = build_update_sql("users", &body, UPDATABLE_COLUMNS, "id", SqlValue::U64(user_id))?;

    match execute_update(pool.get_ref(), update).await {
        Ok(0) => Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        }))),
        Ok(_) => {
            info!(user_id, admin = %auth.username, "User updated");
            Ok(HttpResponse::Ok().json(json!({
                "message": "User updated successfully"
            })))
        }
        Err(e) => match constraint_response(&e, "Conflicting value") {
            Some(resp) => Ok(resp),
            None => {
                error!(error = %e, user_id, "Failed to update user");
                Err(ErrorInternalServerError("Internal Server Error"))
            }
        },
    }
}

#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Cannot delete your own account"),
        (status = 404, description = "User not found")
    ),
    tag = "User",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_super_admin()?;
    let user_id = path.into_inner();

    if user_id == auth.user_id {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Cannot delete your own account"
        })));
    }

    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to delete user");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "User not found"
        })));
    }

    info!(user_id, admin = %auth.username, "User deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
