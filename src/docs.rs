use crate::api::attendance::{RecordQuery, ScanRequest, ScanResponse};
use crate::api::employee::{
    CreateEmployee, EmployeeListResponse, EmployeeQuery, QrCodeResponse, UpdateEmployee,
};
use crate::api::permission_request::{
    CreatePermission, PermissionFilter, PermissionKind, PermissionListResponse,
};
use crate::api::report::{DailyQuery, ExportQuery};
use crate::api::user::CreateUser;
use crate::attendance::geo::GeoPoint;
use crate::attendance::policy::OutsideWindow;
use crate::attendance::reports::{AbsentEntry, DailySummary, PresenceEntry};
use crate::attendance::token::IdentityToken;
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{AttendanceKind, AttendanceRecord};
use crate::model::employee::Employee;
use crate::model::permission_request::PermissionRequest;
use crate::model::role::Role;
use crate::model::user::User;
use crate::models::LoginReqDto;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "QR Attendance API",
        version = "1.0.0",
        description = r#"
## QR Attendance

Employees record attendance by scanning the QR code printed on their badge.
The first accepted scan of a day is a **check-in**, the second a **check-out**.

### 🔹 Key Features
- **Attendance**
  - Scan to check in or out, within working hours (UTC+7)
  - Closed on Sundays and public holidays, half day on Saturdays
  - Optional office geofence
- **Reports**
  - Daily present / late / absent summary, CSV export
- **Employees & Users**
  - Manage the employee roster, badge QR payloads and login accounts
- **Permissions**
  - Request sick or leave days, approve/reject requests

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Only **Admin** roles can access reports and roster management.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::attendance::scan,
        crate::api::attendance::my_records,
        crate::api::attendance::list_records,
        crate::api::attendance::delete_record,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::employee_qr,

        crate::api::user::create_user,
        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::permission_request::permission_list,
        crate::api::permission_request::get_permission,
        crate::api::permission_request::create_permission,
        crate::api::permission_request::approve_permission,
        crate::api::permission_request::reject_permission,

        crate::api::report::daily_report,
        crate::api::report::export_csv
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            GeoPoint,
            ScanRequest,
            ScanResponse,
            RecordQuery,
            AttendanceKind,
            AttendanceRecord,
            OutsideWindow,
            IdentityToken,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            QrCodeResponse,
            Role,
            User,
            CreateUser,
            PermissionKind,
            PermissionRequest,
            CreatePermission,
            PermissionFilter,
            PermissionListResponse,
            DailyQuery,
            ExportQuery,
            PresenceEntry,
            AbsentEntry,
            DailySummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Attendance", description = "QR check-in and check-out"),
        (name = "Employee", description = "Employee roster management"),
        (name = "User", description = "Login account management"),
        (name = "Permission", description = "Sick and leave day requests"),
        (name = "Report", description = "Attendance reports"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_scan_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/attendance/scan"));
        assert!(doc.paths.paths.contains_key("/api/reports/export"));
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("AttendanceRecord"));
    }
}
