use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

use crate::model::role::Role;

/// The authenticated caller, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Missing token")),
        )
    }
}

impl AuthUser {
    pub fn require_super_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::SuperAdmin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Super admin only"))
        }
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    /// Returns true if the user is an employee
    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    /// The employee this session scans for.
    pub fn employee_id(&self) -> actix_web::Result<&str> {
        self.employee_id
            .as_deref()
            .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))
    }

    /// Admins see everyone; employees only themselves.
    pub fn require_self_or_admin(&self, employee_id: &str) -> actix_web::Result<()> {
        if self.role.is_admin() || self.employee_id.as_deref() == Some(employee_id) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Not allowed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<&str>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "tester".into(),
            role,
            employee_id: employee_id.map(str::to_string),
        }
    }

    #[test]
    fn employees_reach_only_their_own_records() {
        let siti = user(Role::Employee, Some("E1"));
        assert!(siti.require_self_or_admin("E1").is_ok());
        assert!(siti.require_self_or_admin("E2").is_err());
        assert!(siti.require_admin().is_err());
    }

    #[test]
    fn admins_reach_everyone() {
        let admin = user(Role::Admin, None);
        assert!(admin.require_self_or_admin("E2").is_ok());
        assert!(admin.require_super_admin().is_err());
        assert!(admin.employee_id().is_err());
        assert!(user(Role::SuperAdmin, None).require_super_admin().is_ok());
    }
}
