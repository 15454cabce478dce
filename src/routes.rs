use crate::{
    api::{attendance, employee, permission_request, report, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Context, Result};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiters, built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct RateLimiters {
    login: Limiter,
    refresh: Limiter,
    scan: Limiter,
    protected: Limiter,
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .with_context(|| format!("invalid rate limit: {requests_per_min}/min"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            scan: build_limiter(config.rate_scan_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &RateLimiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance/scan
                    .service(
                        web::resource("/scan")
                            .wrap(limiters.scan.clone())
                            .route(web::post().to(attendance::scan)),
                    )
                    // /attendance/me
                    .service(web::resource("/me").route(web::get().to(attendance::my_records)))
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::list_records)))
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}").route(web::delete().to(attendance::delete_record)),
                    ),
            )
            .service(
                web::scope("/employee")
                    // /employee
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employee/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    // /employee/{id}/qr
                    .service(web::resource("/{id}/qr").route(web::get().to(employee::employee_qr))),
            )
            .service(
                web::scope("/users")
                    .service(
                        web::resource("")
                            .route(web::post().to(user::create_user))
                            .route(web::get().to(user::list_users)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(user::get_user))
                            .route(web::put().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            )
            .service(
                web::scope("/permission")
                    // /permission
                    .service(
                        web::resource("")
                            .route(web::get().to(permission_request::permission_list))
                            .route(web::post().to(permission_request::create_permission)),
                    )
                    // /permission/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(permission_request::get_permission)),
                    )
                    // /permission/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(permission_request::approve_permission)),
                    )
                    // /permission/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(permission_request::reject_permission)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("/daily").route(web::get().to(report::daily_report)))
                    .service(web::resource("/export").route(web::get().to(report::export_csv))),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new token pair, old refresh token revoked

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiters_build_from_default_rates() {
        assert!(RateLimiters::from_config(&Config::for_tests()).is_ok());
    }

    #[test]
    fn zero_rate_still_builds() {
        assert!(build_limiter(0).is_ok());
    }
}
