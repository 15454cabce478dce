use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::attendance::geo::{GeoPoint, Geofence};
use crate::attendance::policy::AttendancePolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_scan_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    // Advisory geofence around the office
    pub office_location: Option<GeoPoint>,
    pub geofence_radius_m: f64,
    pub require_location: bool,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has invalid value {raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let office_location = match (env::var("OFFICE_LATITUDE"), env::var("OFFICE_LONGITUDE")) {
            (Ok(_), Ok(_)) => {
                let point = GeoPoint::new(
                    parsed_or("OFFICE_LATITUDE", 0.0)?,
                    parsed_or("OFFICE_LONGITUDE", 0.0)?,
                );
                if !point.is_valid() {
                    return Err(anyhow!("OFFICE_LATITUDE/OFFICE_LONGITUDE out of range: {point}"));
                }
                Some(point)
            }
            _ => None,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parsed_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_scan_per_min: parsed_or("RATE_SCAN_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            office_location,
            geofence_radius_m: parsed_or("GEOFENCE_RADIUS_M", 200.0)?,
            require_location: parsed_or("REQUIRE_LOCATION", false)?,
        })
    }

    /// Attendance rules with the deployment's location settings applied.
    pub fn attendance_policy(&self) -> AttendancePolicy {
        AttendancePolicy {
            geofence: self.office_location.map(|center| Geofence {
                center,
                radius_m: self.geofence_radius_m,
            }),
            require_location: self.require_location,
            ..AttendancePolicy::default()
        }
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/attendance_test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_scan_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            log_dir: "logs".into(),
            office_location: None,
            geofence_radius_m: 200.0,
            require_location: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_carries_geofence_when_office_is_known() {
        let config = Config {
            office_location: Some(GeoPoint::new(-6.2088, 106.8456)),
            geofence_radius_m: 75.0,
            ..Config::for_tests()
        };
        let policy = config.attendance_policy();
        let fence = policy.geofence.unwrap();
        assert_eq!(fence.radius_m, 75.0);
        assert_eq!(fence.center, GeoPoint::new(-6.2088, 106.8456));
        assert!(!policy.require_location);
    }

    #[test]
    fn policy_without_office_has_no_geofence() {
        assert!(Config::for_tests().attendance_policy().geofence.is_none());
    }
}
