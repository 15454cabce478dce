use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::attendance::clock::Clock;
use crate::attendance::policy::CIVIL_UTC_OFFSET_SECS;

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Mutex::new(at))
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.0.lock().unwrap() = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// UTC instant of a civil (UTC+7) wall-clock reading.
pub fn civil_instant(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<Utc> {
    FixedOffset::east_opt(CIVIL_UTC_OFFSET_SECS)
        .unwrap()
        .with_ymd_and_hms(y, m, d, hh, mm, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn token_for(id: &str) -> String {
    serde_json::json!({ "id": id, "name": format!("Employee {id}"), "division": "Finance" }).to_string()
}
