use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument, warn};

use crate::attendance::clock::Clock;
use crate::attendance::error::ScanError;
use crate::attendance::geo::{self, GeoPoint, LocationSource};
use crate::attendance::policy::AttendancePolicy;
use crate::attendance::scan_guard::ScanGuard;
use crate::attendance::store::{AttendanceStore, StoreError};
use crate::attendance::token::IdentityToken;
use crate::model::attendance::{AttendanceKind, AttendanceRecord, DailyState, NewAttendance};

/// Result of an accepted scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub record: AttendanceRecord,
    pub kind: AttendanceKind,
    pub distance_from_office_m: Option<f64>,
    pub within_geofence: Option<bool>,
}

/// Decides whether a scan becomes a check-in, a check-out or a refusal.
pub struct AttendanceEngine {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    policy: Arc<AttendancePolicy>,
    guard: Option<ScanGuard>,
}

impl AttendanceEngine {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        clock: Arc<dyn Clock>,
        policy: Arc<AttendancePolicy>,
    ) -> Self {
        let guard = (!policy.duplicate_window.is_zero()).then(|| ScanGuard::new(policy.duplicate_window));
        Self {
            store,
            clock,
            policy,
            guard,
        }
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    /// Current civil date on the engine's clock.
    pub fn today(&self) -> NaiveDate {
        self.policy.civil_date(self.clock.now())
    }

    #[instrument(name = "attendance_scan", skip_all, fields(caller_id = %caller_id))]
    pub async fn scan(
        &self,
        raw_token: &str,
        caller_id: &str,
        location: &dyn LocationSource,
    ) -> Result<ScanOutcome, ScanError> {
        let token = IdentityToken::decode(raw_token)?;

        if token.id != caller_id {
            warn!(subject_id = %token.id, "Scan for another employee rejected");
            return Err(ScanError::ImpersonationRejected);
        }

        let now = self.clock.now();
        let moment = self.policy.check_window(now).map_err(|reason| {
            info!(reason = reason.as_ref(), "Scan outside attendance window");
            reason
        })?;

        let coordinate = geo::acquire(location, self.policy.location_timeout).await;
        if coordinate.is_none() && self.policy.require_location {
            return Err(ScanError::LocationRequired);
        }

        // a complete day stays AlreadyComplete, even inside the duplicate window
        let kind = self.next_kind(&token.id, moment.date).await?;

        if let Some(guard) = &self.guard {
            if !guard.try_acquire(&token.id, now).await {
                return Err(ScanError::DuplicateSubmission);
            }
        }

        let result = self.record(&token, kind, moment.date, now, coordinate).await;

        if result.is_err() {
            if let Some(guard) = &self.guard {
                guard.release(&token.id).await;
            }
        }
        result
    }

    async fn next_kind(&self, employee_id: &str, date: NaiveDate) -> Result<AttendanceKind, ScanError> {
        let records = self.store.records_for_day(employee_id, date).await?;
        DailyState::from_records(&records)
            .next_kind()
            .ok_or(ScanError::AlreadyComplete)
    }

    async fn record(
        &self,
        token: &IdentityToken,
        kind: AttendanceKind,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
        location: Option<GeoPoint>,
    ) -> Result<ScanOutcome, ScanError> {
        // re-read right before the write; a concurrent scan may have landed
        if self.next_kind(&token.id, date).await? != kind {
            return Err(ScanError::DuplicateSubmission);
        }

        let new_record = NewAttendance {
            employee_id: token.id.clone(),
            employee_name: token.name.clone(),
            division: token.division.clone(),
            date,
            timestamp,
            kind,
            location,
        };

        let record = self.store.insert(new_record).await.map_err(|e| match e {
            StoreError::Conflict => ScanError::DuplicateSubmission,
            other => ScanError::Store(other),
        })?;

        let fence = self.policy.geofence;
        let distance_from_office_m = fence.zip(location).map(|(f, p)| f.distance_m(&p));
        let within_geofence = fence.zip(location).map(|(f, p)| f.contains(&p));
        if within_geofence == Some(false) {
            warn!(
                employee_id = %record.employee_id,
                distance_m = distance_from_office_m.unwrap_or_default(),
                "Scan recorded outside the office geofence"
            );
        }

        info!(
            employee_id = %record.employee_id,
            kind = %kind,
            date = %date,
            location = ?location.map(|p| p.to_string()),
            "Attendance recorded"
        );

        Ok(ScanOutcome {
            record,
            kind,
            distance_from_office_m,
            within_geofence,
        })
    }
}
