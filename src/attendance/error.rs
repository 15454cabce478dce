use thiserror::Error;

use crate::attendance::policy::OutsideWindow;
use crate::attendance::store::StoreError;

/// Every way a scan can be refused. Messages are shown to the employee as-is.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("The scanned code is not a valid attendance code")]
    InvalidToken,

    #[error("You can only record attendance for yourself")]
    ImpersonationRejected,

    #[error(transparent)]
    OutsideWindow(#[from] OutsideWindow),

    #[error("You have already checked in and out today")]
    AlreadyComplete,

    #[error("This scan was just recorded, please wait before scanning again")]
    DuplicateSubmission,

    #[error("Location access is required to record attendance")]
    LocationRequired,

    #[error("Attendance could not be saved, please try again")]
    Store(#[from] StoreError),
}

impl ScanError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::InvalidToken => "invalid_token",
            ScanError::ImpersonationRejected => "impersonation_rejected",
            ScanError::OutsideWindow(OutsideWindow::RestDay) => "outside_window.rest_day",
            ScanError::OutsideWindow(OutsideWindow::Holiday) => "outside_window.holiday",
            ScanError::OutsideWindow(OutsideWindow::TooEarly) => "outside_window.too_early",
            ScanError::OutsideWindow(OutsideWindow::TooLate) => "outside_window.too_late",
            ScanError::AlreadyComplete => "already_complete",
            ScanError::DuplicateSubmission => "duplicate_submission",
            ScanError::LocationRequired => "location_required",
            ScanError::Store(_) => "store_unavailable",
        }
    }

    pub fn is_infrastructure(&self) -> bool {
        matches!(self, ScanError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_hide_backend_details() {
        let err = ScanError::from(StoreError::Backend("connection refused".into()));
        assert_eq!(err.to_string(), "Attendance could not be saved, please try again");
        assert!(err.is_infrastructure());
    }

    #[test]
    fn window_reasons_keep_their_message() {
        let err = ScanError::from(OutsideWindow::Holiday);
        assert_eq!(err.code(), "outside_window.holiday");
        assert_eq!(err.to_string(), "Attendance is closed on public holidays");
        assert!(!err.is_infrastructure());
    }
}
