//! Attendance scanning: eligibility window, check-in/check-out transitions
//! and the derived daily reports.

pub mod clock;
pub mod engine;
pub mod error;
pub mod geo;
pub mod mysql_store;
pub mod policy;
pub mod reports;
pub mod scan_guard;
pub mod store;
pub mod token;

#[cfg(test)]
pub mod memory_store;
#[cfg(test)]
pub mod test_support;
