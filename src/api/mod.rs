pub mod attendance;
pub mod employee;
pub mod permission_request;
pub mod report;
pub mod user;
