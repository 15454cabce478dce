pub mod attendance;
pub mod employee;
pub mod permission_request;
pub mod role;
pub mod user;
