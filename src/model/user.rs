use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A login account; `employee_id` links it to the employee it scans for.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "siti")]
    pub username: String,
    #[schema(example = 3)]
    pub role_id: u8,
    #[schema(example = "E1", nullable = true)]
    pub employee_id: Option<String>,
    pub is_active: bool,
}
