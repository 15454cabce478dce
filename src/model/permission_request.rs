use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PermissionRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "E1")]
    pub employee_id: String,
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "sick")]
    pub kind: String,
    #[schema(example = "Fever, doctor's note attached")]
    pub reason: String,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = "2025-06-09T23:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
