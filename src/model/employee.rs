use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::attendance::token::IdentityToken;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": "E1",
        "name": "Siti Rahma",
        "division": "Finance",
        "email": "siti.rahma@company.co.id",
        "phone": "+6281234567890",
        "position": "Accountant",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = "E1")]
    pub id: String,

    #[schema(example = "Siti Rahma")]
    pub name: String,

    #[schema(example = "Finance", nullable = true)]
    pub division: Option<String>,

    #[schema(example = "siti.rahma@company.co.id", nullable = true)]
    pub email: Option<String>,

    #[schema(example = "+6281234567890", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "Accountant", nullable = true)]
    pub position: Option<String>,

    #[schema(example = "active")]
    pub status: String,
}

impl Employee {
    /// Payload to print on the employee's attendance QR code.
    pub fn identity_token(&self) -> IdentityToken {
        IdentityToken {
            id: self.id.clone(),
            name: self.name.clone(),
            division: self.division.clone(),
        }
    }
}
