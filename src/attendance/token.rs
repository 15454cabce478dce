use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::attendance::error::ScanError;

/// Payload carried by an employee's attendance QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IdentityToken {
    #[schema(example = "E1")]
    pub id: String,
    #[schema(example = "Siti Rahma")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Finance", nullable = true)]
    pub division: Option<String>,
}

impl IdentityToken {
    /// Parses the raw text of a scanned code.
    pub fn decode(raw: &str) -> Result<Self, ScanError> {
        let token: IdentityToken =
            serde_json::from_str(raw.trim()).map_err(|_| ScanError::InvalidToken)?;

        let id = token.id.trim();
        let name = token.name.trim();
        if id.is_empty() || name.is_empty() {
            return Err(ScanError::InvalidToken);
        }

        Ok(IdentityToken {
            id: id.to_string(),
            name: name.to_string(),
            division: token
                .division
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_payload() {
        let token = IdentityToken::decode(r#"{"id":"E1","name":"Siti"}"#).unwrap();
        assert_eq!(token.id, "E1");
        assert_eq!(token.name, "Siti");
        assert_eq!(token.division, None);
    }

    #[test]
    fn trims_fields_and_drops_blank_division() {
        let token =
            IdentityToken::decode(r#" {"id":" E7 ","name":"Budi ","division":"  "} "#).unwrap();
        assert_eq!(token.id, "E7");
        assert_eq!(token.name, "Budi");
        assert_eq!(token.division, None);
    }

    #[test]
    fn ignores_unknown_fields() {
        let token =
            IdentityToken::decode(r#"{"id":"E1","name":"Siti","division":"IT","v":2}"#).unwrap();
        assert_eq!(token.division.as_deref(), Some("IT"));
    }

    #[test]
    fn rejects_malformed_payloads() {
        for raw in [
            "",
            "E1",
            "[]",
            r#"{"name":"Siti"}"#,
            r#"{"id":"E1"}"#,
            r#"{"id":"","name":"Siti"}"#,
            r#"{"id":1,"name":"Siti"}"#,
        ] {
            assert!(
                matches!(IdentityToken::decode(raw), Err(ScanError::InvalidToken)),
                "accepted {raw:?}"
            );
        }
    }
}
