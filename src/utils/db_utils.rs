use actix_web::error::ErrorBadRequest;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Only keys listed in `allowed` may appear in `payload`; they are the only
/// text spliced into the statement, values are always bound.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: SqlValue,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    if let Some(unknown) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ErrorBadRequest(format!("Field '{}' cannot be updated", unknown)));
    }

    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values = Vec::with_capacity(obj.len() + 1);

    // Convert JSON values → SqlValue
    for value in obj.values() {
        match value {
            Value::String(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(d) => values.push(SqlValue::Date(d)),
                Err(_) => values.push(SqlValue::String(s.clone())),
            },
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    values.push(SqlValue::U64(u));
                } else if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(ErrorBadRequest("Unsupported JSON value type")),
        }
    }

    // WHERE id = ?
    values.push(id_value);

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// ===============================
/// Integrity constraint failures
/// ===============================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique,
    ForeignKey,
}

/// Classifies a failed write; SQLSTATE 23000 alone covers both kinds.
pub fn constraint_violation(e: &sqlx::Error) -> Option<ConstraintViolation> {
    let sqlx::Error::Database(db_err) = e else {
        return None;
    };
    if db_err.is_unique_violation() {
        Some(ConstraintViolation::Unique)
    } else if db_err.is_foreign_key_violation() {
        Some(ConstraintViolation::ForeignKey)
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) mod fake_db_error {
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::error::Error as StdError;

    #[derive(Debug, thiserror::Error)]
    #[error("integrity constraint violation")]
    pub struct FakeDbError(pub ErrorKind);

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "integrity constraint violation"
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                ErrorKind::NotNullViolation => ErrorKind::NotNullViolation,
                ErrorKind::CheckViolation => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    pub fn db_error(kind: ErrorKind) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakeDbError(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::fake_db_error::db_error;
    use super::*;
    use serde_json::json;
    use sqlx::error::ErrorKind;

    #[test]
    fn unique_and_foreign_key_failures_are_told_apart() {
        assert_eq!(
            constraint_violation(&db_error(ErrorKind::UniqueViolation)),
            Some(ConstraintViolation::Unique)
        );
        assert_eq!(
            constraint_violation(&db_error(ErrorKind::ForeignKeyViolation)),
            Some(ConstraintViolation::ForeignKey)
        );
        assert_eq!(constraint_violation(&db_error(ErrorKind::NotNullViolation)), None);
        assert_eq!(constraint_violation(&sqlx::Error::RowNotFound), None);
    }

    const EMPLOYEE_COLUMNS: &[&str] = &["name", "division", "status"];

    #[test]
    fn builds_set_clause_from_allowed_fields() {
        let update = build_update_sql(
            "employees",
            &json!({"division": "IT", "status": null}),
            EMPLOYEE_COLUMNS,
            "id",
            SqlValue::String("E1".into()),
        )
        .unwrap();

        assert_eq!(update.sql, "UPDATE employees SET division = ?, status = ? WHERE id = ?");
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("IT".into()),
                SqlValue::Null,
                SqlValue::String("E1".into())
            ]
        );
    }

    #[test]
    fn rejects_columns_outside_the_allow_list() {
        let result = build_update_sql(
            "employees",
            &json!({"id = 'x'; --": 1}),
            EMPLOYEE_COLUMNS,
            "id",
            SqlValue::String("E1".into()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        for payload in [json!({}), json!([1, 2]), json!("name")] {
            let result =
                build_update_sql("employees", &payload, EMPLOYEE_COLUMNS, "id", SqlValue::U64(1));
            assert!(result.is_err(), "accepted {payload}");
        }
    }

    #[test]
    fn numbers_and_dates_keep_their_types() {
        let role = build_update_sql("users", &json!({"role_id": 2}), &["role_id"], "id", SqlValue::U64(9))
            .unwrap();
        assert_eq!(role.values, vec![SqlValue::U64(2), SqlValue::U64(9)]);

        let date = build_update_sql("t", &json!({"day": "2025-06-10"}), &["day"], "id", SqlValue::U64(9))
            .unwrap();
        assert_eq!(
            date.values[0],
            SqlValue::Date(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap())
        );
    }
}
