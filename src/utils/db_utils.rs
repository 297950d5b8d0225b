use actix_web::error::ErrorBadRequest;
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::MySqlPool;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// LIMIT/OFFSET window for list endpoints. The offset is widened to `u64`
/// so any client supplied page number stays representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub offset: u64,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);

        Self {
            page,
            per_page,
            offset: u64::from(page - 1) * u64::from(per_page),
        }
    }
}

/// Typed bind value for dynamically built WHERE clauses
#[derive(Debug, PartialEq)]
pub enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
    Bool(bool),
}

/// Binds a slice of [`FilterValue`]s onto any sqlx query builder, in order.
macro_rules! bind_filters {
    ($query:expr, $args:expr) => {{
        let mut q = $query;
        for arg in $args {
            q = match arg {
                $crate::utils::db_utils::FilterValue::U64(v) => q.bind(*v),
                $crate::utils::db_utils::FilterValue::Str(s) => q.bind(s.as_str()),
                $crate::utils::db_utils::FilterValue::Date(d) => q.bind(*d),
                $crate::utils::db_utils::FilterValue::Bool(b) => q.bind(*b),
            };
        }
        q
    }};
}

pub(crate) use bind_filters;

/// A column a dynamic `UPDATE` may write.
#[derive(Debug, Clone, Copy)]
pub struct UpdatableColumn {
    pub name: &'static str,
    pub nullable: bool,
}

impl UpdatableColumn {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str) -> Self {
        Self {
            name,
            nullable: true,
        }
    }
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    /// One per `SET` column, in order; `None` binds NULL
    pub values: Vec<Option<String>>,
    pub id: u64,
}

/// Build a dynamic `UPDATE` from a JSON object of text columns.
///
/// Keys must name one of `columns`. Values are trimmed non-empty strings, or
/// `null` where the column allows it.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    columns: &[UpdatableColumn],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    let mut set_clause = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len());

    for (key, value) in obj {
        let column = columns
            .iter()
            .find(|c| c.name == key.as_str())
            .ok_or_else(|| ErrorBadRequest(format!("Field not updatable: {}", key)))?;

        let bound = match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Null if column.nullable => None,
            _ if column.nullable => {
                return Err(ErrorBadRequest(format!(
                    "{} must be a non-empty string or null",
                    column.name
                )));
            }
            _ => {
                return Err(ErrorBadRequest(format!(
                    "{} must be a non-empty string",
                    column.name
                )));
            }
        };

        set_clause.push(format!("{} = ?", column.name));
        values.push(bound);
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        set_clause.join(", "),
        id_column
    );

    Ok(SqlUpdate {
        sql,
        values,
        id: id_value,
    })
}

pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = query.bind(value);
    }

    let result = query.bind(update.id).execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLUMNS: &[UpdatableColumn] = &[
        UpdatableColumn::required("full_name"),
        UpdatableColumn::required("department"),
        UpdatableColumn::nullable("profile_image"),
    ];

    #[test]
    fn builds_update_for_allowed_fields() {
        let update = build_update_sql(
            "users",
            &json!({ "department": " Finance ", "profile_image": null }),
            COLUMNS,
            "id",
            7,
        )
        .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE users SET department = ?, profile_image = ? WHERE id = ?"
        );
        assert_eq!(update.values, vec![Some("Finance".to_string()), None]);
        assert_eq!(update.id, 7);
    }

    #[test]
    fn date_like_text_stays_text() {
        let update =
            build_update_sql("users", &json!({ "full_name": "2026-01-01" }), COLUMNS, "id", 1)
                .unwrap();
        assert_eq!(update.values, vec![Some("2026-01-01".to_string())]);
    }

    #[test]
    fn rejects_unknown_or_empty_payloads() {
        assert!(build_update_sql("users", &json!({ "role_id": 1 }), COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("users", &json!({}), COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("users", &json!([1, 2]), COLUMNS, "id", 1).is_err());
        assert!(
            build_update_sql("users", &json!({ "full_name": ["a"] }), COLUMNS, "id", 1).is_err()
        );
    }

    #[test]
    fn required_columns_need_non_empty_text() {
        for value in [json!(null), json!(""), json!("   "), json!(5), json!(true)] {
            let err = build_update_sql(
                "users",
                &json!({ "department": value }),
                COLUMNS,
                "id",
                1,
            )
            .unwrap_err();
            assert_eq!(err.to_string(), "department must be a non-empty string");
        }

        let err = build_update_sql("users", &json!({ "profile_image": 5 }), COLUMNS, "id", 1)
            .unwrap_err();
        assert_eq!(err.to_string(), "profile_image must be a non-empty string or null");
    }

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(
            Pagination::new(None, None),
            Pagination {
                page: 1,
                per_page: 20,
                offset: 0
            }
        );
        assert_eq!(Pagination::new(Some(0), Some(0)).per_page, 1);
        assert_eq!(Pagination::new(Some(3), Some(500)).offset, 200);
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        let window = Pagination::new(Some(u32::MAX), Some(100));
        assert_eq!(window.page, u32::MAX);
        assert_eq!(window.offset, (u64::from(u32::MAX) - 1) * 100);
    }
}
