use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User as exposed over the API. The password hash never leaves `UserSql`.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "full_name": "Nusrat Jahan",
        "email": "nusrat@company.com",
        "department": "Operations",
        "employee_code": "EMP-0042",
        "start_date": "2025-02-01",
        "profile_image": null,
        "role_id": 3,
        "is_active": true,
        "last_login_at": "2026-10-15T08:02:11"
    })
)]
pub struct User {
    pub id: u64,
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub employee_code: String,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(nullable = true)]
    pub profile_image: Option<String>,
    pub role_id: u8,
    pub is_active: bool,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_login_at: Option<NaiveDateTime>,
}

pub const USER_COLUMNS: &str = "id, full_name, email, department, employee_code, start_date, \
     profile_image, role_id, is_active, last_login_at";
