use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::status::{AttendanceStatus, StatusPolicy};
use crate::utils::asset_url::transform_cloudinary_url;
use crate::utils::timefmt::{date_key, display_date, display_time};

/// Row as read from `attendance` joined with the owning user.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub user_id: u64,
    pub full_name: String,
    pub department: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub address: String,
    pub place_name: Option<String>,
    pub location_provider: String,
    pub photo_url: String,
    pub note: Option<String>,
    pub attachment_url: Option<String>,
    pub attachment_name: Option<String>,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

pub const ATTENDANCE_SELECT: &str = r#"
    SELECT a.id, a.user_id, u.full_name, u.department, a.date, a.time, a.status,
           a.latitude, a.longitude, a.accuracy, a.address, a.place_name,
           a.location_provider, a.photo_url, a.note, a.attachment_url,
           a.attachment_name, a.confirmed, a.created_at
    FROM attendance a
    JOIN users u ON u.id = a.user_id
"#;

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[schema(nullable = true)]
    pub accuracy: Option<f64>,
    pub address: String,
    #[schema(nullable = true)]
    pub place_name: Option<String>,
    pub provider: String,
}

/// Attendance record ready for display.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceView {
    pub id: u64,
    pub user_id: u64,
    pub full_name: String,
    pub department: String,
    #[schema(example = "2026-10-16")]
    pub date: String,
    #[schema(example = "08:12:40")]
    pub time: String,
    #[schema(example = "Friday, 16 October 2026")]
    pub display_date: String,
    #[schema(example = "08:12 AM")]
    pub display_time: String,
    pub status: AttendanceStatus,
    pub location: AttendanceLocation,
    pub photo_url: String,
    #[schema(nullable = true)]
    pub note: Option<String>,
    #[schema(nullable = true)]
    pub attachment_url: Option<String>,
    #[schema(nullable = true)]
    pub attachment_name: Option<String>,
    pub confirmed: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl AttendanceView {
    pub fn from_row(row: AttendanceRow, policy: &StatusPolicy) -> Self {
        let status = policy.resolve(row.status.as_deref(), row.time);
        let attachment_url = row
            .attachment_url
            .as_deref()
            .map(|url| transform_cloudinary_url(url, row.attachment_name.as_deref()));

        Self {
            id: row.id,
            user_id: row.user_id,
            full_name: row.full_name,
            department: row.department,
            date: date_key(row.date),
            time: row.time.format("%H:%M:%S").to_string(),
            display_date: display_date(row.date),
            display_time: display_time(row.time),
            status,
            location: AttendanceLocation {
                latitude: row.latitude,
                longitude: row.longitude,
                accuracy: row.accuracy,
                address: row.address,
                place_name: row.place_name,
                provider: row.location_provider,
            },
            photo_url: row.photo_url,
            note: row.note,
            attachment_url,
            attachment_name: row.attachment_name,
            confirmed: row.confirmed,
            created_at: row.created_at,
        }
    }
}
