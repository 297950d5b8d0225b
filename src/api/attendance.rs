use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::geo::{GeoPoint, GeocodeCascade, ResolvedLocation};
use crate::model::attendance::{ATTENDANCE_SELECT, AttendanceRow, AttendanceView};
use crate::model::status::{AttendanceStatus, StatusPolicy};
use crate::utils::db_utils::{FilterValue, Pagination, bind_filters};
use crate::utils::timefmt::date_key;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

const MAX_NOTE_LEN: usize = 1000;
const DUPLICATE_KEY: &str = "23000";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckInRequest {
    /// Selfie already uploaded to the asset host
    #[schema(example = "https://res.cloudinary.com/demo/image/upload/v1/attendance/7-20261016.jpg")]
    pub photo_url: String,
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
    /// Horizontal accuracy in metres as reported by the device
    #[schema(example = 12.5)]
    pub accuracy: Option<f64>,
    #[schema(example = "Visiting client site")]
    pub note: Option<String>,
    pub attachment_url: Option<String>,
    #[schema(example = "visit-order.pdf")]
    pub attachment_name: Option<String>,
    /// Place name the device resolved itself, used when providers return none
    pub place_name: Option<String>,
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    (url.starts_with("https://") || url.starts_with("http://")) && !url.contains(char::is_whitespace)
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a check-in payload, returning the fix it was taken at.
pub fn validate_check_in(req: &CheckInRequest) -> Result<GeoPoint, String> {
    if !is_http_url(&req.photo_url) {
        return Err("photo_url must be an http(s) URL".to_string());
    }

    if let Some(url) = trimmed(&req.attachment_url) {
        if !is_http_url(&url) {
            return Err("attachment_url must be an http(s) URL".to_string());
        }
    }

    if let Some(accuracy) = req.accuracy {
        if !accuracy.is_finite() || accuracy < 0.0 {
            return Err("accuracy must be a non-negative number".to_string());
        }
    }

    if req
        .note
        .as_deref()
        .is_some_and(|n| n.chars().count() > MAX_NOTE_LEN)
    {
        return Err(format!("note longer than {} characters", MAX_NOTE_LEN));
    }

    GeoPoint::new(req.latitude, req.longitude).map_err(|e| e.to_string())
}

/// Server-side facts recorded with a check-in.
#[derive(Debug, PartialEq)]
pub struct CheckInStamp {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AttendanceStatus,
    pub place_name: Option<String>,
}

/// Stamps a check-in taken at `now` (already in the office offset). The
/// provider's place name wins over the one the device resolved.
pub fn stamp_check_in(
    now: DateTime<FixedOffset>,
    policy: &StatusPolicy,
    location: &ResolvedLocation,
    device_place_name: &Option<String>,
) -> CheckInStamp {
    let time = now.time().with_nanosecond(0).unwrap_or_else(|| now.time());

    CheckInStamp {
        date: now.date_naive(),
        time,
        status: policy.classify(time),
        place_name: location
            .place_name
            .clone()
            .or_else(|| trimmed(device_place_name)),
    }
}

/// Maps a failed insert: the per-day unique key means the user already checked in.
fn insert_failure(code: Option<&str>) -> actix_web::Result<HttpResponse> {
    if code == Some(DUPLICATE_KEY) {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Already checked in today"
        })));
    }

    Err(actix_web::error::ErrorInternalServerError(
        "Internal Server Error",
    ))
}

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> actix_web::Error {
    move |e| {
        error!(error = %e, "{}", context);
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    }
}

async fn fetch_view(
    pool: &MySqlPool,
    id: u64,
    config: &Config,
) -> Result<Option<AttendanceView>, sqlx::Error> {
    let sql = format!("{} WHERE a.id = ?", ATTENDANCE_SELECT);

    let row = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| AttendanceView::from_row(r, &config.status_policy)))
}

/// Check in for today
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Checked in", body = AttendanceView),
        (status = 400, description = "Invalid payload", body = Object, example = json!({
            "message": "photo_url must be an http(s) URL"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "check_in", skip_all, fields(user_id = auth.user_id))]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    geo: web::Data<GeocodeCascade>,
    payload: web::Json<CheckInRequest>,
) -> actix_web::Result<impl Responder> {
    let point = match validate_check_in(&payload) {
        Ok(p) => p,
        Err(message) => {
            debug!(%message, "Check-in rejected");
            return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
        }
    };

    let location = geo.resolve(point).await;
    let stamp = stamp_check_in(
        Utc::now().with_timezone(&config.utc_offset),
        &config.status_policy,
        &location,
        &payload.place_name,
    );

    info!(
        date = %date_key(stamp.date),
        status = %stamp.status,
        provider = %location.provider,
        "Recording check-in"
    );

    let result = sqlx::query(
        r#"
        INSERT INTO attendance
            (user_id, date, time, status, latitude, longitude, accuracy, address,
             place_name, location_provider, photo_url, note, attachment_url, attachment_name)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(stamp.date)
    .bind(stamp.time)
    .bind(stamp.status.to_string())
    .bind(point.latitude)
    .bind(point.longitude)
    .bind(payload.accuracy)
    .bind(&location.address)
    .bind(&stamp.place_name)
    .bind(&location.provider)
    .bind(payload.photo_url.trim())
    .bind(trimmed(&payload.note))
    .bind(trimmed(&payload.attachment_url))
    .bind(trimmed(&payload.attachment_name))
    .execute(pool.get_ref())
    .await;

    let inserted = match result {
        Ok(r) => r.last_insert_id(),
        Err(e) => {
            let code = match &e {
                sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
                _ => None,
            };
            if code.as_deref() != Some(DUPLICATE_KEY) {
                error!(error = %e, "Check-in failed");
            }
            return insert_failure(code.as_deref());
        }
    };

    let view = fetch_view(pool.get_ref(), inserted, &config)
        .await
        .map_err(db_error("Failed to read back check-in"))?;

    match view {
        Some(v) => Ok(HttpResponse::Created().json(v)),
        None => Err(actix_web::error::ErrorInternalServerError(
            "Internal Server Error",
        )),
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    /// Only honoured for HR/Admin; employees always see their own records
    pub user_id: Option<u64>,
    pub department: Option<String>,
    #[schema(example = "Late")]
    pub status: Option<String>,
    #[schema(example = "2026-10-01", value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[schema(example = "2026-10-31", value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
    pub confirmed: Option<bool>,
    /// Matches full name
    pub search: Option<String>,
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceView>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// WHERE clause plus bind values for a listing, scoped to the caller.
fn build_filter(
    auth: &AuthUser,
    query: &AttendanceQuery,
) -> Result<(String, Vec<FilterValue>), String> {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args = Vec::new();

    let user_id = if auth.is_privileged() {
        query.user_id
    } else {
        Some(auth.user_id)
    };

    if let Some(user_id) = user_id {
        where_sql.push_str(" AND a.user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(department) = trimmed(&query.department) {
        where_sql.push_str(" AND u.department = ?");
        args.push(FilterValue::Str(department));
    }

    if let Some(raw) = trimmed(&query.status) {
        let status = raw
            .parse::<AttendanceStatus>()
            .map_err(|_| format!("Unknown status: {}", raw))?;
        where_sql.push_str(" AND a.status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }

    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err("from must not be after to".to_string());
        }
    }

    if let Some(from) = query.from {
        where_sql.push_str(" AND a.date >= ?");
        args.push(FilterValue::Date(from));
    }

    if let Some(to) = query.to {
        where_sql.push_str(" AND a.date <= ?");
        args.push(FilterValue::Date(to));
    }

    if let Some(confirmed) = query.confirmed {
        where_sql.push_str(" AND a.confirmed = ?");
        args.push(FilterValue::Bool(confirmed));
    }

    if let Some(search) = trimmed(&query.search) {
        where_sql.push_str(" AND u.full_name LIKE ?");
        args.push(FilterValue::Str(format!("%{}%", search)));
    }

    Ok((where_sql, args))
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance list, newest first", body = AttendanceListResponse),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let Pagination {
        page,
        per_page,
        offset,
    } = Pagination::new(query.page, query.per_page);

    let (where_sql, args) = match build_filter(&auth, &query) {
        Ok(f) => f,
        Err(message) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": message })));
        }
    };

    let count_sql = format!(
        "SELECT COUNT(*) FROM attendance a JOIN users u ON u.id = a.user_id{}",
        where_sql
    );
    debug!(sql = %count_sql, args = ?args, "Counting attendance");

    let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_sql), &args)
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count attendance"))?;

    let data_sql = format!(
        "{}{} ORDER BY a.date DESC, a.time DESC LIMIT ? OFFSET ?",
        ATTENDANCE_SELECT, where_sql
    );

    let rows = bind_filters!(sqlx::query_as::<_, AttendanceRow>(&data_sql), &args)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch attendance"))?;

    let data = rows
        .into_iter()
        .map(|r| AttendanceView::from_row(r, &config.status_policy))
        .collect();

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Attendance record detail
#[utoipa::path(
    get,
    path = "/api/attendance/{id}",
    params(("id" = u64, Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Record found", body = AttendanceView),
        (status = 403, description = "Record belongs to someone else"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn get_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let view = fetch_view(pool.get_ref(), id, &config)
        .await
        .map_err(db_error("Failed to fetch attendance record"))?;

    match view {
        Some(v) => {
            auth.require_self_or_privileged(v.user_id)?;
            Ok(HttpResponse::Ok().json(v))
        }
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance record not found"
        }))),
    }
}

async fn record_exists(pool: &MySqlPool, id: u64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM attendance WHERE id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Confirm a record (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/attendance/{id}/confirm",
    params(("id" = u64, Path, description = "Attendance record ID")),
    responses(
        (status = 200, description = "Record confirmed", body = Object, example = json!({
            "message": "Attendance confirmed"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn confirm_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let id = path.into_inner();

    let result = sqlx::query("UPDATE attendance SET confirmed = TRUE WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Confirm attendance failed"))?;

    // MySQL reports 0 affected rows when the value did not change
    if result.rows_affected() == 0
        && !record_exists(pool.get_ref(), id)
            .await
            .map_err(db_error("Confirm attendance failed"))?
    {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance record not found"
        })));
    }

    info!(id, by = auth.user_id, "Attendance confirmed");

    Ok(HttpResponse::Ok().json(json!({ "message": "Attendance confirmed" })))
}

#[derive(Deserialize, ToSchema)]
pub struct SetStatusRequest {
    #[schema(example = "Excused")]
    pub status: AttendanceStatus,
}

/// Override a record's status (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/attendance/{id}/status",
    params(("id" = u64, Path, description = "Attendance record ID")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Object, example = json!({
            "message": "Status updated",
            "status": "Excused"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn set_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<SetStatusRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let id = path.into_inner();

    let result = sqlx::query("UPDATE attendance SET status = ? WHERE id = ?")
        .bind(payload.status.to_string())
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Set attendance status failed"))?;

    if result.rows_affected() == 0
        && !record_exists(pool.get_ref(), id)
            .await
            .map_err(db_error("Set attendance status failed"))?
    {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Attendance record not found"
        })));
    }

    info!(id, status = %payload.status, by = auth.user_id, "Attendance status overridden");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Status updated",
        "status": payload.status
    })))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Defaults to the first day of the current month
    #[param(value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    /// Defaults to today
    #[param(value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
    /// HR/Admin only
    pub user_id: Option<u64>,
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    #[schema(example = "2026-10-01")]
    pub from: String,
    #[schema(example = "2026-10-16")]
    pub to: String,
    pub present: i64,
    pub late: i64,
    pub excused: i64,
    pub unexcused: i64,
    pub total: i64,
}

impl AttendanceSummary {
    fn tally(from: NaiveDate, to: NaiveDate, counts: Vec<(String, i64)>) -> Self {
        let mut summary = AttendanceSummary {
            from: date_key(from),
            to: date_key(to),
            ..Default::default()
        };

        for (raw, count) in counts {
            match raw.parse::<AttendanceStatus>() {
                Ok(AttendanceStatus::Present) => summary.present += count,
                Ok(AttendanceStatus::Late) => summary.late += count,
                Ok(AttendanceStatus::Excused) => summary.excused += count,
                Ok(AttendanceStatus::Unexcused) => summary.unexcused += count,
                Err(_) => {
                    warn!(status = %raw, count, "Ignoring unknown stored status");
                    continue;
                }
            }
            summary.total += count;
        }

        summary
    }
}

/// Status counts for a period
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Counts per status", body = AttendanceSummary),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let today = Utc::now().with_timezone(&config.utc_offset).date_naive();
    let to = query.to.unwrap_or(today);
    let from = query
        .from
        .unwrap_or_else(|| to.with_day(1).unwrap_or(to));

    if from > to {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "from must not be after to"
        })));
    }

    let user_id = if auth.is_privileged() {
        query.user_id
    } else {
        Some(auth.user_id)
    };

    let mut sql = String::from(
        "SELECT status, COUNT(*) FROM attendance WHERE date >= ? AND date <= ?",
    );
    if user_id.is_some() {
        sql.push_str(" AND user_id = ?");
    }
    sql.push_str(" GROUP BY status");

    let mut q = sqlx::query_as::<_, (String, i64)>(&sql).bind(from).bind(to);
    if let Some(user_id) = user_id {
        q = q.bind(user_id);
    }

    let counts = q
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to summarise attendance"))?;

    Ok(HttpResponse::Ok().json(AttendanceSummary::tally(from, to, counts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn request() -> CheckInRequest {
        CheckInRequest {
            photo_url: "https://res.cloudinary.com/demo/image/upload/v1/a.jpg".into(),
            latitude: 23.8103,
            longitude: 90.4125,
            accuracy: Some(8.0),
            note: None,
            attachment_url: None,
            attachment_name: None,
            place_name: None,
        }
    }

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: 7,
            email: "u@company.com".into(),
            role,
        }
    }

    #[test]
    fn valid_check_in_yields_point() {
        let point = validate_check_in(&request()).unwrap();
        assert_eq!(point.latitude, 23.8103);
    }

    #[test]
    fn check_in_rejects_bad_fields() {
        let mut r = request();
        r.photo_url = "file:///sdcard/selfie.jpg".into();
        assert!(validate_check_in(&r).is_err());

        let mut r = request();
        r.latitude = 120.0;
        assert!(validate_check_in(&r).is_err());

        let mut r = request();
        r.accuracy = Some(-1.0);
        assert!(validate_check_in(&r).is_err());

        let mut r = request();
        r.attachment_url = Some("ftp://files/a.pdf".into());
        assert!(validate_check_in(&r).is_err());

        let mut r = request();
        r.note = Some("n".repeat(MAX_NOTE_LEN + 1));
        assert!(validate_check_in(&r).is_err());

        // blank optional fields are ignored
        let mut r = request();
        r.attachment_url = Some("  ".into());
        assert!(validate_check_in(&r).is_ok());
    }

    #[test]
    fn employees_are_scoped_to_themselves() {
        let query = AttendanceQuery {
            user_id: Some(99),
            ..Default::default()
        };

        let (sql, args) = build_filter(&user(Role::Employee), &query).unwrap();
        assert_eq!(sql, " WHERE 1=1 AND a.user_id = ?");
        assert_eq!(args, vec![FilterValue::U64(7)]);

        let (_, args) = build_filter(&user(Role::Hr), &query).unwrap();
        assert_eq!(args, vec![FilterValue::U64(99)]);

        let (sql, args) = build_filter(&user(Role::Admin), &AttendanceQuery::default()).unwrap();
        assert_eq!(sql, " WHERE 1=1");
        assert!(args.is_empty());
    }

    #[test]
    fn filters_are_validated_and_normalised() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 10, day).unwrap();

        let query = AttendanceQuery {
            status: Some("late".into()),
            from: Some(d(1)),
            to: Some(d(16)),
            search: Some(" Nus ".into()),
            ..Default::default()
        };
        let (sql, args) = build_filter(&user(Role::Admin), &query).unwrap();
        assert_eq!(
            sql,
            " WHERE 1=1 AND a.status = ? AND a.date >= ? AND a.date <= ? AND u.full_name LIKE ?"
        );
        assert_eq!(
            args,
            vec![
                FilterValue::Str("Late".into()),
                FilterValue::Date(d(1)),
                FilterValue::Date(d(16)),
                FilterValue::Str("%Nus%".into()),
            ]
        );

        let bad_status = AttendanceQuery {
            status: Some("Sick".into()),
            ..Default::default()
        };
        assert!(build_filter(&user(Role::Admin), &bad_status).is_err());

        let inverted = AttendanceQuery {
            from: Some(d(16)),
            to: Some(d(1)),
            ..Default::default()
        };
        assert!(build_filter(&user(Role::Admin), &inverted).is_err());
    }

    #[test]
    fn summary_tallies_known_statuses() {
        let from = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        let summary = AttendanceSummary::tally(
            from,
            to,
            vec![
                ("Present".into(), 9),
                ("Late".into(), 3),
                ("Unexcused".into(), 1),
                ("Holiday".into(), 4),
            ],
        );

        assert_eq!(
            summary,
            AttendanceSummary {
                from: "2026-10-01".into(),
                to: "2026-10-16".into(),
                present: 9,
                late: 3,
                excused: 0,
                unexcused: 1,
                total: 13,
            }
        );
    }

    fn at(offset_hours: i32, y: i32, m: u32, d: u32, h: u32, min: u32, milli: u32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_milli_opt(h, min, 0, milli)
            .unwrap()
            .and_local_timezone(offset)
            .unwrap()
    }

    fn located(place_name: Option<&str>) -> ResolvedLocation {
        ResolvedLocation {
            address: "Gulshan Avenue, Dhaka".into(),
            place_name: place_name.map(Into::into),
            provider: "nominatim".into(),
        }
    }

    #[test]
    fn stamp_truncates_to_seconds_and_classifies() {
        let policy = StatusPolicy::default();

        let stamp = stamp_check_in(at(6, 2026, 10, 16, 8, 0, 500), &policy, &located(None), &None);
        assert_eq!(stamp.time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(stamp.status, AttendanceStatus::Present);

        let stamp = stamp_check_in(at(6, 2026, 10, 16, 8, 31, 0), &policy, &located(None), &None);
        assert_eq!(stamp.status, AttendanceStatus::Late);

        let stamp = stamp_check_in(at(6, 2026, 10, 16, 9, 1, 0), &policy, &located(None), &None);
        assert_eq!(stamp.status, AttendanceStatus::Unexcused);
    }

    #[test]
    fn stamp_date_follows_office_offset() {
        let utc = at(0, 2026, 10, 16, 23, 30, 0);
        let local = utc.with_timezone(&FixedOffset::east_opt(6 * 3600).unwrap());

        let stamp = stamp_check_in(local, &StatusPolicy::default(), &located(None), &None);
        assert_eq!(stamp.date, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        assert_eq!(stamp.time, NaiveTime::from_hms_opt(5, 30, 0).unwrap());
    }

    #[test]
    fn provider_place_name_wins_over_device() {
        let now = at(6, 2026, 10, 16, 7, 45, 0);
        let policy = StatusPolicy::default();
        let device = Some("  Warehouse 3 ".to_string());

        let stamp = stamp_check_in(now, &policy, &located(None), &device);
        assert_eq!(stamp.place_name.as_deref(), Some("Warehouse 3"));

        let stamp = stamp_check_in(now, &policy, &located(Some("Head Office")), &device);
        assert_eq!(stamp.place_name.as_deref(), Some("Head Office"));

        let stamp = stamp_check_in(now, &policy, &located(None), &Some("   ".into()));
        assert_eq!(stamp.place_name, None);
    }

    #[test]
    fn duplicate_check_in_is_a_conflict() {
        let res = insert_failure(Some("23000")).unwrap();
        assert_eq!(res.status(), actix_web::http::StatusCode::CONFLICT);

        assert!(insert_failure(Some("42S02")).is_err());
        assert!(insert_failure(None).is_err());
    }

    #[actix_web::test]
    async fn last_page_number_does_not_panic() {
        use crate::auth::jwt::generate_access_token;
        use actix_web::{App, test as atest};
        use sqlx::mysql::MySqlPoolOptions;
        use std::time::Duration;

        let config = Config::for_tests();
        let token =
            generate_access_token(7, "u@company.com".into(), Role::Employee.id(), &config.jwt_secret, 60)
                .unwrap();
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(&config.database_url)
            .unwrap();

        let app = atest::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(config))
                .route("/api/attendance", web::get().to(list_attendance)),
        )
        .await;

        // no database behind the pool: the handler must fail cleanly, not overflow
        let req = atest::TestRequest::get()
            .uri("/api/attendance?page=4294967295&per_page=100")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let res = atest::call_service(&app, req).await;
        assert!(res.status().is_server_error());
    }
}
