use crate::auth::auth::AuthUser;
use crate::model::activity::WeekPlan;
use crate::utils::timefmt::{date_key, parse_date_key, week_start};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, warn};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct WeekPlanResponse {
    #[schema(example = "2026-10-12")]
    pub week_start: String,
    pub days: WeekPlan,
}

fn resolve_week(raw: &str) -> Result<NaiveDate, HttpResponse> {
    parse_date_key(raw).map(week_start).map_err(|_| {
        HttpResponse::BadRequest().json(json!({
            "message": "Date must be formatted YYYY-MM-DD"
        }))
    })
}

/// Weekly planner for the week containing `date`
#[utoipa::path(
    get,
    path = "/api/activities/{date}",
    params(("date" = String, Path, description = "Any date in the week, YYYY-MM-DD")),
    responses(
        (status = 200, description = "All seven weekdays, empty where nothing is planned", body = WeekPlanResponse),
        (status = 400, description = "Malformed date"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Activities"
)]
pub async fn get_week(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let week = match resolve_week(&path) {
        Ok(w) => w,
        Err(resp) => return Ok(resp),
    };

    let stored = sqlx::query_scalar::<_, String>(
        "SELECT entries FROM activity_weeks WHERE user_id = ? AND week_start = ?",
    )
    .bind(auth.user_id)
    .bind(week)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to fetch planner week");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let days = match stored {
        Some(raw) => serde_json::from_str::<WeekPlan>(&raw).unwrap_or_else(|e| {
            warn!(
                error = %e,
                user_id = auth.user_id,
                week = %date_key(week),
                "Unreadable planner week, serving empty"
            );
            WeekPlan::default()
        }),
        None => WeekPlan::default(),
    };

    Ok(HttpResponse::Ok().json(WeekPlanResponse {
        week_start: date_key(week),
        days,
    }))
}

/// Replace the week containing `date` wholesale
#[utoipa::path(
    put,
    path = "/api/activities/{date}",
    params(("date" = String, Path, description = "Any date in the week, YYYY-MM-DD")),
    request_body = WeekPlan,
    responses(
        (status = 200, description = "Stored week, normalised", body = WeekPlanResponse),
        (status = 400, description = "Malformed date or entry", body = Object, example = json!({
            "message": "Monday: invalid time \"noon\", expected HH:MM"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Activities"
)]
pub async fn put_week(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<WeekPlan>,
) -> actix_web::Result<impl Responder> {
    let week = match resolve_week(&path) {
        Ok(w) => w,
        Err(resp) => return Ok(resp),
    };

    let days = match payload.into_inner().normalize() {
        Ok(days) => days,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
        }
    };

    let encoded = serde_json::to_string(&days).map_err(|e| {
        error!(error = %e, "Failed to encode planner week");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    sqlx::query(
        r#"
        INSERT INTO activity_weeks (user_id, week_start, entries)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE entries = VALUES(entries)
        "#,
    )
    .bind(auth.user_id)
    .bind(week)
    .bind(encoded)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to store planner week");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    info!(user_id = auth.user_id, week = %date_key(week), "Planner week replaced");

    Ok(HttpResponse::Ok().json(WeekPlanResponse {
        week_start: date_key(week),
        days,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::config::Config;
    use actix_web::{App, http::StatusCode, test as atest};

    #[actix_web::test]
    async fn bad_dates_and_entries_are_rejected() {
        let config = Config::for_tests();
        let token =
            generate_access_token(4, "p@company.com".into(), 3, &config.jwt_secret, 60).unwrap();
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();

        let app = atest::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(config))
                .route("/api/activities/{date}", web::get().to(get_week))
                .route("/api/activities/{date}", web::put().to(put_week)),
        )
        .await;
        let auth = ("Authorization", format!("Bearer {token}"));

        let req = atest::TestRequest::get()
            .uri("/api/activities/16-10-2026")
            .insert_header(auth.clone())
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = atest::TestRequest::put()
            .uri("/api/activities/2026-10-16")
            .insert_header(auth.clone())
            .set_json(json!({ "Monday": [{ "time": "noon", "description": "Lunch" }] }))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = atest::read_body_json(resp).await;
        assert_eq!(body["message"], "Monday: invalid time \"noon\", expected HH:MM");

        let req = atest::TestRequest::put()
            .uri("/api/activities/2026-10-16")
            .insert_header(auth)
            .set_json(json!({ "Someday": [] }))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
