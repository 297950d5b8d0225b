use crate::{
    auth::auth::AuthUser,
    model::{
        role::Role,
        user::{USER_COLUMNS, User},
    },
    utils::db_utils::{
        FilterValue, Pagination, UpdatableColumn, bind_filters, build_update_sql, execute_update,
    },
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

/// Fields a user may change on their own profile.
const PROFILE_COLUMNS: &[UpdatableColumn] = &[
    UpdatableColumn::required("full_name"),
    UpdatableColumn::required("department"),
    UpdatableColumn::nullable("profile_image"),
];

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department: Option<String>,
    /// 1 = Admin, 2 = HR, 3 = Employee
    pub role_id: Option<u8>,
    /// Search by name, email or employee code
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user directory", body = UserListResponse),
        (status = 400, description = "Invalid filter"),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let Pagination {
        page,
        per_page,
        offset,
    } = Pagination::new(query.page, query.per_page);

    let mut conditions = Vec::new();
    let mut bindings: Vec<FilterValue> = Vec::new();

    if let Some(department) = query
        .department
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        conditions.push("department = ?");
        bindings.push(FilterValue::Str(department.to_string()));
    }

    if let Some(role_id) = query.role_id {
        if Role::from_id(role_id).is_none() {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": "Unknown role" })));
        }
        conditions.push("role_id = ?");
        bindings.push(FilterValue::U64(role_id as u64));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(full_name LIKE ? OR email LIKE ? OR employee_code LIKE ?)");
        let like = format!("%{}%", search);
        bindings.push(FilterValue::Str(like.clone()));
        bindings.push(FilterValue::Str(like.clone()));
        bindings.push(FilterValue::Str(like));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting users");

    let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_sql), &bindings)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %count_sql, "Failed to count users");
            ErrorInternalServerError("Database error")
        })?;

    let data_sql = format!(
        "SELECT {} FROM users {} ORDER BY full_name ASC LIMIT ? OFFSET ?",
        USER_COLUMNS, where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching users");

    let users = bind_filters!(sqlx::query_as::<_, User>(&data_sql), &bindings)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %data_sql, "Failed to fetch users");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(("user_id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found", body = Object, example = json!({
            "message": "User not found"
        }))
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    auth.require_self_or_privileged(user_id)?;

    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);

    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch user");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match user {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "User not found" }))),
    }
}

/// Patch the caller's own profile
#[utoipa::path(
    patch,
    path = "/api/me",
    request_body(
        content = Object,
        description = "Any of full_name, department (non-empty text) or profile_image (text or null)",
        example = json!({ "profile_image": "https://res.cloudinary.com/demo/image/upload/v1/profiles/7.jpg" })
    ),
    responses(
        (status = 200, description = "Profile updated", body = Object, example = json!({
            "message": "Profile updated"
        })),
        (status = 400, description = "Empty payload, field not updatable or blank value"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let update = build_update_sql("users", &body, PROFILE_COLUMNS, "id", auth.user_id)?;

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to update profile");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if affected == 0 {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
                .bind(auth.user_id)
                .fetch_one(pool.get_ref())
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to check user");
                    ErrorInternalServerError("Internal Server Error")
                })?;

        if !exists {
            return Ok(HttpResponse::NotFound().json(json!({ "message": "User not found" })));
        }
    }

    info!(user_id = auth.user_id, "Profile updated");

    Ok(HttpResponse::Ok().json(json!({ "message": "Profile updated" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::config::Config;
    use actix_web::{App, http::StatusCode, test as atest};

    #[actix_web::test]
    async fn employees_cannot_list_users_or_patch_forbidden_fields() {
        let config = Config::for_tests();
        let token =
            generate_access_token(5, "e@company.com".into(), Role::Employee.id(), &config.jwt_secret, 60)
                .unwrap();
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();

        let app = atest::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(config))
                .route("/api/users", web::get().to(list_users))
                .route("/api/users/{id}", web::get().to(get_user))
                .route("/api/me", web::patch().to(update_profile)),
        )
        .await;
        let auth = ("Authorization", format!("Bearer {token}"));

        let req = atest::TestRequest::get()
            .uri("/api/users")
            .insert_header(auth.clone())
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = atest::TestRequest::get()
            .uri("/api/users/6")
            .insert_header(auth.clone())
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = atest::TestRequest::patch()
            .uri("/api/me")
            .insert_header(auth.clone())
            .set_json(json!({ "role_id": 1 }))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = atest::TestRequest::patch()
            .uri("/api/me")
            .insert_header(auth)
            .set_json(json!({ "full_name": "  " }))
            .to_request();
        assert_eq!(atest::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn department_cannot_be_cleared() {
        let config = Config::for_tests();
        let token =
            generate_access_token(5, "e@company.com".into(), Role::Employee.id(), &config.jwt_secret, 60)
                .unwrap();
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();

        let app = atest::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(config))
                .route("/api/me", web::patch().to(update_profile)),
        )
        .await;

        for body in [
            json!({ "department": null }),
            json!({ "department": "" }),
            json!({ "department": 5 }),
            json!({ "profile_image": "" }),
        ] {
            let req = atest::TestRequest::patch()
                .uri("/api/me")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .set_json(&body)
                .to_request();
            assert_eq!(
                atest::call_service(&app, req).await.status(),
                StatusCode::BAD_REQUEST,
                "{body}"
            );
        }
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized() {
        let config = Config::for_tests();
        let pool = MySqlPool::connect_lazy(&config.database_url).unwrap();

        let app = atest::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(config))
                .route("/api/users", web::get().to(list_users)),
        )
        .await;

        let req = atest::TestRequest::get().uri("/api/users").to_request();
        assert_eq!(
            atest::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
