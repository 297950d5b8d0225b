use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::{
        role::Role,
        user::{USER_COLUMNS, User},
    },
    models::{LoginReqDto, RegisterReq, TokenType, UserSql},
    utils::email_registry::EmailRegistry,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

const DUPLICATE_KEY: &str = "23000";

/// Cheap shape check; delivery is what proves an address.
pub fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn authorization(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    authorization(req).and_then(|h| h.strip_prefix("Bearer "))
}

async fn insert_user(
    req: &RegisterReq,
    email: &str,
    role: Role,
    pool: &MySqlPool,
    registry: &EmailRegistry,
) -> Result<(), HttpResponse> {
    let hashed = hash_password(&req.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        HttpResponse::InternalServerError().json(json!({ "error": "Failed to register user" }))
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users
            (full_name, email, password, department, employee_code, start_date, role_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(req.full_name.trim())
    .bind(email)
    .bind(hashed)
    .bind(req.department.trim())
    .bind(req.employee_code.trim())
    .bind(req.start_date)
    .bind(role.id())
    .execute(pool)
    .await;

    match result {
        Ok(_) => {
            registry.record(email).await;
            Ok(())
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some(DUPLICATE_KEY) {
                    return Err(HttpResponse::Conflict().json(json!({
                        "error": "Email or employee code already registered"
                    })));
                }
            }

            error!(error = %e, "Failed to insert user");
            Err(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register user"
            })))
        }
    }
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "message": "User registered successfully"
        })),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Elevated role requested without admin token"),
        (status = 409, description = "Email or employee code already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    req: HttpRequest,
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    registry: web::Data<EmailRegistry>,
) -> impl Responder {
    let email = EmailRegistry::normalize(&user.email);

    if user.full_name.trim().is_empty()
        || user.password.is_empty()
        || user.department.trim().is_empty()
        || user.employee_code.trim().is_empty()
    {
        return HttpResponse::BadRequest().json(json!({
            "error": "Full name, password, department and employee code are required"
        }));
    }

    if !looks_like_email(&email) {
        return HttpResponse::BadRequest().json(json!({ "error": "Invalid email address" }));
    }

    let role = match user.role_id.map(Role::from_id) {
        None => Role::Employee,
        Some(Some(role)) => role,
        Some(None) => {
            return HttpResponse::BadRequest().json(json!({ "error": "Unknown role" }));
        }
    };

    if role != Role::Employee {
        let is_admin = AuthUser::from_bearer(authorization(&req), &config.jwt_secret)
            .is_ok_and(|caller| caller.require_admin().is_ok());

        if !is_admin {
            return HttpResponse::Forbidden().json(json!({
                "error": "Only admins can register HR or admin accounts"
            }));
        }
    }

    if !registry.is_available(&email, pool.get_ref()).await {
        return HttpResponse::Conflict().json(json!({ "error": "Email already registered" }));
    }

    match insert_user(&user, &email, role, pool.get_ref(), &registry).await {
        Ok(_) => HttpResponse::Created().json(json!({
            "message": "User registered successfully"
        })),
        Err(err_resp) => err_resp,
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

fn issue_pair(
    user_id: u64,
    email: &str,
    role_id: u8,
    config: &Config,
) -> Result<(String, String, crate::models::Claims), jsonwebtoken::errors::Error> {
    let access_token = generate_access_token(
        user_id,
        email.to_string(),
        role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user_id,
        email.to_string(),
        role_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )?;

    Ok((access_token, refresh_token, refresh_claims))
}

async fn store_refresh_token(
    pool: &MySqlPool,
    user_id: u64,
    claims: &crate::models::Claims,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair issued", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    let email = EmailRegistry::normalize(&user.email);

    if email.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return HttpResponse::BadRequest().body("Email or password required");
    }

    debug!("Fetching user from database");

    let db_user = match sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, email, password, role_id, is_active
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => {
            debug!(user_id = user.id, "User found");
            user
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account disabled");
        return HttpResponse::Forbidden().body("Account disabled");
    }

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    debug!("Password verified, issuing tokens");

    let (access_token, refresh_token, refresh_claims) =
        match issue_pair(db_user.id, &db_user.email, db_user.role_id, &config) {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "Failed to sign tokens");
                return HttpResponse::InternalServerError().finish();
            }
        };

    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");

    if let Err(e) = store_refresh_token(pool.get_ref(), db_user.id, &refresh_claims).await {
        error!(error = %e, "Failed to store refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    // non-fatal
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// Revokes an unused refresh token. Of two concurrent rotations only one
/// sees the row change.
const REVOKE_UNUSED_REFRESH: &str =
    "UPDATE refresh_tokens SET revoked = 1 WHERE id = ? AND revoked = 0";

async fn claim_refresh_token(pool: &MySqlPool, id: u64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(REVOKE_UNUSED_REFRESH)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[derive(sqlx::FromRow)]
struct RefreshRecord {
    id: u64,
    user_id: u64,
    revoked: bool,
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Refresh token missing, invalid or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let token = match bearer(&req) {
        Some(t) => t,
        None => return Ok(HttpResponse::Unauthorized().body("No token")),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return Ok(HttpResponse::Unauthorized().finish()),
    };

    if claims.token_type != TokenType::Refresh {
        return Ok(HttpResponse::Unauthorized().finish());
    }

    let db_error = |e: sqlx::Error| {
        error!(error = %e, "Refresh token rotation failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    };

    let record = sqlx::query_as::<_, RefreshRecord>(
        "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(db_error)?;

    let record = match record {
        Some(r) if !r.revoked => r,
        _ => return Ok(HttpResponse::Unauthorized().finish()),
    };

    if !claim_refresh_token(pool.get_ref(), record.id)
        .await
        .map_err(db_error)?
    {
        debug!(user_id = record.user_id, "Refresh token already used");
        return Ok(HttpResponse::Unauthorized().finish());
    }

    let (access_token, new_refresh_token, new_claims) =
        issue_pair(record.user_id, &claims.sub, claims.role, &config).map_err(|e| {
            error!(error = %e, "Failed to sign tokens");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    store_refresh_token(pool.get_ref(), record.user_id, &new_claims)
        .await
        .map_err(db_error)?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token: new_refresh_token,
    }))
}

/// Revoke a refresh token (idempotent)
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match bearer(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}

/// Current user lookup
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "The authenticated user", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);

    let user = sqlx::query_as::<_, User>(&sql)
        .bind(auth.user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Failed to fetch current user");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match user {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "User not found" }))),
    }
}
