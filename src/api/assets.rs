use std::collections::BTreeMap;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::utils::asset_url::{AssetError, UploadSigner};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UploadFolder {
    Attendance,
    Profiles,
    Attachments,
}

impl UploadFolder {
    fn as_str(&self) -> &'static str {
        match self {
            UploadFolder::Attendance => "attendance",
            UploadFolder::Profiles => "profiles",
            UploadFolder::Attachments => "attachments",
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SignatureRequest {
    #[schema(example = "attendance")]
    pub folder: UploadFolder,
}

#[derive(Serialize, ToSchema)]
pub struct SignatureResponse {
    #[schema(example = "https://api.cloudinary.com/v1_1/demo/auto/upload")]
    pub upload_url: String,
    /// Form fields to post alongside the file
    pub params: BTreeMap<String, String>,
}

/// Signed form for one upload; the public id is namespaced by user and time.
pub fn signed_upload(
    signer: &UploadSigner,
    user_id: u64,
    folder: UploadFolder,
    timestamp: i64,
) -> SignatureResponse {
    let mut params = BTreeMap::new();
    params.insert("folder".to_string(), folder.as_str().to_string());
    params.insert("public_id".to_string(), format!("{}-{}", user_id, timestamp));

    SignatureResponse {
        upload_url: signer.upload_url(),
        params: signer.sign(params, timestamp),
    }
}

/// Signed upload parameters for the asset host
#[utoipa::path(
    post,
    path = "/api/assets/signature",
    request_body = SignatureRequest,
    responses(
        (status = 200, description = "Signed upload form", body = SignatureResponse),
        (status = 400, description = "Unknown folder"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Asset host not configured", body = Object, example = json!({
            "message": "asset host is not configured"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Assets"
)]
pub async fn upload_signature(
    auth: AuthUser,
    config: web::Data<Config>,
    payload: web::Json<SignatureRequest>,
) -> actix_web::Result<impl Responder> {
    let signer = match &config.upload_signer {
        Some(s) => s,
        None => {
            return Ok(HttpResponse::ServiceUnavailable().json(json!({
                "message": AssetError::NotConfigured.to_string()
            })));
        }
    };

    debug!(user_id = auth.user_id, folder = payload.folder.as_str(), "Signing upload");

    Ok(HttpResponse::Ok().json(signed_upload(
        signer,
        auth.user_id,
        payload.folder,
        Utc::now().timestamp(),
    )))
}
