// routes/imagekit.rs - Upload authorisation for direct-to-CDN photo uploads

use crate::auth::AuthenticatedUser;
use crate::config::{Config, ImageKitSettings};
use crate::error::ApiError;
use actix_web::{get, web::Data, HttpResponse};
use media::{sign_upload, UploadAuthorization};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

// ImageKit refuses an expire more than an hour out
pub const UPLOAD_AUTH_TTL_SECONDS: i64 = 30 * 60;

#[derive(Debug, Serialize)]
struct UploadAuthResponse {
    success: bool,
    message: String,
    #[serde(flatten)]
    auth: UploadAuthorization,
}

pub fn upload_authorization(
    settings: &ImageKitSettings,
    token: String,
    now: i64,
) -> Result<UploadAuthorization, ApiError> {
    let (public_key, private_key) = match (&settings.public_key, &settings.private_key) {
        (Some(public_key), Some(private_key)) => (public_key, private_key),
        _ => {
            error!("ImageKit keys are not configured");
            return Err(ApiError::internal("ImageKit is not configured"));
        }
    };

    let expire = now + UPLOAD_AUTH_TTL_SECONDS;
    let signature = sign_upload(private_key, &token, expire).map_err(|e| {
        error!("Signing upload failed: {}", e);
        ApiError::internal("Failed to sign upload")
    })?;

    Ok(UploadAuthorization {
        token,
        expire,
        signature,
        public_key: public_key.clone(),
        url_endpoint: settings.url_endpoint.clone().unwrap_or_default(),
    })
}

#[tracing::instrument(name = "/imagekit/auth - Signs a direct upload", skip(config))]
#[get("/auth")]
pub async fn upload_auth(user: AuthenticatedUser, config: Data<Config>) -> Result<HttpResponse, ApiError> {
    let auth = upload_authorization(
        &config.imagekit,
        Uuid::new_v4().to_string(),
        chrono::Utc::now().timestamp(),
    )?;

    info!("Upload authorised for {} until {}", user.user_id, auth.expire);
    Ok(HttpResponse::Ok().json(UploadAuthResponse {
        success: true,
        message: "Upload authorised".to_string(),
        auth,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings() -> ImageKitSettings {
        ImageKitSettings {
            public_key: Some("public_abc".to_string()),
            private_key: Some("private_xyz".to_string()),
            url_endpoint: Some("https://ik.imagekit.io/demo".to_string()),
        }
    }

    #[test]
    fn test_authorization_expires_thirty_minutes_out() {
        let auth = upload_authorization(&settings(), "token-1".to_string(), 1_700_000_000).unwrap();

        assert_eq!(auth.expire, 1_700_001_800);
        assert_eq!(auth.public_key, "public_abc");
        assert_eq!(auth.url_endpoint, "https://ik.imagekit.io/demo");
        assert_eq!(
            auth.signature,
            sign_upload("private_xyz", "token-1", 1_700_001_800).unwrap()
        );
    }

    #[test]
    fn test_missing_private_key_is_an_internal_error() {
        let mut settings = settings();
        settings.private_key = None;

        assert!(matches!(
            upload_authorization(&settings, "token-1".to_string(), 0),
            Err(ApiError::Internal(_))
        ));
    }

    #[test]
    fn test_response_flattens_authorization() {
        let auth = upload_authorization(&settings(), "token-1".to_string(), 0).unwrap();
        let body = serde_json::to_value(UploadAuthResponse {
            success: true,
            message: "Upload authorised".to_string(),
            auth,
        })
        .unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["token"], "token-1");
        assert_eq!(body["expire"], 1800);
        assert!(body["signature"].as_str().unwrap().len() == 40);
    }
}
