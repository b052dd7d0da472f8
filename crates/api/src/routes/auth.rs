// routes/auth.rs - Registration, sign in, token refresh and the OTP flows

use crate::auth::{decode_jwt, issue_token_pair, AuthenticatedUser, TokenKind};
use crate::config::Config;
use crate::error::ApiError;
use crate::mailer::{reset_password_email, verification_email};
use crate::models::{
    AuthResponse, EmailRequest, LoginRequest, OtpRequest, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, ResetTokenResponse, TokenResponse, UserEnvelope, UserResponse,
};
use crate::otp::{
    check_code, expires_after, generate_otp, generate_reset_token, is_expired, otp_expiry,
    RESET_TOKEN_TTL_MINUTES,
};
use crate::password::{hash_password, validate_password, verify_password};
use crate::utils::{normalize_email, MessageResponse};
use actix_web::{
    get, post,
    web::{Data, Json},
    HttpResponse,
};
use database::{
    auth::query::{insert_refresh_token, is_refresh_token_used},
    users::{
        model::UserModel,
        query::{
            consume_reset_otp, consume_reset_token, consume_verification_otp, find_user_by_email,
            find_user_by_id, insert_user, set_reset_otp, set_verification_otp,
        },
    },
    DatabaseError,
};
use mongodb::bson::{oid::ObjectId, DateTime};
use tracing::{debug, error, info, warn};

// Losing the insert race on the unique token index means another request already exchanged it
fn refresh_token_mark_error(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::Duplicate(_) => {
            warn!("Refresh token was exchanged by a concurrent request");
            ApiError::bad_request("Expired Refresh Token")
        }
        other => ApiError::from(other),
    }
}

async fn user_by_email(config: &Config, email: &str) -> Result<UserModel, ApiError> {
    match find_user_by_email(&config.client, &config.database, &normalize_email(email)).await? {
        Some(user) => Ok(user),
        None => {
            debug!("No user with email {}", email);
            Err(ApiError::not_found("User not found"))
        }
    }
}

#[tracing::instrument(
    name = "/register - Creates an account and mails a verification code",
    skip(config, req_data)
)]
#[post("/register")]
pub async fn register(
    req_data: Json<RegisterRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let request = req_data.into_inner();
    request.validate()?;

    let email = normalize_email(&request.email);
    info!("Received registration for {}", email);

    if find_user_by_email(&config.client, &config.database, &email)
        .await?
        .is_some()
    {
        warn!("Email already registered: {}", email);
        return Err(ApiError::bad_request("User already exists"));
    }

    debug!("Hashing password");
    let password_hash = hash_password(&request.password)?;
    let now = DateTime::now();
    let otp = generate_otp();

    let mut user = UserModel::new(request.name.trim(), &email, password_hash, now);
    user.verification_otp = Some(otp.clone());
    user.verification_otp_expires_at = Some(otp_expiry(now));

    // Two registrations racing past the lookup meet the unique index here
    let user_id = match insert_user(&config.client, &config.database, &user).await {
        Ok(id) => id,
        Err(DatabaseError::Duplicate(_)) => {
            return Err(ApiError::bad_request("User already exists"));
        }
        Err(e) => return Err(e.into()),
    };
    user.id = Some(user_id);
    debug!("Inserted user {}", user_id);

    if let Err(e) = config
        .mailer
        .send(&verification_email(&email, &user.name, &otp))
        .await
    {
        warn!("Verification email for {} not delivered: {}", email, e);
    }

    let tokens = issue_token_pair(&config.auth, &user_id)?;

    info!("User registered: {}", user_id);
    Ok(HttpResponse::Created().json(AuthResponse {
        success: true,
        message: "User registered successfully".to_string(),
        tokens,
        user: UserResponse::from(&user),
    }))
}

#[tracing::instrument(name = "/login - Signs the user in, returning a JWT pair", skip(config, req_data))]
#[post("/login")]
pub async fn login(
    req_data: Json<LoginRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let email = normalize_email(&req_data.email);
    debug!("Received sign in request for {}", email);

    let user = match find_user_by_email(&config.client, &config.database, &email).await? {
        Some(user) => user,
        None => {
            warn!("Sign in for unknown email {}", email);
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
    };

    if !verify_password(&req_data.password, &user.password_hash)? {
        warn!("Wrong password for {}", email);
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let user_id = user.id.ok_or(DatabaseError::UnexpectedId)?;
    let tokens = issue_token_pair(&config.auth, &user_id)?;

    info!("User signed in: {}", user_id);
    Ok(HttpResponse::Ok().json(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        tokens,
        user: UserResponse::from(&user),
    }))
}

#[tracing::instrument(
    name = "/refresh - Checks a provided refresh token, returns a new access token and refresh token.",
    skip(config, req_data)
)]
#[post("/refresh")]
pub async fn refresh(
    req_data: Json<RefreshRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let token = req_data.refresh_token.trim();

    debug!("Received refresh request. Checking if refresh token has been used before...");
    if is_refresh_token_used(&config.client, &config.database, token).await? {
        warn!("Refresh token has previously been used");
        return Err(ApiError::bad_request("Expired Refresh Token"));
    }

    debug!("Decoding refresh token...");
    let claims = decode_jwt(&config.auth.jwt_secret, token, TokenKind::Refresh)?;
    let user_id = match ObjectId::parse_str(&claims.sub) {
        Ok(user_id) => user_id,
        Err(_) => {
            warn!("Refresh token subject is not a user id: {}", claims.sub);
            return Err(ApiError::unauthorized("Invalid Refresh Token"));
        }
    };

    debug!("Marking refresh token as used");
    insert_refresh_token(&config.client, &config.database, token)
        .await
        .map_err(refresh_token_mark_error)?;

    let tokens = issue_token_pair(&config.auth, &user_id)?;

    info!("Refresh succeeded for {}", user_id);
    Ok(HttpResponse::Ok().json(TokenResponse {
        success: true,
        message: "Token refreshed".to_string(),
        tokens,
    }))
}

#[tracing::instrument(name = "/me - Returns the signed in user", skip(config))]
#[get("/me")]
pub async fn me(user: AuthenticatedUser, config: Data<Config>) -> Result<HttpResponse, ApiError> {
    let found = match find_user_by_id(&config.client, &config.database, &user.user_id).await? {
        Some(found) => found,
        None => {
            warn!("Token belongs to a user that no longer exists: {}", user.user_id);
            return Err(ApiError::not_found("User not found"));
        }
    };

    Ok(HttpResponse::Ok().json(UserEnvelope {
        success: true,
        message: "User found".to_string(),
        user: UserResponse::from(&found),
    }))
}

#[tracing::instrument(name = "/verify-email - Confirms an email with its code", skip(config, req_data))]
#[post("/verify-email")]
pub async fn verify_email(
    req_data: Json<OtpRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let user = user_by_email(&config, &req_data.email).await?;
    if user.is_verified {
        return Err(ApiError::bad_request("Email already verified"));
    }

    check_code(
        user.verification_otp.as_deref(),
        user.verification_otp_expires_at,
        &req_data.otp,
        DateTime::now(),
    )?;

    let user_id = user.id.ok_or(DatabaseError::UnexpectedId)?;
    let consumed = consume_verification_otp(
        &config.client,
        &config.database,
        &user_id,
        req_data.otp.trim(),
    )
    .await?;
    if !consumed {
        warn!("Verification code for {} was used concurrently", user_id);
        return Err(ApiError::bad_request("Invalid OTP"));
    }

    info!("Email verified for {}", user_id);
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Email verified successfully")))
}

#[tracing::instrument(
    name = "/resend-verification-email - Mails a fresh verification code",
    skip(config, req_data)
)]
#[post("/resend-verification-email")]
pub async fn resend_verification_email(
    req_data: Json<EmailRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let user = user_by_email(&config, &req_data.email).await?;
    if user.is_verified {
        return Err(ApiError::bad_request("Email already verified"));
    }

    let user_id = user.id.ok_or(DatabaseError::UnexpectedId)?;
    let otp = generate_otp();
    set_verification_otp(
        &config.client,
        &config.database,
        &user_id,
        &otp,
        otp_expiry(DateTime::now()),
    )
    .await?;

    config
        .mailer
        .send(&verification_email(&user.email, &user.name, &otp))
        .await?;

    info!("Verification code re-sent to {}", user_id);
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Verification email sent")))
}

#[tracing::instrument(
    name = "/send-reset-password-email - Mails a password reset code",
    skip(config, req_data)
)]
#[post("/send-reset-password-email")]
pub async fn send_reset_password_email(
    req_data: Json<EmailRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let user = user_by_email(&config, &req_data.email).await?;
    let user_id = user.id.ok_or(DatabaseError::UnexpectedId)?;

    let otp = generate_otp();
    debug!("Storing reset code for {}", user_id);
    set_reset_otp(
        &config.client,
        &config.database,
        &user_id,
        &otp,
        otp_expiry(DateTime::now()),
    )
    .await?;

    if let Err(e) = config
        .mailer
        .send(&reset_password_email(&user.email, &user.name, &otp))
        .await
    {
        error!("Reset email for {} not delivered", user_id);
        return Err(e);
    }

    info!("Reset code sent to {}", user_id);
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Password reset email sent")))
}

#[tracing::instrument(
    name = "/verify-reset-password-otp - Exchanges a reset code for a reset token",
    skip(config, req_data)
)]
#[post("/verify-reset-password-otp")]
pub async fn verify_reset_password_otp(
    req_data: Json<OtpRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let user = user_by_email(&config, &req_data.email).await?;
    let now = DateTime::now();

    check_code(
        user.reset_otp.as_deref(),
        user.reset_otp_expires_at,
        &req_data.otp,
        now,
    )?;

    let user_id = user.id.ok_or(DatabaseError::UnexpectedId)?;
    let reset_token = generate_reset_token();
    let consumed = consume_reset_otp(
        &config.client,
        &config.database,
        &user_id,
        req_data.otp.trim(),
        &reset_token,
        expires_after(now, RESET_TOKEN_TTL_MINUTES),
    )
    .await?;
    if !consumed {
        warn!("Reset code for {} was used concurrently", user_id);
        return Err(ApiError::bad_request("Invalid OTP"));
    }

    info!("Reset code verified for {}", user_id);
    Ok(HttpResponse::Ok().json(ResetTokenResponse {
        success: true,
        message: "OTP verified".to_string(),
        reset_token,
    }))
}

#[tracing::instrument(
    name = "/reset-password - Sets a new password using a reset token",
    skip(config, req_data)
)]
#[post("/reset-password")]
pub async fn reset_password(
    req_data: Json<ResetPasswordRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let request = req_data.into_inner();
    let user = user_by_email(&config, &request.email).await?;
    let submitted = request.reset_token.trim();

    match user.reset_token.as_deref() {
        Some(stored) if stored == submitted => {}
        _ => {
            warn!("Reset token mismatch for {}", request.email);
            return Err(ApiError::bad_request("Invalid reset token"));
        }
    }
    match user.reset_token_expires_at {
        Some(expires_at) if !is_expired(expires_at, DateTime::now()) => {}
        _ => return Err(ApiError::bad_request("Reset token has expired")),
    }

    validate_password(&request.new_password)?;
    let password_hash = hash_password(&request.new_password)?;

    let user_id = user.id.ok_or(DatabaseError::UnexpectedId)?;
    let consumed = consume_reset_token(
        &config.client,
        &config.database,
        &user_id,
        submitted,
        &password_hash,
    )
    .await?;
    if !consumed {
        warn!("Reset token for {} was used concurrently", user_id);
        return Err(ApiError::bad_request("Invalid reset token"));
    }

    info!("Password reset for {}", user_id);
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Password reset successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, ResponseError};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_already_marked_refresh_token_is_a_bad_request() {
        let err = refresh_token_mark_error(DatabaseError::Duplicate("refresh token".to_string()));

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(matches!(err, ApiError::BadRequest(message) if message == "Expired Refresh Token"));
    }

    #[test]
    fn test_other_failures_marking_a_refresh_token_stay_internal() {
        let err = refresh_token_mark_error(DatabaseError::UnexpectedId);

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, ApiError::Database(DatabaseError::UnexpectedId)));
    }
}
