// auth.rs - Data structures and utility functions used to authenticate users to the API

use crate::config::AuthSettings;
use crate::error::ApiError;
use actix_web::{
    dev::Payload,
    http::header::{HeaderMap, AUTHORIZATION},
    web::Data,
    Error, FromRequest, HttpRequest,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

// Claims to be added to JWT
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
    pub sub: String, // User id as hex
    pub kind: TokenKind,
    pub jti: String, // Unique per token, so refresh tokens minted in the same second differ
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: ObjectId,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<AuthenticatedUser, Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        debug!("Checking authorization...");
        let res = authorize(req);

        Box::pin(async move {
            match res {
                Ok(user) => {
                    debug!("Authorized user {}", user.user_id);
                    Ok(user)
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}

// Validates the bearer access token on a request and resolves the user it was issued to
pub fn authorize(req: &HttpRequest) -> Result<AuthenticatedUser, ApiError> {
    let settings = match req.app_data::<Data<AuthSettings>>() {
        Some(settings) => settings,
        None => {
            error!("AuthSettings missing from app data");
            return Err(ApiError::internal("Auth settings not configured"));
        }
    };

    let jwt = jwt_from_header(req.headers())?;
    let claims = decode_jwt(&settings.jwt_secret, &jwt, TokenKind::Access)?;

    match ObjectId::parse_str(&claims.sub) {
        Ok(user_id) => Ok(AuthenticatedUser { user_id }),
        Err(_) => {
            warn!("Token subject is not a user id: {}", claims.sub);
            Err(ApiError::unauthorized("Invalid Authorization"))
        }
    }
}

// Creates a JWT for the subject provided
pub fn create_jwt(
    secret: &str,
    subject: &str,
    validity_in_seconds: i64,
    kind: TokenKind,
) -> Result<String, ApiError> {
    debug!("Setting expiration for JWT.");
    let now = chrono::Utc::now();
    let expiration = match now.checked_add_signed(chrono::Duration::seconds(validity_in_seconds)) {
        Some(expiration) => expiration,
        None => {
            error!("Error setting expiration for JWT.");
            return Err(ApiError::internal("Failed to set expiration for JWT"));
        }
    };

    let claims = Claims {
        sub: subject.to_owned(),
        exp: expiration.timestamp().max(0) as usize,
        iat: now.timestamp().max(0) as usize,
        kind,
        jti: Uuid::new_v4().to_string(),
    };

    debug!("Encoding JWT.");
    let header = Header::new(Algorithm::HS512);
    encode(&header, &claims, &EncodingKey::from_secret(secret.as_ref())).map_err(|e| {
        error!("Error encoding JWT: {}", e);
        ApiError::internal("Failed to encode JWT")
    })
}

// Decodes a JWT, rejecting bad signatures, expired tokens and tokens of another kind
pub fn decode_jwt(secret: &str, token: &str, kind: TokenKind) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS512);
    validation.set_required_spec_claims(&["sub", "exp"]);
    validation.leeway = 0;

    let claims = match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)
    {
        Ok(data) => data.claims,
        Err(e) => {
            warn!("JWT validation failed: {}", e);
            return Err(ApiError::unauthorized("Invalid or expired token"));
        }
    };

    if claims.kind != kind {
        warn!("Expected a {:?} token, got {:?}", kind, claims.kind);
        return Err(ApiError::unauthorized("Invalid token type"));
    }

    Ok(claims)
}

pub fn issue_token_pair(settings: &AuthSettings, user_id: &ObjectId) -> Result<TokenPair, ApiError> {
    let subject = user_id.to_hex();

    Ok(TokenPair {
        access_token: create_jwt(
            &settings.jwt_secret,
            &subject,
            settings.access_token_ttl,
            TokenKind::Access,
        )?,
        refresh_token: create_jwt(
            &settings.jwt_secret,
            &subject,
            settings.refresh_token_ttl,
            TokenKind::Refresh,
        )?,
    })
}

// Gets a JWT from the request headers
pub fn jwt_from_header(headers: &HeaderMap) -> Result<String, ApiError> {
    debug!("Extracting authorization header...");
    let header = match headers.get(AUTHORIZATION) {
        Some(v) => v,
        None => return Err(ApiError::unauthorized("Auth header not found")),
    };

    let auth_header = match header.to_str() {
        Ok(v) => v,
        Err(_) => return Err(ApiError::unauthorized("Auth header not found")),
    };

    debug!("Checking header format...");
    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_owned()),
        _ => Err(ApiError::unauthorized("Invalid Auth Header")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::header::HeaderValue, test::TestRequest};
    use pretty_assertions::assert_eq;

    const SECRET: &str = "test-secret-with-enough-entropy";

    fn settings() -> AuthSettings {
        AuthSettings {
            jwt_secret: SECRET.to_string(),
            access_token_ttl: 3600,
            refresh_token_ttl: 86400,
        }
    }

    #[test]
    fn test_jwt_round_trip() {
        let token = create_jwt(SECRET, "abc", 60, TokenKind::Access).unwrap();
        let claims = decode_jwt(SECRET, &token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, "abc");
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_jwt_is_rejected() {
        let token = create_jwt(SECRET, "abc", -10, TokenKind::Access).unwrap();
        assert!(matches!(
            decode_jwt(SECRET, &token, TokenKind::Access),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_jwt(SECRET, "abc", 60, TokenKind::Access).unwrap();
        assert!(decode_jwt("another-secret", &token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_refresh_token_cannot_be_used_as_access_token() {
        let token = create_jwt(SECRET, "abc", 60, TokenKind::Refresh).unwrap();
        assert!(decode_jwt(SECRET, &token, TokenKind::Access).is_err());
        assert!(decode_jwt(SECRET, &token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_token_pair_tokens_are_distinct() {
        let pair = issue_token_pair(&settings(), &ObjectId::new()).unwrap();
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn test_jwt_from_header() {
        let mut headers = HeaderMap::new();
        assert!(jwt_from_header(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(jwt_from_header(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(jwt_from_header(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(jwt_from_header(&headers).unwrap(), "abc.def.ghi");
    }

    #[actix_web::test]
    async fn test_extractor_accepts_valid_access_token() {
        let user_id = ObjectId::new();
        let pair = issue_token_pair(&settings(), &user_id).unwrap();

        let (req, mut payload) = TestRequest::default()
            .app_data(Data::new(settings()))
            .insert_header((AUTHORIZATION, format!("Bearer {}", pair.access_token)))
            .to_http_parts();

        let user = AuthenticatedUser::from_request(&req, &mut payload)
            .await
            .unwrap();
        assert_eq!(user.user_id, user_id);
    }

    #[actix_web::test]
    async fn test_extractor_rejects_missing_header_with_401() {
        let (req, mut payload) = TestRequest::default()
            .app_data(Data::new(settings()))
            .to_http_parts();

        let err = AuthenticatedUser::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn test_extractor_rejects_refresh_token() {
        let pair = issue_token_pair(&settings(), &ObjectId::new()).unwrap();

        let (req, mut payload) = TestRequest::default()
            .app_data(Data::new(settings()))
            .insert_header((AUTHORIZATION, format!("Bearer {}", pair.refresh_token)))
            .to_http_parts();

        assert!(AuthenticatedUser::from_request(&req, &mut payload)
            .await
            .is_err());
    }
}
