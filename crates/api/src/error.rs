// error.rs - API error type, rendered as {success: false, message} with a matching status

use crate::utils::MessageResponse;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use database::DatabaseError;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: &str) -> Self {
        ApiError::BadRequest(message.to_string())
    }

    pub fn unauthorized(message: &str) -> Self {
        ApiError::Unauthorized(message.to_string())
    }

    pub fn not_found(message: &str) -> Self {
        ApiError::NotFound(message.to_string())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    // What the client sees. Server-side details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::NotFound(message) => message.clone(),
            ApiError::Database(_) | ApiError::Internal(_) => "Internal Server Error".to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }

        HttpResponse::build(status).json(MessageResponse::failure(self.public_message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use pretty_assertions::assert_eq;

    async fn body_of(error: ApiError) -> (StatusCode, MessageResponse) {
        let response = error.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_client_errors_keep_their_message() {
        let (status, body) = body_of(ApiError::bad_request("User already exists")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(body.message, "User already exists");
    }

    #[actix_web::test]
    async fn test_internal_errors_are_generic() {
        let (status, body) = body_of(ApiError::internal("mail relay timed out")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Internal Server Error");
    }

    #[actix_web::test]
    async fn test_uncaught_database_errors_are_generic() {
        // Routes that can hit a unique index translate Duplicate themselves
        let (status, body) = body_of(ApiError::from(DatabaseError::Duplicate("email".into()))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Internal Server Error");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::unauthorized("Invalid Authorization").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::not_found("Build not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Database(DatabaseError::UnexpectedId).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
