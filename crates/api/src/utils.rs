// utils.rs - utility functions used across modules

use crate::error::ApiError;
use chrono::{DateTime as ChronoDateTime, NaiveDate, TimeZone, Utc};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// Shape check only: one '@', a non-empty local part and a dotted domain, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn parse_object_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| {
        debug!("Rejected malformed id: {}", id);
        ApiError::bad_request("Invalid id")
    })
}

// Accepts RFC 3339 timestamps or plain YYYY-MM-DD dates (midnight UTC)
pub fn parse_date(field: &str, value: &str) -> Result<DateTime, ApiError> {
    let value = value.trim();

    if let Ok(timestamp) = ChronoDateTime::parse_from_rfc3339(value) {
        return Ok(DateTime::from_millis(timestamp.timestamp_millis()));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| DateTime::from_millis(Utc.from_utc_datetime(&midnight).timestamp_millis()))
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid date for {}", field)))
}

pub fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<DateTime>, ApiError> {
    value.map(|value| parse_date(field, value)).transpose()
}

pub fn format_date(date: DateTime) -> String {
    date.try_to_rfc3339_string().unwrap_or_default()
}
