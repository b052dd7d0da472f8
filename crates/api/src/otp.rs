// otp.rs - One-time codes for email verification and password reset
//
// Codes are 6 digits and live for 15 minutes. Single use is enforced by the
// database update that consumes them, not here.

use crate::error::ApiError;
use mongodb::bson::DateTime;
use rand::Rng;
use uuid::Uuid;

pub const OTP_TTL_MINUTES: i64 = 15;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpFailure {
    Missing,
    Mismatch,
    Expired,
}

impl From<OtpFailure> for ApiError {
    fn from(failure: OtpFailure) -> Self {
        match failure {
            OtpFailure::Missing | OtpFailure::Mismatch => ApiError::bad_request("Invalid OTP"),
            OtpFailure::Expired => ApiError::bad_request("OTP has expired"),
        }
    }
}

pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", code)
}

pub fn generate_reset_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn expires_after(now: DateTime, minutes: i64) -> DateTime {
    DateTime::from_millis(now.timestamp_millis() + minutes * 60 * 1000)
}

pub fn otp_expiry(now: DateTime) -> DateTime {
    expires_after(now, OTP_TTL_MINUTES)
}

pub fn is_expired(expires_at: DateTime, now: DateTime) -> bool {
    now.timestamp_millis() > expires_at.timestamp_millis()
}

// Compares a submitted code against the stored one. A mismatch is reported before expiry.
pub fn check_code(
    stored: Option<&str>,
    expires_at: Option<DateTime>,
    submitted: &str,
    now: DateTime,
) -> Result<(), OtpFailure> {
    let stored = stored.ok_or(OtpFailure::Missing)?;
    if stored != submitted.trim() {
        return Err(OtpFailure::Mismatch);
    }

    match expires_at {
        Some(expires_at) if !is_expired(expires_at, now) => Ok(()),
        _ => Err(OtpFailure::Expired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINUTE: i64 = 60 * 1000;

    #[test]
    fn test_otp_is_six_digits() {
        for _ in 0..200 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_reset_tokens_are_unique() {
        let first = generate_reset_token();
        assert_eq!(first.len(), 32);
        assert_ne!(first, generate_reset_token());
    }

    #[test]
    fn test_expiry_is_fifteen_minutes_out() {
        let now = DateTime::from_millis(1_700_000_000_000);
        assert_eq!(
            otp_expiry(now).timestamp_millis() - now.timestamp_millis(),
            15 * MINUTE
        );
    }

    #[test]
    fn test_matching_code_within_window_is_accepted() {
        let issued = DateTime::from_millis(1_700_000_000_000);
        let expires = otp_expiry(issued);
        let later = DateTime::from_millis(issued.timestamp_millis() + 14 * MINUTE);

        assert_eq!(check_code(Some("042137"), Some(expires), " 042137 ", later), Ok(()));
    }

    #[test]
    fn test_code_older_than_fifteen_minutes_is_rejected() {
        let issued = DateTime::from_millis(1_700_000_000_000);
        let expires = otp_expiry(issued);
        let later = DateTime::from_millis(issued.timestamp_millis() + 15 * MINUTE + 1);

        assert_eq!(
            check_code(Some("042137"), Some(expires), "042137", later),
            Err(OtpFailure::Expired)
        );
    }

    #[test]
    fn test_code_at_exact_expiry_is_still_valid() {
        let issued = DateTime::from_millis(1_700_000_000_000);
        let expires = otp_expiry(issued);

        assert_eq!(check_code(Some("111111"), Some(expires), "111111", expires), Ok(()));
    }

    #[test]
    fn test_wrong_or_missing_code() {
        let now = DateTime::from_millis(1_700_000_000_000);
        let expires = otp_expiry(now);

        assert_eq!(
            check_code(Some("123456"), Some(expires), "654321", now),
            Err(OtpFailure::Mismatch)
        );
        assert_eq!(
            check_code(None, None, "123456", now),
            Err(OtpFailure::Missing)
        );
    }

    #[test]
    fn test_code_without_expiry_counts_as_expired() {
        let now = DateTime::from_millis(1_700_000_000_000);
        assert_eq!(
            check_code(Some("123456"), None, "123456", now),
            Err(OtpFailure::Expired)
        );
    }

    #[test]
    fn test_failures_map_to_bad_request_messages() {
        assert_eq!(ApiError::from(OtpFailure::Mismatch).to_string(), "Invalid OTP");
        assert_eq!(ApiError::from(OtpFailure::Expired).to_string(), "OTP has expired");
    }
}
