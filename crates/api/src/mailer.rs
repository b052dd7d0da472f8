// mailer.rs - Delivers one-time codes by email
//
// With MAIL_API_URL set, messages are posted as JSON to a transactional mail API.
// Without it (local development) the message is written to the log instead.

use crate::error::ApiError;
use serde::Serialize;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Clone, Debug)]
pub enum Mailer {
    Log,
    Http {
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
        from: String,
    },
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl Mailer {
    pub fn from_settings(endpoint: Option<String>, api_key: Option<String>, from: String) -> Self {
        match (endpoint, api_key) {
            (Some(endpoint), Some(api_key)) => Mailer::Http {
                client: reqwest::Client::new(),
                endpoint,
                api_key,
                from,
            },
            _ => Mailer::Log,
        }
    }

    pub async fn send(&self, message: &MailMessage) -> Result<(), ApiError> {
        match self {
            Mailer::Log => {
                info!(
                    "Mail delivery not configured; to={} subject={:?} body={:?}",
                    message.to, message.subject, message.text
                );
                Ok(())
            }
            Mailer::Http {
                client,
                endpoint,
                api_key,
                from,
            } => {
                debug!("Sending {:?} to {}", message.subject, message.to);
                let body = OutgoingMail {
                    from,
                    to: &message.to,
                    subject: &message.subject,
                    text: &message.text,
                };

                let response = client
                    .post(endpoint)
                    .bearer_auth(api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| {
                        error!("Mail API request failed: {}", e);
                        ApiError::internal("Failed to send email")
                    })?;

                if !response.status().is_success() {
                    error!("Mail API answered {}", response.status());
                    return Err(ApiError::internal("Failed to send email"));
                }
                Ok(())
            }
        }
    }
}

pub fn verification_email(to: &str, name: &str, otp: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "Verify your email".to_string(),
        text: format!(
            "Hi {}, your verification code is {}. It expires in 15 minutes.",
            name, otp
        ),
    }
}

pub fn reset_password_email(to: &str, name: &str, otp: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        text: format!(
            "Hi {}, your password reset code is {}. It expires in 15 minutes. \
             If you did not ask to reset your password you can ignore this email.",
            name, otp
        ),
    }
}
