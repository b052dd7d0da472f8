// config.rs - Configuration types shared with every route through app data

use crate::mailer::Mailer;
use mongodb::Client;
use std::fmt;

#[derive(Clone, Debug)]
pub struct Config {
    pub client: Client,
    pub database: String,
    pub auth: AuthSettings,
    pub imagekit: ImageKitSettings,
    pub mailer: Mailer,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub access_token_ttl: i64,
    pub refresh_token_ttl: i64,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

#[derive(Clone)]
pub struct ImageKitSettings {
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub url_endpoint: Option<String>,
}

impl fmt::Debug for ImageKitSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageKitSettings")
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("url_endpoint", &self.url_endpoint)
            .finish()
    }
}
