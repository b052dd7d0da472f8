// media/imagekit.rs - Signed direct uploads to the ImageKit CDN
//
// The backend holds the private key and hands out short-lived {token, expire, signature}
// triples; clients post the file straight to ImageKit with them.

use crate::error::MediaError;
use hmac::{Hmac, Mac};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use tracing::{debug, info};

type HmacSha1 = Hmac<Sha1>;

pub const UPLOAD_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";

/// Everything a client needs to authorise one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadAuthorization {
    pub token: String,
    pub expire: i64,
    pub signature: String,
    pub public_key: String,
    pub url_endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    #[serde(rename = "fileId")]
    pub file_id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "thumbnailUrl", default)]
    pub thumbnail_url: Option<String>,
}

/// hex(HMAC-SHA1(private_key, token + expire)), the signature ImageKit expects.
pub fn sign_upload(private_key: &str, token: &str, expire: i64) -> Result<String, MediaError> {
    hmac_sha1_hex(private_key, &format!("{}{}", token, expire))
}

fn hmac_sha1_hex(key: &str, message: &str) -> Result<String, MediaError> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| MediaError::Signing(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone)]
pub struct ImageKitClient {
    http: reqwest::Client,
    upload_url: String,
}

impl Default for ImageKitClient {
    fn default() -> Self {
        Self::new(UPLOAD_URL)
    }
}

impl ImageKitClient {
    pub fn new(upload_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            upload_url: upload_url.to_string(),
        }
    }

    pub fn upload_form(
        file_name: &str,
        bytes: Vec<u8>,
        folder: Option<&str>,
        auth: &UploadAuthorization,
    ) -> Result<Form, MediaError> {
        let file = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")?;

        let mut form = Form::new()
            .part("file", file)
            .text("fileName", file_name.to_string())
            .text("publicKey", auth.public_key.clone())
            .text("signature", auth.signature.clone())
            .text("expire", auth.expire.to_string())
            .text("token", auth.token.clone())
            .text("useUniqueFileName", "true");

        if let Some(folder) = folder {
            form = form.text("folder", folder.to_string());
        }

        Ok(form)
    }

    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        folder: Option<&str>,
        auth: &UploadAuthorization,
    ) -> Result<UploadedFile, MediaError> {
        debug!("Uploading {} ({} bytes) to {}", file_name, bytes.len(), self.upload_url);
        let form = Self::upload_form(file_name, bytes, folder, auth)?;

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Upload {
                status: status.as_u16(),
                body,
            });
        }

        let uploaded: UploadedFile = response.json().await?;
        info!("Uploaded {} as {}", file_name, uploaded.url);
        Ok(uploaded)
    }
}
