// media/error.rs - Errors raised while compressing or uploading photos

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Invalid compression options: {0}")]
    InvalidOptions(String),

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Compression worker failed: {0}")]
    Worker(String),

    #[error("Failed to sign upload: {0}")]
    Signing(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upload rejected with status {status}: {body}")]
    Upload { status: u16, body: String },
}
