// media/lib.rs - Photo pipeline: compression towards a byte ceiling and direct upload to ImageKit

pub mod batch;
pub mod compress;
pub mod error;
pub mod imagekit;

pub use batch::{compress_batch, BATCH_WORKERS};
pub use compress::{compress_image, CompressedImage, CompressionOptions};
pub use error::MediaError;
pub use imagekit::{sign_upload, ImageKitClient, UploadAuthorization, UploadedFile};
