// database/error.rs - Error type shared by every query function

use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Failed to serialize document: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),

    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Unexpected inserted id type")]
    UnexpectedId,
}

impl DatabaseError {
    // Turns unique-index violations into Duplicate so callers can answer with a 4xx
    pub fn from_write(err: mongodb::error::Error, what: &str) -> Self {
        if is_duplicate_key(&err) {
            DatabaseError::Duplicate(what.to_string())
        } else {
            DatabaseError::Mongo(err)
        }
    }
}

pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE
    )
}
