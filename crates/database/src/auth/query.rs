// database/auth/query.rs - Queries for the invalid refresh token collection

use super::model::{RefreshTokenModel, INVALID_REFRESH_TOKENS_COLLECTION};
use crate::error::{DatabaseError, DatabaseResult};
use mongodb::bson::{doc, DateTime};
use mongodb::{Client, Collection};

fn collection(client: &Client, database: &str) -> Collection<RefreshTokenModel> {
    client
        .database(database)
        .collection(INVALID_REFRESH_TOKENS_COLLECTION)
}

// Marks a refresh token as used. A token that was already marked surfaces as DatabaseError::Duplicate.
pub async fn insert_refresh_token(
    client: &Client,
    database: &str,
    token: &str,
) -> DatabaseResult<()> {
    let token_model = RefreshTokenModel {
        token: token.to_string(),
        created_at: DateTime::now(),
    };

    collection(client, database)
        .insert_one(token_model, None)
        .await
        .map_err(|e| DatabaseError::from_write(e, "refresh token"))?;

    Ok(())
}

pub async fn is_refresh_token_used(
    client: &Client,
    database: &str,
    refresh_token: &str,
) -> DatabaseResult<bool> {
    let result = collection(client, database)
        .find_one(doc! { "token": refresh_token }, None)
        .await?;

    Ok(result.is_some())
}
