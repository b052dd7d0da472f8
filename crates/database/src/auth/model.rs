// database/auth/model.rs - Model for a refresh token that has already been exchanged

use crate::error::DatabaseResult;
use mongodb::{
    bson::{doc, DateTime},
    options::IndexOptions,
    Client, IndexModel,
};
use serde::{Deserialize, Serialize};

pub const INVALID_REFRESH_TOKENS_COLLECTION: &str = "invalid-refresh-tokens";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenModel {
    pub token: String,
    pub created_at: DateTime,
}

// A token can only be marked used once, so concurrent refreshes race on this index
pub async fn create_refresh_token_index(client: &Client, database: &str) -> DatabaseResult<()> {
    let options = IndexOptions::builder().unique(true).build();

    let model = IndexModel::builder()
        .keys(doc! { "token": 1 })
        .options(options)
        .build();

    client
        .database(database)
        .collection::<RefreshTokenModel>(INVALID_REFRESH_TOKENS_COLLECTION)
        .create_index(model, None)
        .await?;

    Ok(())
}
