// database/lib.rs - MongoDB models and query abstractions for the build tracker

use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use std::time::Duration;
use tracing::info;

pub mod auth;
pub mod builds;
pub mod error;
pub mod steps;
pub mod users;

pub use error::{DatabaseError, DatabaseResult};

pub async fn set_ttl_index<T>(
    collection: Collection<T>,
    duration_in_secs: u64,
) -> DatabaseResult<()> {
    // Documents are removed by the server once created_at is older than the duration
    let options = IndexOptions::builder()
        .expire_after(Duration::from_secs(duration_in_secs))
        .build();

    let model = IndexModel::builder()
        .keys(doc! {"created_at": 1})
        .options(options)
        .build();

    collection.create_index(model, None).await?;
    Ok(())
}

// Creates every index the collections rely on. Safe to call repeatedly.
pub async fn create_indexes(client: &Client, database: &str) -> DatabaseResult<()> {
    info!("Creating index on invalid-refresh-tokens.token");
    auth::model::create_refresh_token_index(client, database).await?;

    info!("Creating index on users.email");
    users::model::create_user_index(client, database).await?;

    info!("Creating index on build_projects.owner");
    builds::model::create_project_indexes(client, database).await?;

    info!("Creating indexes on build_steps");
    steps::model::create_step_indexes(client, database).await?;

    Ok(())
}
