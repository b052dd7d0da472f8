// database/steps/query.rs - query functions for the build_steps collection

use super::model::{BuildStepModel, StepUpdate, STEPS_COLLECTION};
use crate::error::{DatabaseError, DatabaseResult};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_document, DateTime},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Collection,
};

fn collection(client: &Client, database: &str) -> Collection<BuildStepModel> {
    client.database(database).collection(STEPS_COLLECTION)
}

pub async fn insert_step(
    client: &Client,
    database: &str,
    step: &BuildStepModel,
) -> DatabaseResult<ObjectId> {
    let result = collection(client, database).insert_one(step, None).await?;

    result
        .inserted_id
        .as_object_id()
        .ok_or(DatabaseError::UnexpectedId)
}

// Steps of one project in build order: by start date, then by creation
pub async fn list_steps_for_project(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
) -> DatabaseResult<Vec<BuildStepModel>> {
    let options = FindOptions::builder()
        .sort(doc! { "start_date": 1, "created_at": 1 })
        .build();

    let cursor = collection(client, database)
        .find(doc! { "project_id": *project_id, "owner": *owner }, options)
        .await?;

    Ok(cursor.try_collect().await?)
}

pub async fn list_steps_for_owner(
    client: &Client,
    database: &str,
    owner: &ObjectId,
) -> DatabaseResult<Vec<BuildStepModel>> {
    let cursor = collection(client, database)
        .find(doc! { "owner": *owner }, None)
        .await?;

    Ok(cursor.try_collect().await?)
}

pub async fn get_step(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
    step_id: &ObjectId,
) -> DatabaseResult<Option<BuildStepModel>> {
    Ok(collection(client, database)
        .find_one(
            doc! { "_id": *step_id, "project_id": *project_id, "owner": *owner },
            None,
        )
        .await?)
}

pub async fn update_step(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
    step_id: &ObjectId,
    update: &StepUpdate,
) -> DatabaseResult<Option<BuildStepModel>> {
    let mut set = to_document(update)?;
    set.insert("updated_at", DateTime::now());

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    Ok(collection(client, database)
        .find_one_and_update(
            doc! { "_id": *step_id, "project_id": *project_id, "owner": *owner },
            doc! { "$set": set },
            options,
        )
        .await?)
}

pub async fn delete_step(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
    step_id: &ObjectId,
) -> DatabaseResult<bool> {
    let result = collection(client, database)
        .delete_one(
            doc! { "_id": *step_id, "project_id": *project_id, "owner": *owner },
            None,
        )
        .await?;

    Ok(result.deleted_count == 1)
}

pub async fn delete_steps_for_project(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
) -> DatabaseResult<u64> {
    let result = collection(client, database)
        .delete_many(doc! { "project_id": *project_id, "owner": *owner }, None)
        .await?;

    Ok(result.deleted_count)
}
