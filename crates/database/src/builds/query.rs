// database/builds/query.rs - query functions for the build_projects collection
//
// Every lookup is scoped by owner, so a project belonging to someone else is simply not found.

use super::model::{BuildProjectModel, BuildStatus, ProjectSummary, ProjectUpdate, PROJECTS_COLLECTION};
use crate::error::{DatabaseError, DatabaseResult};
use crate::steps::query::{delete_steps_for_project, list_steps_for_project};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, to_document, DateTime},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Collection,
};
use tracing::debug;

fn collection(client: &Client, database: &str) -> Collection<BuildProjectModel> {
    client.database(database).collection(PROJECTS_COLLECTION)
}

fn return_updated() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

pub async fn insert_project(
    client: &Client,
    database: &str,
    project: &BuildProjectModel,
) -> DatabaseResult<ObjectId> {
    let result = collection(client, database).insert_one(project, None).await?;

    result
        .inserted_id
        .as_object_id()
        .ok_or(DatabaseError::UnexpectedId)
}

// Newest projects first, optionally narrowed to one status
pub async fn list_projects(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    status: Option<BuildStatus>,
) -> DatabaseResult<Vec<BuildProjectModel>> {
    let mut filter = doc! { "owner": *owner };
    if let Some(status) = status {
        filter.insert("status", status.as_str());
    }

    let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
    let cursor = collection(client, database).find(filter, options).await?;

    Ok(cursor.try_collect().await?)
}

pub async fn get_project(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
) -> DatabaseResult<Option<BuildProjectModel>> {
    Ok(collection(client, database)
        .find_one(doc! { "_id": *project_id, "owner": *owner }, None)
        .await?)
}

pub async fn update_project(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
    update: &ProjectUpdate,
) -> DatabaseResult<Option<BuildProjectModel>> {
    let mut set = to_document(update)?;
    set.insert("updated_at", DateTime::now());
    debug!("Updating project {} with fields {:?}", project_id, set.keys().collect::<Vec<_>>());

    Ok(collection(client, database)
        .find_one_and_update(
            doc! { "_id": *project_id, "owner": *owner },
            doc! { "$set": set },
            return_updated(),
        )
        .await?)
}

pub async fn set_project_status(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
    status: BuildStatus,
) -> DatabaseResult<Option<BuildProjectModel>> {
    Ok(collection(client, database)
        .find_one_and_update(
            doc! { "_id": *project_id, "owner": *owner },
            doc! { "$set": { "status": to_bson(&status)?, "updated_at": DateTime::now() } },
            return_updated(),
        )
        .await?)
}

// Point the project at one of its steps, or clear the pointer with None
pub async fn set_current_step(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
    step_id: Option<ObjectId>,
) -> DatabaseResult<Option<BuildProjectModel>> {
    Ok(collection(client, database)
        .find_one_and_update(
            doc! { "_id": *project_id, "owner": *owner },
            doc! { "$set": { "current_step": step_id, "updated_at": DateTime::now() } },
            return_updated(),
        )
        .await?)
}

// Clears the pointer only when it still references `step_id`
pub async fn clear_current_step_if(
    client: &Client,
    database: &str,
    project_id: &ObjectId,
    step_id: &ObjectId,
) -> DatabaseResult<()> {
    collection(client, database)
        .update_one(
            doc! { "_id": *project_id, "current_step": *step_id },
            doc! { "$set": { "current_step": null, "updated_at": DateTime::now() } },
            None,
        )
        .await?;

    Ok(())
}

// Recompute total_cost and step_count from the project's steps
pub async fn refresh_project_summary(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
) -> DatabaseResult<ProjectSummary> {
    let steps = list_steps_for_project(client, database, owner, project_id).await?;
    let summary = ProjectSummary::from_steps(&steps);
    debug!(
        "Project {} summary: {} steps, total cost {}",
        project_id, summary.step_count, summary.total_cost
    );

    collection(client, database)
        .update_one(
            doc! { "_id": *project_id, "owner": *owner },
            doc! { "$set": {
                "total_cost": summary.total_cost,
                "step_count": summary.step_count,
                "updated_at": DateTime::now(),
            }},
            None,
        )
        .await?;

    Ok(summary)
}

// Delete a project and all of its steps. Returns false if the project was not found.
pub async fn delete_project(
    client: &Client,
    database: &str,
    owner: &ObjectId,
    project_id: &ObjectId,
) -> DatabaseResult<bool> {
    let result = collection(client, database)
        .delete_one(doc! { "_id": *project_id, "owner": *owner }, None)
        .await?;

    if result.deleted_count == 0 {
        return Ok(false);
    }

    let removed_steps = delete_steps_for_project(client, database, owner, project_id).await?;
    debug!("Deleted project {} and {} steps", project_id, removed_steps);

    Ok(true)
}
