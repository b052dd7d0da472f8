// routes/steps.rs - Steps nested under a build, /api/builds/{id}/steps

use super::builds::owned_project;
use crate::auth::AuthenticatedUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    CreateStepRequest, StepEnvelope, StepListEnvelope, StepResponse, UpdateStepRequest,
};
use crate::utils::{parse_object_id, MessageResponse};
use actix_web::{
    delete, get, post, put,
    web::{Data, Json, Path},
    HttpResponse,
};
use database::{
    builds::query::{clear_current_step_if, refresh_project_summary},
    steps::{
        model::BuildStepModel,
        query::{self as step_query, insert_step, list_steps_for_project},
    },
};
use mongodb::bson::{oid::ObjectId, DateTime};
use tracing::{debug, info, warn};

fn parse_ids(path: &(String, String)) -> Result<(ObjectId, ObjectId), ApiError> {
    Ok((parse_object_id(&path.0)?, parse_object_id(&path.1)?))
}

fn envelope(message: &str, step: &BuildStepModel) -> StepEnvelope {
    StepEnvelope {
        success: true,
        message: message.to_string(),
        step: StepResponse::from(step),
    }
}

// The step write has already happened; a failed summary refresh is logged, not returned
async fn refresh_summary(config: &Config, owner: &ObjectId, project_id: &ObjectId) {
    if let Err(e) = refresh_project_summary(&config.client, &config.database, owner, project_id).await {
        warn!("Could not refresh summary of build {}: {}", project_id, e);
    }
}

#[tracing::instrument(name = "/builds/{id}/steps - Lists a build's steps", skip(config))]
#[get("/{id}/steps")]
pub async fn list_steps(
    user: AuthenticatedUser,
    path: Path<String>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let project_id = parse_object_id(&path)?;
    owned_project(&config, &user.user_id, &project_id).await?;

    let steps =
        list_steps_for_project(&config.client, &config.database, &user.user_id, &project_id).await?;
    debug!("Build {} has {} steps", project_id, steps.len());

    Ok(HttpResponse::Ok().json(StepListEnvelope {
        success: true,
        message: "Steps retrieved".to_string(),
        steps: steps.iter().map(StepResponse::from).collect(),
    }))
}

#[tracing::instrument(name = "/builds/{id}/steps - Adds a step to a build", skip(config, req_data))]
#[post("/{id}/steps")]
pub async fn create_step(
    user: AuthenticatedUser,
    path: Path<String>,
    req_data: Json<CreateStepRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let project_id = parse_object_id(&path)?;
    owned_project(&config, &user.user_id, &project_id).await?;

    let mut step = req_data
        .into_inner()
        .into_model(project_id, user.user_id, DateTime::now())?;
    let step_id = insert_step(&config.client, &config.database, &step).await?;
    step.id = Some(step_id);

    refresh_summary(&config, &user.user_id, &project_id).await;

    info!("Step {} ({}) added to build {}", step_id, step.step_type, project_id);
    Ok(HttpResponse::Created().json(envelope("Step created", &step)))
}

#[tracing::instrument(name = "/builds/{id}/steps/{step_id} - Returns one step", skip(config))]
#[get("/{id}/steps/{step_id}")]
pub async fn get_step(
    user: AuthenticatedUser,
    path: Path<(String, String)>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, step_id) = parse_ids(&path)?;

    let step = step_query::get_step(
        &config.client,
        &config.database,
        &user.user_id,
        &project_id,
        &step_id,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Step not found"))?;

    Ok(HttpResponse::Ok().json(envelope("Step retrieved", &step)))
}

#[tracing::instrument(name = "/builds/{id}/steps/{step_id} - Updates a step", skip(config, req_data))]
#[put("/{id}/steps/{step_id}")]
pub async fn update_step(
    user: AuthenticatedUser,
    path: Path<(String, String)>,
    req_data: Json<UpdateStepRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, step_id) = parse_ids(&path)?;

    let existing = step_query::get_step(
        &config.client,
        &config.database,
        &user.user_id,
        &project_id,
        &step_id,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Step not found"))?;
    let update = req_data.into_inner().into_update(&existing)?;

    let updated = step_query::update_step(
        &config.client,
        &config.database,
        &user.user_id,
        &project_id,
        &step_id,
        &update,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Step not found"))?;

    refresh_summary(&config, &user.user_id, &project_id).await;

    info!("Step {} updated", step_id);
    Ok(HttpResponse::Ok().json(envelope("Step updated", &updated)))
}

#[tracing::instrument(name = "/builds/{id}/steps/{step_id} - Deletes a step", skip(config))]
#[delete("/{id}/steps/{step_id}")]
pub async fn delete_step(
    user: AuthenticatedUser,
    path: Path<(String, String)>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, step_id) = parse_ids(&path)?;

    let deleted = step_query::delete_step(
        &config.client,
        &config.database,
        &user.user_id,
        &project_id,
        &step_id,
    )
    .await?;
    if !deleted {
        return Err(ApiError::not_found("Step not found"));
    }

    clear_current_step_if(&config.client, &config.database, &project_id, &step_id).await?;
    refresh_summary(&config, &user.user_id, &project_id).await;

    info!("Step {} deleted from build {}", step_id, project_id);
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Step deleted")))
}
