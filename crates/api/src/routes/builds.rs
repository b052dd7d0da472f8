// routes/builds.rs - CRUD for the signed in user's build projects

use crate::auth::AuthenticatedUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    CreateProjectRequest, CurrentStepRequest, ListBuildsQuery, ProjectEnvelope,
    ProjectListEnvelope, ProjectResponse, StatusRequest, UpdateProjectRequest,
};
use crate::utils::{parse_object_id, MessageResponse};
use actix_web::{
    delete, get, patch, post, put,
    web::{Data, Json, Path, Query},
    HttpResponse,
};
use database::{
    builds::{
        model::BuildProjectModel,
        query::{
            delete_project, get_project, insert_project, list_projects, set_current_step,
            set_project_status, update_project,
        },
    },
    steps::query::get_step,
};
use mongodb::bson::{oid::ObjectId, DateTime};
use tracing::{debug, info, warn};

// Loads a project owned by `owner`, or 404
pub(crate) async fn owned_project(
    config: &Config,
    owner: &ObjectId,
    project_id: &ObjectId,
) -> Result<BuildProjectModel, ApiError> {
    match get_project(&config.client, &config.database, owner, project_id).await? {
        Some(project) => Ok(project),
        None => {
            debug!("Project {} not found for {}", project_id, owner);
            Err(ApiError::not_found("Build not found"))
        }
    }
}

fn envelope(message: &str, project: &BuildProjectModel) -> ProjectEnvelope {
    ProjectEnvelope {
        success: true,
        message: message.to_string(),
        build: ProjectResponse::from(project),
    }
}

#[tracing::instrument(name = "/builds - Lists the user's builds", skip(config))]
#[get("")]
pub async fn list_builds(
    user: AuthenticatedUser,
    query: Query<ListBuildsQuery>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let projects = list_projects(&config.client, &config.database, &user.user_id, query.status).await?;
    debug!("Found {} builds for {}", projects.len(), user.user_id);

    Ok(HttpResponse::Ok().json(ProjectListEnvelope {
        success: true,
        message: "Builds retrieved".to_string(),
        builds: projects.iter().map(ProjectResponse::from).collect(),
    }))
}

#[tracing::instrument(name = "/builds - Creates a build", skip(config, req_data))]
#[post("")]
pub async fn create_build(
    user: AuthenticatedUser,
    req_data: Json<CreateProjectRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let mut project = req_data.into_inner().into_model(user.user_id, DateTime::now())?;

    let project_id = insert_project(&config.client, &config.database, &project).await?;
    project.id = Some(project_id);

    info!("Build {} created by {}", project_id, user.user_id);
    Ok(HttpResponse::Created().json(envelope("Build created", &project)))
}

#[tracing::instrument(name = "/builds/{id} - Returns one build", skip(config))]
#[get("/{id}")]
pub async fn get_build(
    user: AuthenticatedUser,
    path: Path<String>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let project_id = parse_object_id(&path)?;
    let project = owned_project(&config, &user.user_id, &project_id).await?;

    Ok(HttpResponse::Ok().json(envelope("Build retrieved", &project)))
}

#[tracing::instrument(name = "/builds/{id} - Updates a build", skip(config, req_data))]
#[put("/{id}")]
pub async fn update_build(
    user: AuthenticatedUser,
    path: Path<String>,
    req_data: Json<UpdateProjectRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let project_id = parse_object_id(&path)?;
    let existing = owned_project(&config, &user.user_id, &project_id).await?;
    let update = req_data.into_inner().into_update(&existing)?;

    let updated = update_project(
        &config.client,
        &config.database,
        &user.user_id,
        &project_id,
        &update,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Build not found"))?;

    info!("Build {} updated", project_id);
    Ok(HttpResponse::Ok().json(envelope("Build updated", &updated)))
}

#[tracing::instrument(name = "/builds/{id} - Deletes a build and its steps", skip(config))]
#[delete("/{id}")]
pub async fn delete_build(
    user: AuthenticatedUser,
    path: Path<String>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let project_id = parse_object_id(&path)?;

    if !delete_project(&config.client, &config.database, &user.user_id, &project_id).await? {
        return Err(ApiError::not_found("Build not found"));
    }

    info!("Build {} deleted", project_id);
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Build deleted")))
}

#[tracing::instrument(name = "/builds/{id}/status - Changes a build's status", skip(config))]
#[patch("/{id}/status")]
pub async fn update_build_status(
    user: AuthenticatedUser,
    path: Path<String>,
    req_data: Json<StatusRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let project_id = parse_object_id(&path)?;

    let updated = set_project_status(
        &config.client,
        &config.database,
        &user.user_id,
        &project_id,
        req_data.status,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Build not found"))?;

    info!("Build {} is now {}", project_id, updated.status);
    Ok(HttpResponse::Ok().json(envelope("Build status updated", &updated)))
}

#[tracing::instrument(name = "/builds/{id}/current-step - Points a build at one of its steps", skip(config))]
#[put("/{id}/current-step")]
pub async fn update_current_step(
    user: AuthenticatedUser,
    path: Path<String>,
    req_data: Json<CurrentStepRequest>,
    config: Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let project_id = parse_object_id(&path)?;
    owned_project(&config, &user.user_id, &project_id).await?;

    let step_id = match req_data.step_id.as_deref() {
        Some(raw) => {
            let step_id = parse_object_id(raw)?;
            let step = get_step(
                &config.client,
                &config.database,
                &user.user_id,
                &project_id,
                &step_id,
            )
            .await?;
            if step.is_none() {
                warn!("Step {} does not belong to build {}", step_id, project_id);
                return Err(ApiError::not_found("Step not found"));
            }
            Some(step_id)
        }
        None => None,
    };

    let updated = set_current_step(
        &config.client,
        &config.database,
        &user.user_id,
        &project_id,
        step_id,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Build not found"))?;

    info!("Build {} current step set to {:?}", project_id, step_id);
    Ok(HttpResponse::Ok().json(envelope("Current step updated", &updated)))
}
