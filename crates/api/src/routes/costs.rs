// routes/costs.rs - GET /api/costs/overview

use crate::auth::AuthenticatedUser;
use crate::config::Config;
use crate::costs::{summarize_costs, CostOverview};
use crate::error::ApiError;
use actix_web::{get, web::Data, HttpResponse};
use database::{builds::query::list_projects, steps::query::list_steps_for_owner};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct OverviewResponse {
    success: bool,
    message: String,
    #[serde(flatten)]
    overview: CostOverview,
}

#[tracing::instrument(name = "/costs/overview - Totals spending across the user's builds", skip(config))]
#[get("/overview")]
pub async fn overview(user: AuthenticatedUser, config: Data<Config>) -> Result<HttpResponse, ApiError> {
    let projects = list_projects(&config.client, &config.database, &user.user_id, None).await?;
    let steps = list_steps_for_owner(&config.client, &config.database, &user.user_id).await?;
    debug!(
        "Summarizing {} builds and {} steps for {}",
        projects.len(),
        steps.len(),
        user.user_id
    );

    Ok(HttpResponse::Ok().json(OverviewResponse {
        success: true,
        message: "Cost overview".to_string(),
        overview: summarize_costs(&projects, &steps),
    }))
}
