// database/builds/model.rs - model for the build_projects collection

use crate::error::DatabaseResult;
use crate::steps::model::BuildStepModel;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Client, IndexModel,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PROJECTS_COLLECTION: &str = "build_projects";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Active => "active",
            BuildStatus::Completed => "completed",
            BuildStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildProjectModel {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner: ObjectId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub builder_name: Option<String>,
    #[serde(default)]
    pub status: BuildStatus,
    #[serde(default)]
    pub start_date: Option<DateTime>,
    #[serde(default)]
    pub target_completion_date: Option<DateTime>,
    #[serde(default)]
    pub budget: Option<f64>,

    // Summary fields, recomputed from the project's steps after every step change
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub step_count: i64,
    #[serde(default)]
    pub current_step: Option<ObjectId>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl BuildProjectModel {
    pub fn new(owner: ObjectId, name: &str, now: DateTime) -> Self {
        Self {
            id: None,
            owner,
            name: name.to_string(),
            address: None,
            builder_name: None,
            status: BuildStatus::Active,
            start_date: None,
            target_completion_date: None,
            budget: None,
            total_cost: 0.0,
            step_count: 0,
            current_step: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// Fields a caller may change on an existing project. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BuildStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_completion_date: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProjectSummary {
    pub total_cost: f64,
    pub step_count: i64,
}

impl ProjectSummary {
    pub fn from_steps(steps: &[BuildStepModel]) -> Self {
        steps.iter().fold(ProjectSummary::default(), |summary, step| ProjectSummary {
            total_cost: summary.total_cost + step.cost.unwrap_or(0.0),
            step_count: summary.step_count + 1,
        })
    }
}

pub async fn create_project_indexes(client: &Client, database: &str) -> DatabaseResult<()> {
    let model = IndexModel::builder()
        .keys(doc! { "owner": 1, "created_at": -1 })
        .build();

    client
        .database(database)
        .collection::<BuildProjectModel>(PROJECTS_COLLECTION)
        .create_index(model, None)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::model::StepType;
    use mongodb::bson::to_document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_serializes_lowercase() {
        let update = ProjectUpdate {
            status: Some(BuildStatus::Completed),
            ..Default::default()
        };
        let document = to_document(&update).unwrap();

        assert_eq!(document.get_str("status").unwrap(), "completed");
    }

    #[test]
    fn test_empty_update_serializes_to_empty_document() {
        let document = to_document(&ProjectUpdate::default()).unwrap();
        assert!(document.is_empty());
    }

    #[test]
    fn test_summary_sums_costs_and_counts_every_step() {
        let owner = ObjectId::new();
        let project = ObjectId::new();
        let now = DateTime::now();

        let mut framing = BuildStepModel::new(project, owner, StepType::Framing, now);
        framing.cost = Some(12_500.0);
        let mut roofing = BuildStepModel::new(project, owner, StepType::Roofing, now);
        roofing.cost = Some(7_250.5);
        let inspection = BuildStepModel::new(project, owner, StepType::Inspection, now);

        let summary = ProjectSummary::from_steps(&[framing, roofing, inspection]);
        assert_eq!(summary.step_count, 3);
        assert!((summary.total_cost - 19_750.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_of_no_steps_is_zero() {
        assert_eq!(ProjectSummary::from_steps(&[]), ProjectSummary::default());
    }
}
