// database/steps/model.rs - model for the build_steps collection

use crate::error::DatabaseResult;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Client, IndexModel,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const STEPS_COLLECTION: &str = "build_steps";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    LandPurchase,
    SitePreparation,
    Foundation,
    Framing,
    Roofing,
    Plumbing,
    Electrical,
    Hvac,
    Insulation,
    Drywall,
    Flooring,
    Cabinetry,
    Painting,
    Landscaping,
    Inspection,
    Handover,
    Other,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::LandPurchase => "land_purchase",
            StepType::SitePreparation => "site_preparation",
            StepType::Foundation => "foundation",
            StepType::Framing => "framing",
            StepType::Roofing => "roofing",
            StepType::Plumbing => "plumbing",
            StepType::Electrical => "electrical",
            StepType::Hvac => "hvac",
            StepType::Insulation => "insulation",
            StepType::Drywall => "drywall",
            StepType::Flooring => "flooring",
            StepType::Cabinetry => "cabinetry",
            StepType::Painting => "painting",
            StepType::Landscaping => "landscaping",
            StepType::Inspection => "inspection",
            StepType::Handover => "handover",
            StepType::Other => "other",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// A photo already uploaded to the image CDN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStepModel {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub project_id: ObjectId,
    pub owner: ObjectId,
    pub step_type: StepType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub start_date: Option<DateTime>,
    #[serde(default)]
    pub end_date: Option<DateTime>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<PhotoRef>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl BuildStepModel {
    pub fn new(project_id: ObjectId, owner: ObjectId, step_type: StepType, now: DateTime) -> Self {
        Self {
            id: None,
            project_id,
            owner,
            step_type,
            title: None,
            cost: None,
            start_date: None,
            end_date: None,
            notes: None,
            photos: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StepUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_type: Option<StepType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<PhotoRef>>,
}

pub async fn create_step_indexes(client: &Client, database: &str) -> DatabaseResult<()> {
    let by_project = IndexModel::builder()
        .keys(doc! { "project_id": 1, "start_date": 1 })
        .build();
    let by_owner = IndexModel::builder().keys(doc! { "owner": 1 }).build();

    client
        .database(database)
        .collection::<BuildStepModel>(STEPS_COLLECTION)
        .create_indexes(vec![by_project, by_owner], None)
        .await?;

    Ok(())
}
