// models.rs - Request bodies and response shapes of the REST API

use crate::auth::TokenPair;
use crate::error::ApiError;
use crate::password::validate_password;
use crate::utils::{format_date, is_valid_email, parse_optional_date};
use database::{
    builds::model::{BuildProjectModel, BuildStatus, ProjectUpdate},
    steps::model::{BuildStepModel, PhotoRef, StepType, StepUpdate},
    users::model::UserModel,
};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

// ---- auth ----

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::bad_request("Name is required"));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(ApiError::bad_request("A valid email is required"));
        }
        validate_password(&self.password)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub reset_token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_verified: bool,
    pub created_at: String,
}

impl From<&UserModel> for UserResponse {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name.clone(),
            email: user.email.clone(),
            is_verified: user.is_verified,
            created_at: format_date(user.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct ResetTokenResponse {
    pub success: bool,
    pub message: String,
    pub reset_token: String,
}

// ---- builds ----

#[derive(Debug, Deserialize)]
pub struct ListBuildsQuery {
    pub status: Option<BuildStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub address: Option<String>,
    pub builder_name: Option<String>,
    pub status: Option<BuildStatus>,
    pub start_date: Option<String>,
    pub target_completion_date: Option<String>,
    pub budget: Option<f64>,
}

impl CreateProjectRequest {
    pub fn into_model(
        self,
        owner: ObjectId,
        now: DateTime,
    ) -> Result<BuildProjectModel, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::bad_request("Name is required"));
        }
        validate_amount("budget", self.budget)?;

        let start_date = parse_optional_date("start_date", self.start_date.as_deref())?;
        let target_completion_date = parse_optional_date(
            "target_completion_date",
            self.target_completion_date.as_deref(),
        )?;
        validate_range(
            start_date,
            target_completion_date,
            "Target completion date must not be before the start date",
        )?;

        let mut project = BuildProjectModel::new(owner, name, now);
        project.address = trimmed(self.address);
        project.builder_name = trimmed(self.builder_name);
        project.status = self.status.unwrap_or_default();
        project.start_date = start_date;
        project.target_completion_date = target_completion_date;
        project.budget = self.budget;
        Ok(project)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub builder_name: Option<String>,
    pub status: Option<BuildStatus>,
    pub start_date: Option<String>,
    pub target_completion_date: Option<String>,
    pub budget: Option<f64>,
}

impl UpdateProjectRequest {
    // `existing` supplies the dates the update leaves untouched for the range check
    pub fn into_update(self, existing: &BuildProjectModel) -> Result<ProjectUpdate, ApiError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ApiError::bad_request("Name cannot be empty"));
            }
        }
        validate_amount("budget", self.budget)?;

        let start_date = parse_optional_date("start_date", self.start_date.as_deref())?;
        let target_completion_date = parse_optional_date(
            "target_completion_date",
            self.target_completion_date.as_deref(),
        )?;
        validate_range(
            start_date.or(existing.start_date),
            target_completion_date.or(existing.target_completion_date),
            "Target completion date must not be before the start date",
        )?;

        Ok(ProjectUpdate {
            name: self.name.map(|name| name.trim().to_string()),
            address: trimmed(self.address),
            builder_name: trimmed(self.builder_name),
            status: self.status,
            start_date,
            target_completion_date,
            budget: self.budget,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: BuildStatus,
}

#[derive(Debug, Deserialize)]
pub struct CurrentStepRequest {
    pub step_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub builder_name: Option<String>,
    pub status: BuildStatus,
    pub start_date: Option<String>,
    pub target_completion_date: Option<String>,
    pub budget: Option<f64>,
    pub total_cost: f64,
    pub step_count: i64,
    pub current_step: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&BuildProjectModel> for ProjectResponse {
    fn from(project: &BuildProjectModel) -> Self {
        Self {
            id: project.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: project.name.clone(),
            address: project.address.clone(),
            builder_name: project.builder_name.clone(),
            status: project.status,
            start_date: project.start_date.map(format_date),
            target_completion_date: project.target_completion_date.map(format_date),
            budget: project.budget,
            total_cost: project.total_cost,
            step_count: project.step_count,
            current_step: project.current_step.map(|id| id.to_hex()),
            created_at: format_date(project.created_at),
            updated_at: format_date(project.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectEnvelope {
    pub success: bool,
    pub message: String,
    pub build: ProjectResponse,
}

#[derive(Debug, Serialize)]
pub struct ProjectListEnvelope {
    pub success: bool,
    pub message: String,
    pub builds: Vec<ProjectResponse>,
}

// ---- steps ----

#[derive(Debug, Deserialize)]
pub struct CreateStepRequest {
    pub step_type: StepType,
    pub title: Option<String>,
    pub cost: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<PhotoRef>,
}

impl CreateStepRequest {
    pub fn into_model(
        self,
        project_id: ObjectId,
        owner: ObjectId,
        now: DateTime,
    ) -> Result<BuildStepModel, ApiError> {
        validate_amount("cost", self.cost)?;
        validate_photos(&self.photos)?;

        let start_date = parse_optional_date("start_date", self.start_date.as_deref())?;
        let end_date = parse_optional_date("end_date", self.end_date.as_deref())?;
        validate_range(start_date, end_date, "End date must not be before the start date")?;

        let mut step = BuildStepModel::new(project_id, owner, self.step_type, now);
        step.title = trimmed(self.title);
        step.cost = self.cost;
        step.start_date = start_date;
        step.end_date = end_date;
        step.notes = self.notes;
        step.photos = self.photos;
        Ok(step)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStepRequest {
    pub step_type: Option<StepType>,
    pub title: Option<String>,
    pub cost: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notes: Option<String>,
    pub photos: Option<Vec<PhotoRef>>,
}

impl UpdateStepRequest {
    pub fn into_update(self, existing: &BuildStepModel) -> Result<StepUpdate, ApiError> {
        validate_amount("cost", self.cost)?;
        if let Some(photos) = &self.photos {
            validate_photos(photos)?;
        }

        let start_date = parse_optional_date("start_date", self.start_date.as_deref())?;
        let end_date = parse_optional_date("end_date", self.end_date.as_deref())?;
        validate_range(
            start_date.or(existing.start_date),
            end_date.or(existing.end_date),
            "End date must not be before the start date",
        )?;

        Ok(StepUpdate {
            step_type: self.step_type,
            title: trimmed(self.title),
            cost: self.cost,
            start_date,
            end_date,
            notes: self.notes,
            photos: self.photos,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResponse {
    pub id: String,
    pub project_id: String,
    pub step_type: StepType,
    pub title: Option<String>,
    pub cost: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub notes: Option<String>,
    pub photos: Vec<PhotoRef>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&BuildStepModel> for StepResponse {
    fn from(step: &BuildStepModel) -> Self {
        Self {
            id: step.id.map(|id| id.to_hex()).unwrap_or_default(),
            project_id: step.project_id.to_hex(),
            step_type: step.step_type,
            title: step.title.clone(),
            cost: step.cost,
            start_date: step.start_date.map(format_date),
            end_date: step.end_date.map(format_date),
            notes: step.notes.clone(),
            photos: step.photos.clone(),
            created_at: format_date(step.created_at),
            updated_at: format_date(step.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepEnvelope {
    pub success: bool,
    pub message: String,
    pub step: StepResponse,
}

#[derive(Debug, Serialize)]
pub struct StepListEnvelope {
    pub success: bool,
    pub message: String,
    pub steps: Vec<StepResponse>,
}

// ---- shared validation ----

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn validate_amount(field: &str, amount: Option<f64>) -> Result<(), ApiError> {
    match amount {
        Some(amount) if !amount.is_finite() || amount < 0.0 => Err(ApiError::BadRequest(format!(
            "{} must be a non-negative number",
            field
        ))),
        _ => Ok(()),
    }
}

fn validate_range(
    start: Option<DateTime>,
    end: Option<DateTime>,
    message: &str,
) -> Result<(), ApiError> {
    match (start, end) {
        (Some(start), Some(end)) if end.timestamp_millis() < start.timestamp_millis() => {
            Err(ApiError::bad_request(message))
        }
        _ => Ok(()),
    }
}

fn validate_photos(photos: &[PhotoRef]) -> Result<(), ApiError> {
    if photos.iter().any(|photo| !photo.url.starts_with("https://")) {
        return Err(ApiError::bad_request("Photo urls must use https"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn register(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn create_project(name: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.to_string(),
            address: None,
            builder_name: None,
            status: None,
            start_date: None,
            target_completion_date: None,
            budget: None,
        }
    }

    fn create_step(step_type: StepType) -> CreateStepRequest {
        CreateStepRequest {
            step_type,
            title: None,
            cost: None,
            start_date: None,
            end_date: None,
            notes: None,
            photos: Vec::new(),
        }
    }

    #[test]
    fn test_register_validation() {
        assert!(register("Ada", "ada@example.com", "longenough").validate().is_ok());
        assert!(register("  ", "ada@example.com", "longenough").validate().is_err());
        assert!(register("Ada", "not-an-email", "longenough").validate().is_err());
        assert!(register("Ada", "ada@example.com", "short").validate().is_err());
    }

    #[test]
    fn test_create_project_defaults_to_active() {
        let owner = ObjectId::new();
        let mut request = create_project("  Lot 12 ");
        request.address = Some("   ".to_string());

        let project = request.into_model(owner, DateTime::now()).unwrap();
        assert_eq!(project.name, "Lot 12");
        assert_eq!(project.status, BuildStatus::Active);
        assert_eq!(project.owner, owner);
        assert_eq!(project.address, None);
    }

    #[test]
    fn test_create_project_rejects_negative_budget_and_inverted_dates() {
        let mut request = create_project("Lot 12");
        request.budget = Some(-1.0);
        assert!(request.into_model(ObjectId::new(), DateTime::now()).is_err());

        let mut request = create_project("Lot 12");
        request.start_date = Some("2024-06-01".to_string());
        request.target_completion_date = Some("2024-05-01".to_string());
        assert!(request.into_model(ObjectId::new(), DateTime::now()).is_err());
    }

    #[test]
    fn test_update_checks_dates_against_existing_project() {
        let mut existing = create_project("Lot 12")
            .into_model(ObjectId::new(), DateTime::now())
            .unwrap();
        existing.start_date = Some(crate::utils::parse_date("start_date", "2024-06-01").unwrap());

        let request = UpdateProjectRequest {
            target_completion_date: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert!(request.into_update(&existing).is_err());

        let request = UpdateProjectRequest {
            target_completion_date: Some("2025-01-01".to_string()),
            ..Default::default()
        };
        let update = request.into_update(&existing).unwrap();
        assert!(update.target_completion_date.is_some());
        assert!(update.start_date.is_none());
    }

    #[test]
    fn test_step_request_into_model() {
        let project = ObjectId::new();
        let owner = ObjectId::new();
        let mut request = create_step(StepType::Foundation);
        request.cost = Some(18_000.0);
        request.start_date = Some("2024-02-01".to_string());
        request.end_date = Some("2024-02-20".to_string());
        request.photos = vec![PhotoRef {
            url: "https://ik.imagekit.io/demo/slab.jpg".to_string(),
            file_id: Some("f1".to_string()),
            thumbnail_url: None,
        }];

        let step = request.into_model(project, owner, DateTime::now()).unwrap();
        assert_eq!(step.project_id, project);
        assert_eq!(step.step_type, StepType::Foundation);
        assert_eq!(step.photos.len(), 1);
    }

    #[test]
    fn test_step_request_rejects_insecure_photo_urls() {
        let mut request = create_step(StepType::Framing);
        request.photos = vec![PhotoRef {
            url: "http://example.com/frame.jpg".to_string(),
            file_id: None,
            thumbnail_url: None,
        }];

        assert!(request
            .into_model(ObjectId::new(), ObjectId::new(), DateTime::now())
            .is_err());
    }

    #[test]
    fn test_step_type_deserializes_from_snake_case() {
        let request: CreateStepRequest =
            serde_json::from_str(r#"{"step_type": "site_preparation", "cost": 2500}"#).unwrap();
        assert_eq!(request.step_type, StepType::SitePreparation);
        assert_eq!(request.cost, Some(2500.0));
        assert!(request.photos.is_empty());
    }

    #[test]
    fn test_project_response_uses_hex_ids() {
        let owner = ObjectId::new();
        let id = ObjectId::new();
        let mut project = create_project("Lot 12")
            .into_model(owner, DateTime::now())
            .unwrap();
        project.id = Some(id);

        let response = ProjectResponse::from(&project);
        assert_eq!(response.id, id.to_hex());
        assert_eq!(response.current_step, None);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "active");
    }
}
