// database/users/model.rs - model for the users collection

use crate::error::DatabaseResult;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    options::IndexOptions,
    Client, IndexModel,
};
use serde::{Deserialize, Serialize};

pub const USERS_COLLECTION: &str = "users";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserModel {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_verified: bool,

    // Email verification code
    #[serde(default)]
    pub verification_otp: Option<String>,
    #[serde(default)]
    pub verification_otp_expires_at: Option<DateTime>,

    // Password reset: the emailed code, then the token handed out once the code is verified
    #[serde(default)]
    pub reset_otp: Option<String>,
    #[serde(default)]
    pub reset_otp_expires_at: Option<DateTime>,
    #[serde(default)]
    pub reset_token: Option<String>,
    #[serde(default)]
    pub reset_token_expires_at: Option<DateTime>,

    #[serde(default)]
    pub push_token: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl UserModel {
    pub fn new(name: &str, email: &str, password_hash: String, now: DateTime) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            is_verified: false,
            verification_otp: None,
            verification_otp_expires_at: None,
            reset_otp: None,
            reset_otp_expires_at: None,
            reset_token: None,
            reset_token_expires_at: None,
            push_token: None,
            created_at: now,
            updated_at: now,
        }
    }
}

pub async fn create_user_index(client: &Client, database: &str) -> DatabaseResult<()> {
    let options = IndexOptions::builder().unique(true).build();

    let model = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(options)
        .build();

    client
        .database(database)
        .collection::<UserModel>(USERS_COLLECTION)
        .create_index(model, None)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{from_document, to_document};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_user_is_unverified_without_codes() {
        let user = UserModel::new("Ada", "ada@example.com", "hash".to_string(), DateTime::now());

        assert!(!user.is_verified);
        assert!(user.id.is_none());
        assert!(user.reset_otp.is_none());
        assert!(user.reset_token.is_none());
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_missing_optional_fields_deserialize_to_defaults() {
        let now = DateTime::now();
        let document = doc! {
            "_id": ObjectId::new(),
            "name": "Ada",
            "email": "ada@example.com",
            "password_hash": "hash",
            "created_at": now,
            "updated_at": now,
        };

        let user: UserModel = from_document(document).unwrap();
        assert!(!user.is_verified);
        assert!(user.verification_otp.is_none());
        assert!(user.push_token.is_none());
    }

    #[test]
    fn test_unsaved_user_serializes_without_id() {
        let user = UserModel::new("Ada", "ada@example.com", "hash".to_string(), DateTime::now());
        let document = to_document(&user).unwrap();

        assert!(!document.contains_key("_id"));
        assert_eq!(document.get_str("email").unwrap(), "ada@example.com");
    }
}
