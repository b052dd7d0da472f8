// database/users/query.rs - query functions for the users collection

use super::model::{UserModel, USERS_COLLECTION};
use crate::error::{DatabaseError, DatabaseResult};
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Client, Collection,
};

fn collection(client: &Client, database: &str) -> Collection<UserModel> {
    client.database(database).collection(USERS_COLLECTION)
}

// Insert a new user, returning its id. A taken email surfaces as DatabaseError::Duplicate.
pub async fn insert_user(
    client: &Client,
    database: &str,
    user: &UserModel,
) -> DatabaseResult<ObjectId> {
    let result = collection(client, database)
        .insert_one(user, None)
        .await
        .map_err(|e| DatabaseError::from_write(e, "email"))?;

    result
        .inserted_id
        .as_object_id()
        .ok_or(DatabaseError::UnexpectedId)
}

pub async fn find_user_by_email(
    client: &Client,
    database: &str,
    email: &str,
) -> DatabaseResult<Option<UserModel>> {
    Ok(collection(client, database)
        .find_one(doc! { "email": email }, None)
        .await?)
}

pub async fn find_user_by_id(
    client: &Client,
    database: &str,
    user_id: &ObjectId,
) -> DatabaseResult<Option<UserModel>> {
    Ok(collection(client, database)
        .find_one(doc! { "_id": *user_id }, None)
        .await?)
}

// Replace any pending verification code with a new one
pub async fn set_verification_otp(
    client: &Client,
    database: &str,
    user_id: &ObjectId,
    otp: &str,
    expires_at: DateTime,
) -> DatabaseResult<()> {
    collection(client, database)
        .update_one(
            doc! { "_id": *user_id },
            doc! { "$set": {
                "verification_otp": otp,
                "verification_otp_expires_at": expires_at,
                "updated_at": DateTime::now(),
            }},
            None,
        )
        .await?;

    Ok(())
}

// Marks the user verified only if the stored code still equals `otp`, so a code works once.
// Returns false if the code was consumed or replaced in the meantime.
pub async fn consume_verification_otp(
    client: &Client,
    database: &str,
    user_id: &ObjectId,
    otp: &str,
) -> DatabaseResult<bool> {
    let result = collection(client, database)
        .update_one(
            doc! { "_id": *user_id, "verification_otp": otp },
            doc! {
                "$set": { "is_verified": true, "updated_at": DateTime::now() },
                "$unset": { "verification_otp": "", "verification_otp_expires_at": "" },
            },
            None,
        )
        .await?;

    Ok(result.modified_count == 1)
}

// Store a reset code, invalidating any reset token issued by an earlier request
pub async fn set_reset_otp(
    client: &Client,
    database: &str,
    user_id: &ObjectId,
    otp: &str,
    expires_at: DateTime,
) -> DatabaseResult<()> {
    collection(client, database)
        .update_one(
            doc! { "_id": *user_id },
            doc! {
                "$set": {
                    "reset_otp": otp,
                    "reset_otp_expires_at": expires_at,
                    "updated_at": DateTime::now(),
                },
                "$unset": { "reset_token": "", "reset_token_expires_at": "" },
            },
            None,
        )
        .await?;

    Ok(())
}

// Swap a matching reset code for a reset token. The code is removed in the same update.
pub async fn consume_reset_otp(
    client: &Client,
    database: &str,
    user_id: &ObjectId,
    otp: &str,
    reset_token: &str,
    token_expires_at: DateTime,
) -> DatabaseResult<bool> {
    let result = collection(client, database)
        .update_one(
            doc! { "_id": *user_id, "reset_otp": otp },
            doc! {
                "$set": {
                    "reset_token": reset_token,
                    "reset_token_expires_at": token_expires_at,
                    "updated_at": DateTime::now(),
                },
                "$unset": { "reset_otp": "", "reset_otp_expires_at": "" },
            },
            None,
        )
        .await?;

    Ok(result.modified_count == 1)
}

// Set a new password if the reset token matches, removing the token
pub async fn consume_reset_token(
    client: &Client,
    database: &str,
    user_id: &ObjectId,
    reset_token: &str,
    password_hash: &str,
) -> DatabaseResult<bool> {
    let result = collection(client, database)
        .update_one(
            doc! { "_id": *user_id, "reset_token": reset_token },
            doc! {
                "$set": { "password_hash": password_hash, "updated_at": DateTime::now() },
                "$unset": {
                    "reset_token": "",
                    "reset_token_expires_at": "",
                    "reset_otp": "",
                    "reset_otp_expires_at": "",
                },
            },
            None,
        )
        .await?;

    Ok(result.modified_count == 1)
}
