use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub profile_image_url: Option<String>,
    pub is_email_verified: bool,
    pub otp: Option<String>, // present only while verification is pending
    pub otp_expiry: Option<OffsetDateTime>, // cleared together with otp
    pub created_at: OffsetDateTime,
}

/// Input for creating a user. The password arrives in plaintext and is
/// hashed by the store before it touches the database.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub profile_image_url: Option<String>,
    pub otp: String,
    pub otp_expiry: OffsetDateTime,
}
