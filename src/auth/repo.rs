use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password;
use crate::auth::repo_types::{NewUser, User};

impl User {
    /// Compare a plaintext password against the stored hash.
    pub fn verify_password(&self, plain: &str) -> anyhow::Result<bool> {
        password::verify_password(plain, &self.password_hash)
    }
}

/// Persistence collaborator owning durable user records and password
/// hashing.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Create a user, hashing the plaintext password before storing.
    async fn create(&self, new_user: NewUser) -> anyhow::Result<User>;
    /// Flip the verified flag and clear both OTP columns.
    async fn mark_email_verified(&self, id: Uuid) -> anyhow::Result<User>;
}

/// True when the error is a unique-constraint violation, i.e. the register
/// pre-check lost a race to a concurrent insert on the same email.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, password_hash, profile_image_url,
                   is_email_verified, otp, otp_expiry, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, password_hash, profile_image_url,
                   is_email_verified, otp, otp_expiry, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
        let hash = password::hash_password(&new_user.password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, password_hash, profile_image_url, otp, otp_expiry)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, full_name, email, password_hash, profile_image_url,
                      is_email_verified, otp, otp_expiry, created_at
            "#,
        )
        .bind(&new_user.full_name)
        .bind(&new_user.email)
        .bind(&hash)
        .bind(&new_user.profile_image_url)
        .bind(&new_user.otp)
        .bind(new_user.otp_expiry)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn mark_email_verified(&self, id: Uuid) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_email_verified = TRUE, otp = NULL, otp_expiry = NULL
            WHERE id = $1
            RETURNING id, full_name, email, password_hash, profile_image_url,
                      is_email_verified, otp, otp_expiry, created_at
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }
}

/// In-memory store for tests; mirrors the Postgres schema semantics,
/// including the unique email constraint.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use time::{Duration, OffsetDateTime};

    #[derive(Default)]
    pub struct MemoryUserStore {
        users: Mutex<HashMap<Uuid, User>>,
    }

    impl MemoryUserStore {
        /// Test hook: push an existing OTP expiry into the past.
        pub fn expire_otp(&self, email: &str) {
            let mut users = self.users.lock().unwrap();
            if let Some(user) = users.values_mut().find(|u| u.email == email) {
                user.otp_expiry = Some(OffsetDateTime::now_utc() - Duration::minutes(1));
            }
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.get(&id).cloned())
        }

        async fn create(&self, new_user: NewUser) -> anyhow::Result<User> {
            let hash = password::hash_password(&new_user.password)?;
            let mut users = self.users.lock().unwrap();
            if users.values().any(|u| u.email == new_user.email) {
                anyhow::bail!("duplicate key value violates unique constraint \"users_email_key\"");
            }
            let user = User {
                id: Uuid::new_v4(),
                full_name: new_user.full_name,
                email: new_user.email,
                password_hash: hash,
                profile_image_url: new_user.profile_image_url,
                is_email_verified: false,
                otp: Some(new_user.otp),
                otp_expiry: Some(new_user.otp_expiry),
                created_at: OffsetDateTime::now_utc(),
            };
            users.insert(user.id, user.clone());
            Ok(user)
        }

        async fn mark_email_verified(&self, id: Uuid) -> anyhow::Result<User> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .get_mut(&id)
                .ok_or_else(|| anyhow::anyhow!("no user with id {id}"))?;
            user.is_email_verified = true;
            user.otp = None;
            user.otp_expiry = None;
            Ok(user.clone())
        }
    }
}
