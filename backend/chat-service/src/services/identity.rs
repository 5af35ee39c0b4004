//! Identity lookup against the profile collaborator.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_postgres::Pool;

/// Narrow view of the profile/account service. Usernames passed in are
/// already normalized.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn exists(&self, username: &str) -> AppResult<bool>;
    async fn profile_photo(&self, username: &str) -> AppResult<Option<String>>;
}

/// Directory held in memory; used for local runs and tests.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: DashMap<String, Option<String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let directory = Self::new();
        for username in usernames {
            directory.register(username.as_ref(), None);
        }
        directory
    }

    /// Register (or update) a user. The username is normalized first; blank
    /// names are ignored.
    pub fn register(&self, username: &str, profile_photo: Option<String>) {
        if let Some(username) = crate::models::normalize_username(username) {
            self.users.insert(username, profile_photo);
        }
    }
}

#[async_trait]
impl IdentityLookup for InMemoryDirectory {
    async fn exists(&self, username: &str) -> AppResult<bool> {
        Ok(self.users.contains_key(username))
    }

    async fn profile_photo(&self, username: &str) -> AppResult<Option<String>> {
        Ok(self.users.get(username).and_then(|entry| entry.value().clone()))
    }
}

/// Reads the `profiles` table kept in sync by the profile service.
#[derive(Clone)]
pub struct PgProfileDirectory {
    pool: Pool,
}

impl PgProfileDirectory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityLookup for PgProfileDirectory {
    async fn exists(&self, username: &str) -> AppResult<bool> {
        let client = self.pool.get().await.map_err(|e| {
            tracing::error!(username = %username, error = %e, "profile lookup failed");
            AppError::ServiceUnavailable(format!("profile lookup: {e}"))
        })?;

        let row = client
            .query_opt(
                "SELECT 1 FROM profiles WHERE lower(username) = $1 LIMIT 1",
                &[&username],
            )
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("profile lookup: {e}")))?;

        Ok(row.is_some())
    }

    async fn profile_photo(&self, username: &str) -> AppResult<Option<String>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT profile_photo FROM profiles WHERE lower(username) = $1 LIMIT 1",
                &[&username],
            )
            .await?;

        Ok(row.and_then(|r| r.get::<_, Option<String>>("profile_photo")))
    }
}
