/// Durable storage for reviewer invitations.
///
/// Rows are never deleted; consumption sets `used_at` exactly once via a
/// conditional update so two concurrent consumers cannot both win.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;

pub type StoreResult<T> = Result<T, AppError>;

#[derive(Debug, Clone)]
pub struct InviteRecord {
    pub token_hash: String,
    pub email: String,
    pub article_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait InviteStore: Send + Sync {
    async fn insert(&self, record: InviteRecord) -> StoreResult<()>;

    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<InviteRecord>>;

    /// Set `used_at = now` if and only if the invite is still unused and
    /// unexpired. Returns whether this call won the transition.
    async fn mark_used(&self, token_hash: &str, now: DateTime<Utc>) -> StoreResult<bool>;
}

/// Postgres-backed invite store.
pub struct PgInviteStore {
    pool: PgPool,
}

impl PgInviteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InviteStore for PgInviteStore {
    async fn insert(&self, record: InviteRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviewer_invites (token_hash, email, article_id, created_at, expires_at, used_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&record.token_hash)
        .bind(&record.email)
        .bind(record.article_id)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.used_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<InviteRecord>> {
        let row = sqlx::query_as::<
            _,
            (
                String,
                String,
                Uuid,
                DateTime<Utc>,
                DateTime<Utc>,
                Option<DateTime<Utc>>,
            ),
        >(
            r#"
            SELECT token_hash, email, article_id, created_at, expires_at, used_at
            FROM reviewer_invites
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(token_hash, email, article_id, created_at, expires_at, used_at)| InviteRecord {
                token_hash,
                email,
                article_id,
                created_at,
                expires_at,
                used_at,
            },
        ))
    }

    async fn mark_used(&self, token_hash: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reviewer_invites
            SET used_at = $1
            WHERE token_hash = $2 AND used_at IS NULL AND expires_at > $1
            "#,
        )
        .bind(now)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// In-memory invite store for tests and local development.
#[derive(Default)]
pub struct InMemoryInviteStore {
    invites: RwLock<HashMap<String, InviteRecord>>,
}

impl InMemoryInviteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite an invite's expiry (for testing purposes).
    pub fn set_expires_at(&self, token_hash: &str, expires_at: DateTime<Utc>) {
        if let Some(record) = self.invites.write().unwrap().get_mut(token_hash) {
            record.expires_at = expires_at;
        }
    }
}

#[async_trait]
impl InviteStore for InMemoryInviteStore {
    async fn insert(&self, record: InviteRecord) -> StoreResult<()> {
        self.invites
            .write()
            .unwrap()
            .insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<InviteRecord>> {
        Ok(self.invites.read().unwrap().get(token_hash).cloned())
    }

    async fn mark_used(&self, token_hash: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let mut invites = self.invites.write().unwrap();
        match invites.get_mut(token_hash) {
            Some(record) if record.used_at.is_none() && record.expires_at > now => {
                record.used_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(hash: &str) -> InviteRecord {
        let now = Utc::now();
        InviteRecord {
            token_hash: hash.to_string(),
            email: "reviewer@y.com".to_string(),
            article_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + Duration::days(7),
            used_at: None,
        }
    }

    #[tokio::test]
    async fn mark_used_wins_exactly_once() {
        let store = InMemoryInviteStore::new();
        store.insert(record("h1")).await.unwrap();

        assert!(store.mark_used("h1", Utc::now()).await.unwrap());
        assert!(!store.mark_used("h1", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn mark_used_refuses_expired_invites() {
        let store = InMemoryInviteStore::new();
        store.insert(record("h1")).await.unwrap();
        store.set_expires_at("h1", Utc::now() - Duration::hours(1));

        assert!(!store.mark_used("h1", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn consumed_rows_are_kept() {
        let store = InMemoryInviteStore::new();
        store.insert(record("h1")).await.unwrap();
        store.mark_used("h1", Utc::now()).await.unwrap();

        let found = store.find_by_token_hash("h1").await.unwrap().unwrap();
        assert!(found.used_at.is_some());
    }
}
