/// Single-use reviewer invitation tokens.
///
/// Only the SHA-256 hash of a token is ever stored; the raw code exists
/// once, in the emailed URL. Resolving is read-only and repeatable,
/// consuming flips `used_at` exactly once.

use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{generate_code, hash_token};
use crate::error::{AppError, CredentialError};
use crate::invites::store::{InviteRecord, InviteStore};
use crate::validators::normalize_email;

/// Invitations expire seven days after creation.
const INVITE_TTL_DAYS: i64 = 7;

/// What a valid invite resolves to.
#[derive(Debug, Clone)]
pub struct Invitation {
    pub email: String,
    pub article_id: Uuid,
}

#[derive(Clone)]
pub struct InviteService {
    store: Arc<dyn InviteStore>,
}

impl InviteService {
    pub fn new(store: Arc<dyn InviteStore>) -> Self {
        Self { store }
    }

    /// Create an invitation and return the raw token. The caller embeds
    /// it in the emailed URL; it is never persisted.
    pub async fn create_invite(&self, email: &str, article_id: Uuid) -> Result<String, AppError> {
        let raw_token = generate_code();
        let now = Utc::now();

        let record = InviteRecord {
            token_hash: hash_token(&raw_token),
            email: normalize_email(email),
            article_id,
            created_at: now,
            expires_at: now + Duration::days(INVITE_TTL_DAYS),
            used_at: None,
        };
        self.store.insert(record).await?;

        tracing::info!(article_id = %article_id, "Reviewer invite created");
        Ok(raw_token)
    }

    /// Look an invite up without consuming it. Fails with `InvalidToken`
    /// if unknown, already used, or expired.
    pub async fn resolve(&self, raw_token: &str) -> Result<Invitation, AppError> {
        let record = self.lookup_valid(raw_token).await?;
        Ok(Invitation {
            email: record.email,
            article_id: record.article_id,
        })
    }

    /// Consume an invite: same validity rules as `resolve`, plus the
    /// one-time `used_at` transition. A second consume, or a concurrent
    /// loser, fails with `InvalidToken`.
    pub async fn consume(&self, raw_token: &str) -> Result<Invitation, AppError> {
        let record = self.lookup_valid(raw_token).await?;

        let won = self.store.mark_used(&record.token_hash, Utc::now()).await?;
        if !won {
            tracing::warn!(article_id = %record.article_id, "Invite already consumed");
            return Err(AppError::Credential(CredentialError::InvalidToken));
        }

        tracing::info!(article_id = %record.article_id, "Reviewer invite consumed");
        Ok(Invitation {
            email: record.email,
            article_id: record.article_id,
        })
    }

    async fn lookup_valid(&self, raw_token: &str) -> Result<InviteRecord, AppError> {
        let record = self
            .store
            .find_by_token_hash(&hash_token(raw_token))
            .await?
            .ok_or(AppError::Credential(CredentialError::InvalidToken))?;

        if record.used_at.is_some() {
            return Err(AppError::Credential(CredentialError::InvalidToken));
        }
        if record.expires_at <= Utc::now() {
            tracing::info!(article_id = %record.article_id, "Expired invite presented");
            return Err(AppError::Credential(CredentialError::InvalidToken));
        }

        Ok(record)
    }
}
