/// Access/refresh token lifecycle: issuance, rotation, reuse detection
/// and revocation.
///
/// Exactly one refresh session lives per user, stored as the SHA-256 hash
/// of the current refresh token under `refresh:{user_id}`. Issuing a new
/// pair overwrites the hash, which implicitly revokes the previous
/// refresh token. Presenting a refresh token whose hash no longer matches
/// is treated as evidence of compromise: the stored session is deleted so
/// every outstanding token for the user dies with it.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::code::{constant_time_eq, hash_token};
use crate::auth::jwt::{create_access_token, create_refresh_token};
use crate::configuration::JwtSettings;
use crate::error::{AppError, CredentialError};
use crate::store::KeyValueStore;

/// A freshly issued access/refresh pair. Both raw tokens go to the
/// caller; only the refresh hash is retained server-side.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn KeyValueStore>,
    config: JwtSettings,
}

fn refresh_session_key(user_id: Uuid) -> String {
    format!("refresh:{}", user_id)
}

impl TokenService {
    pub fn new(store: Arc<dyn KeyValueStore>, config: JwtSettings) -> Self {
        Self { store, config }
    }

    pub fn jwt_settings(&self) -> &JwtSettings {
        &self.config
    }

    /// Create both tokens and store the refresh hash, overwriting any
    /// prior session for this user. The only path reachable after
    /// successful authentication.
    pub async fn issue_tokens_for_user(
        &self,
        user_id: Uuid,
        roles: Vec<String>,
    ) -> Result<TokenPair, AppError> {
        let (access_token, access_expires_at) =
            create_access_token(user_id, roles, &self.config)?;
        let (refresh_token, refresh_expires_at) = create_refresh_token(user_id, &self.config)?;

        let ttl = Duration::from_secs(self.config.refresh_token_expiry.max(0) as u64);
        self.store
            .set_with_ttl(&refresh_session_key(user_id), &hash_token(&refresh_token), ttl)
            .await?;

        tracing::info!(user_id = %user_id, "Issued new token pair");

        Ok(TokenPair {
            access_token,
            access_expires_at,
            refresh_token,
            refresh_expires_at,
        })
    }

    /// Exchange a refresh token for a new pair, rotating the stored hash.
    ///
    /// A hash mismatch means the presented token was already rotated out
    /// or stolen; the session entry is deleted before failing so the
    /// token that does match can no longer be used either.
    pub async fn refresh_tokens(
        &self,
        user_id: Uuid,
        provided_refresh_token: &str,
        roles: Vec<String>,
    ) -> Result<TokenPair, AppError> {
        let key = refresh_session_key(user_id);

        let stored_hash = self
            .store
            .get(&key)
            .await?
            .ok_or(AppError::Credential(CredentialError::RefreshTokenNotFound))?;

        let provided_hash = hash_token(provided_refresh_token);
        if !constant_time_eq(&provided_hash, &stored_hash) {
            tracing::warn!(
                user_id = %user_id,
                "Refresh token reuse detected, revoking session"
            );
            self.store.delete(&key).await?;
            return Err(AppError::Credential(CredentialError::InvalidRefreshToken));
        }

        self.issue_tokens_for_user(user_id, roles).await
    }

    /// Delete the refresh session; used on sign-out.
    pub async fn revoke_refresh_for_user(&self, user_id: Uuid) -> Result<(), AppError> {
        self.store.delete(&refresh_session_key(user_id)).await?;
        tracing::info!(user_id = %user_id, "Refresh session revoked");
        Ok(())
    }
}
