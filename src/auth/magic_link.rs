/// Passwordless email sign-in and sign-up.
///
/// Each email has at most one outstanding login code, a resend gate that
/// enforces an increasing backoff, and (after signup verification) a
/// verified-email marker that lets profile completion proceed without a
/// fresh code. All of it lives in the key-value store under per-email
/// keys so one address's abuse never throttles another.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::code::{constant_time_eq, generate_code};
use crate::directory::UserDirectory;
use crate::email_client::EmailSender;
use crate::error::{AppError, CredentialError};
use crate::store::KeyValueStore;

/// Login codes live for five minutes.
const CODE_TTL: Duration = Duration::from_secs(5 * 60);
/// The verified-email marker lives for seven days.
const VERIFIED_MARKER_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Throttle state evaporates after a day without activity, which resets
/// the backoff ladder.
const RESEND_STATE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const VERIFIED_MARKER_VALUE: &str = "verified";

/// Backoff before the next code may be sent, given how many codes have
/// already been sent in this window.
pub fn backoff(resend_count: u32) -> Duration {
    match resend_count {
        0 => Duration::from_secs(30),
        1 => Duration::from_secs(60),
        _ => Duration::from_secs(120),
    }
}

/// Resend bookkeeping for one email, stored as a single JSON record.
#[derive(Debug, Serialize, Deserialize, Default)]
struct ThrottleState {
    count: u32,
    window_start: i64,
}

pub(crate) fn code_key(email: &str) -> String {
    format!("login-code:{}", email)
}

pub(crate) fn gate_key(email: &str) -> String {
    format!("resend-gate:{}", email)
}

pub(crate) fn state_key(email: &str) -> String {
    format!("resend-state:{}", email)
}

pub(crate) fn verified_key(email: &str) -> String {
    format!("verified:{}", email)
}

#[derive(Clone)]
pub struct MagicLinkService {
    store: Arc<dyn KeyValueStore>,
    users: Arc<dyn UserDirectory>,
    mailer: Arc<dyn EmailSender>,
    frontend_base_url: String,
}

impl MagicLinkService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        users: Arc<dyn UserDirectory>,
        mailer: Arc<dyn EmailSender>,
        frontend_base_url: String,
    ) -> Self {
        Self {
            store,
            users,
            mailer,
            frontend_base_url,
        }
    }

    /// Start a signup: the email must not belong to an existing user, must
    /// not have an outstanding code, and must not already be verified.
    pub async fn sign_up(&self, email: &str) -> Result<(), AppError> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::Credential(CredentialError::EmailAlreadyExists));
        }

        if self.store.get(&code_key(email)).await?.is_some() {
            return Err(AppError::Credential(CredentialError::TooManyRequests));
        }

        if self.store.get(&verified_key(email)).await?.is_some() {
            return Err(AppError::Credential(CredentialError::EmailAlreadyVerified));
        }

        self.send_magic_link(email).await
    }

    /// Generate and email a fresh login code.
    ///
    /// The resend gate is claimed atomically before anything else: if it
    /// is already held, the caller is throttled and no state changes.
    /// Exactly one outbound email per successful call.
    pub async fn send_magic_link(&self, email: &str) -> Result<(), AppError> {
        let state = self.read_throttle_state(email).await?;

        let claimed = self
            .store
            .set_nx_with_ttl(&gate_key(email), email, backoff(state.count))
            .await?;
        if !claimed {
            tracing::warn!(email = %email, "Resend requested while gate is live");
            return Err(AppError::Credential(CredentialError::TooManyRequests));
        }

        let code = generate_code();
        self.store
            .set_with_ttl(&code_key(email), &code, CODE_TTL)
            .await?;

        let next_state = ThrottleState {
            count: state.count + 1,
            window_start: chrono::Utc::now().timestamp(),
        };
        let serialized = serde_json::to_string(&next_state)
            .map_err(|e| AppError::Internal(format!("Throttle state encoding failed: {}", e)))?;
        self.store
            .set_with_ttl(&state_key(email), &serialized, RESEND_STATE_TTL)
            .await?;

        let link = format!(
            "{}/auth/verify?email={}&token={}",
            self.frontend_base_url,
            urlencoding::encode(email),
            code
        );
        self.mailer.send_magic_link(email, &link).await?;

        tracing::info!(email = %email, resend_count = next_state.count, "Magic link sent");
        Ok(())
    }

    /// Alias invoked by the "resend code" UI action; same backoff policy.
    pub async fn resend_magic_link(&self, email: &str) -> Result<(), AppError> {
        self.send_magic_link(email).await
    }

    /// Check a submitted code.
    ///
    /// A missing entry (expired or never issued) fails outright. A
    /// mismatch fails and leaves the stored code valid until its own TTL.
    /// A match consumes the code plus all throttle state; for signups it
    /// writes the verified-email marker, for sign-ins it additionally
    /// requires an existing user record.
    pub async fn verify_magic_link(
        &self,
        email: &str,
        token: &str,
        is_sign_up: bool,
    ) -> Result<bool, AppError> {
        let stored = self
            .store
            .get(&code_key(email))
            .await?
            .ok_or(AppError::Credential(CredentialError::InvalidToken))?;

        if !constant_time_eq(&stored, token) {
            tracing::warn!(email = %email, "Magic link code mismatch");
            return Err(AppError::Credential(CredentialError::InvalidToken));
        }

        // Single-use: the code and its throttle state go away together.
        self.store.delete(&code_key(email)).await?;
        self.store.delete(&gate_key(email)).await?;
        self.store.delete(&state_key(email)).await?;

        if is_sign_up {
            self.store
                .set_with_ttl(&verified_key(email), VERIFIED_MARKER_VALUE, VERIFIED_MARKER_TTL)
                .await?;
            tracing::info!(email = %email, "Signup email verified");
        } else if self.users.find_by_email(email).await?.is_none() {
            tracing::warn!(email = %email, "Sign-in verification for unknown user");
            return Err(AppError::Credential(CredentialError::InvalidToken));
        }

        Ok(true)
    }

    /// Whether the verified-email marker is live for this address.
    pub async fn is_email_verified(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.store.get(&verified_key(email)).await?.is_some())
    }

    async fn read_throttle_state(&self, email: &str) -> Result<ThrottleState, AppError> {
        match self.store.get(&state_key(email)).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::Internal(format!("Throttle state decoding failed: {}", e))
            }),
            None => Ok(ThrottleState::default()),
        }
    }
}
