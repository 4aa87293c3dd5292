/// JWT claim sets (RFC 7519).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, CredentialError};

/// Claims carried by stateless access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Role names granted to the subject
    pub roles: Vec<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token id
    pub jti: String,
}

impl AccessClaims {
    pub fn new(user_id: Uuid, roles: Vec<String>, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            roles,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Credential(CredentialError::InvalidToken))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Claims carried by refresh tokens. The `typ` marker keeps a refresh
/// token from ever passing as an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
    pub typ: String,
}

pub const REFRESH_TOKEN_TYPE: &str = "refresh";

impl RefreshClaims {
    pub fn new(user_id: Uuid, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
            typ: REFRESH_TOKEN_TYPE.to_string(),
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Credential(CredentialError::InvalidToken))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_claims_carry_subject_and_roles() {
        let user_id = Uuid::new_v4();
        let claims = AccessClaims::new(
            user_id,
            vec!["reviewer".to_string()],
            900,
            "peergate".to_string(),
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert!(claims.has_role("reviewer"));
        assert!(!claims.has_role("editor"));
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn every_token_gets_a_fresh_jti() {
        let user_id = Uuid::new_v4();
        let a = AccessClaims::new(user_id, vec![], 900, "peergate".to_string());
        let b = AccessClaims::new(user_id, vec![], 900, "peergate".to_string());
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn refresh_claims_are_typed() {
        let claims = RefreshClaims::new(Uuid::new_v4(), 1_209_600, "peergate".to_string());
        assert_eq!(claims.typ, REFRESH_TOKEN_TYPE);
    }

    #[test]
    fn garbage_subject_is_rejected() {
        let mut claims = AccessClaims::new(Uuid::new_v4(), vec![], 900, "peergate".to_string());
        claims.sub = "not-a-uuid".to_string();
        assert!(claims.user_id().is_err());
    }
}
