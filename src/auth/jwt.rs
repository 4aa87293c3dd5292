/// JWT signing and validation.
///
/// Access tokens are fully stateless: validity is signature, issuer and
/// expiry, nothing else. Refresh tokens are additionally checked against
/// the stored session hash by the token service.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims, REFRESH_TOKEN_TYPE};
use crate::configuration::JwtSettings;
use crate::error::{AppError, CredentialError};

/// Sign a new access token. Returns the token and its expiry instant.
pub fn create_access_token(
    user_id: Uuid,
    roles: Vec<String>,
    config: &JwtSettings,
) -> Result<(String, DateTime<Utc>), AppError> {
    let claims = AccessClaims::new(
        user_id,
        roles,
        config.access_token_expiry,
        config.issuer.clone(),
    );
    let expires_at = timestamp_to_datetime(claims.exp)?;

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

    Ok((token, expires_at))
}

/// Sign a new refresh token. Returns the token and its expiry instant.
pub fn create_refresh_token(
    user_id: Uuid,
    config: &JwtSettings,
) -> Result<(String, DateTime<Utc>), AppError> {
    let claims = RefreshClaims::new(user_id, config.refresh_token_expiry, config.issuer.clone());
    let expires_at = timestamp_to_datetime(claims.exp)?;

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

    Ok((token, expires_at))
}

/// Validate an access token: signature, issuer and expiry only. No store
/// lookup.
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<AccessClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("Access token validation error: {}", e);
        AppError::Credential(CredentialError::InvalidToken)
    })
}

/// Decode a refresh token's claims: signature, issuer, expiry and the
/// `typ=refresh` marker. Hash equality against the stored session is the
/// token service's job.
pub fn decode_refresh_token(token: &str, config: &JwtSettings) -> Result<RefreshClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    let claims = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("Refresh token validation error: {}", e);
        AppError::Credential(CredentialError::InvalidToken)
    })?;

    if claims.typ != REFRESH_TOKEN_TYPE {
        tracing::warn!("Token presented as refresh has typ={}", claims.typ);
        return Err(AppError::Credential(CredentialError::InvalidToken));
    }

    Ok(claims)
}

fn timestamp_to_datetime(ts: i64) -> Result<DateTime<Utc>, AppError> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .ok_or_else(|| AppError::Internal("Invalid token expiry timestamp".to_string()))
}
