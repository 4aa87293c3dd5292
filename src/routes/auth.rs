/// Authentication routes: passwordless signup/sign-in, code verification,
/// token refresh and sign-out.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{decode_refresh_token, AccessClaims, MagicLinkService, TokenPair, TokenService};
use crate::directory::UserDirectory;
use crate::error::{AppError, CredentialError};
use crate::validators::is_valid_email;

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub email: String,
    pub token: String,
    pub is_sign_up: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

impl TokenResponse {
    fn from_pair(pair: TokenPair, access_expiry: i64, refresh_expiry: i64) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: access_expiry,
            refresh_expires_in: refresh_expiry,
        }
    }
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenResponse>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /auth/signup
///
/// Starts a passwordless signup: sends a verification code unless the
/// email is taken, throttled, or already verified.
pub async fn signup(
    form: web::Json<EmailRequest>,
    magic_link: web::Data<MagicLinkService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    magic_link.sign_up(&email).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Verification code sent".to_string(),
    }))
}

/// POST /auth/signin
///
/// Sends a sign-in code. Whether the email belongs to a user is only
/// checked at verification time, so this endpoint does not reveal which
/// addresses are registered.
pub async fn signin(
    form: web::Json<EmailRequest>,
    magic_link: web::Data<MagicLinkService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    magic_link.send_magic_link(&email).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Verification code sent".to_string(),
    }))
}

/// POST /auth/resend-code
pub async fn resend_code(
    form: web::Json<EmailRequest>,
    magic_link: web::Data<MagicLinkService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    magic_link.resend_magic_link(&email).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Verification code sent".to_string(),
    }))
}

/// POST /auth/verify
///
/// Checks a submitted code. Successful sign-in verification additionally
/// issues an access/refresh pair; signup verification only marks the
/// email as verified (the account is created during profile completion).
pub async fn verify(
    form: web::Json<VerifyRequest>,
    magic_link: web::Data<MagicLinkService>,
    tokens: web::Data<TokenService>,
    users: web::Data<dyn UserDirectory>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;

    match magic_link
        .verify_magic_link(&email, &form.token, form.is_sign_up)
        .await
    {
        Ok(_) => {
            let issued = if form.is_sign_up {
                None
            } else {
                // verify_magic_link already required the user to exist
                let user = users
                    .find_by_email(&email)
                    .await?
                    .ok_or(AppError::Credential(CredentialError::InvalidToken))?;
                let pair = tokens.issue_tokens_for_user(user.id, user.roles).await?;
                let settings = tokens.jwt_settings();
                Some(TokenResponse::from_pair(
                    pair,
                    settings.access_token_expiry,
                    settings.refresh_token_expiry,
                ))
            };

            Ok(HttpResponse::Ok().json(VerifyResponse {
                success: true,
                message: "Token verified successfully".to_string(),
                tokens: issued,
            }))
        }
        Err(AppError::Credential(CredentialError::InvalidToken)) => {
            Ok(HttpResponse::Unauthorized().json(VerifyResponse {
                success: false,
                message: "Invalid token".to_string(),
                tokens: None,
            }))
        }
        Err(e) => Err(e),
    }
}

/// POST /auth/refresh
///
/// Exchanges a refresh token for a new pair. Presenting an
/// already-rotated token revokes the whole session.
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    tokens: web::Data<TokenService>,
    users: web::Data<dyn UserDirectory>,
) -> Result<HttpResponse, AppError> {
    let claims = decode_refresh_token(&form.refresh_token, tokens.jwt_settings())?;
    let user_id = claims.user_id()?;

    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Credential(CredentialError::RefreshTokenNotFound))?;

    let pair = tokens
        .refresh_tokens(user_id, &form.refresh_token, user.roles)
        .await?;

    let settings = tokens.jwt_settings();
    Ok(HttpResponse::Ok().json(TokenResponse::from_pair(
        pair,
        settings.access_token_expiry,
        settings.refresh_token_expiry,
    )))
}

/// POST /auth/signout
///
/// Revokes the caller's refresh session. Requires a valid access token.
pub async fn signout(
    claims: web::ReqData<AccessClaims>,
    tokens: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    tokens.revoke_refresh_for_user(user_id).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Signed out".to_string(),
    }))
}
