/// Reviewer invitation routes: creation (editor), resolution (public,
/// read-only) and the authenticated accept/decline decision.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AccessClaims;
use crate::configuration::ApplicationSettings;
use crate::directory::UserDirectory;
use crate::email_client::EmailSender;
use crate::error::{AppError, CredentialError};
use crate::invites::{InviteDecisionService, InviteService, ReviewDecision};
use crate::validators::is_valid_email;

const REVIEWER_ROLE: &str = "reviewer";
const EDITOR_ROLE: &str = "editor";

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    pub email: String,
    pub article_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    pub email: String,
    pub article_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub article_id: String,
    pub article_status: String,
    pub reviewer_status: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /reviewer-invites
///
/// Editors propose a reviewer for an article; the raw invite token is
/// emailed and never returned in the response.
pub async fn create_invite(
    claims: web::ReqData<AccessClaims>,
    form: web::Json<CreateInviteRequest>,
    invites: web::Data<InviteService>,
    mailer: web::Data<dyn EmailSender>,
    application: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    if !claims.has_role(EDITOR_ROLE) {
        return Err(AppError::Credential(CredentialError::AccessDenied));
    }

    let email = is_valid_email(&form.email)?;
    let raw_token = invites.create_invite(&email, form.article_id).await?;

    let link = format!(
        "{}/reviewer-invite?token={}",
        application.frontend_base_url, raw_token
    );
    mailer.send_reviewer_invite(&email, &link).await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Invitation sent".to_string(),
    }))
}

/// GET /reviewer-invites/resolve?token=...
///
/// Read-only preview of an invitation; safe to call on every page load
/// while the reviewer decides.
pub async fn resolve_invite(
    query: web::Query<TokenQuery>,
    invites: web::Data<InviteService>,
) -> Result<HttpResponse, AppError> {
    let invitation = invites.resolve(&query.token).await?;

    Ok(HttpResponse::Ok().json(InvitationResponse {
        email: invitation.email,
        article_id: invitation.article_id.to_string(),
    }))
}

/// POST /reviewer-invites/accept?token=...
pub async fn accept_invite(
    claims: web::ReqData<AccessClaims>,
    query: web::Query<TokenQuery>,
    decisions: web::Data<InviteDecisionService>,
    users: web::Data<dyn UserDirectory>,
) -> Result<HttpResponse, AppError> {
    decide(
        &claims,
        &query.token,
        ReviewDecision::Accept,
        &decisions,
        &users,
    )
    .await
}

/// POST /reviewer-invites/decline?token=...
pub async fn decline_invite(
    claims: web::ReqData<AccessClaims>,
    query: web::Query<TokenQuery>,
    decisions: web::Data<InviteDecisionService>,
    users: web::Data<dyn UserDirectory>,
) -> Result<HttpResponse, AppError> {
    decide(
        &claims,
        &query.token,
        ReviewDecision::Decline,
        &decisions,
        &users,
    )
    .await
}

async fn decide(
    claims: &AccessClaims,
    raw_token: &str,
    decision: ReviewDecision,
    decisions: &InviteDecisionService,
    users: &web::Data<dyn UserDirectory>,
) -> Result<HttpResponse, AppError> {
    if !claims.has_role(REVIEWER_ROLE) {
        return Err(AppError::Credential(CredentialError::AccessDenied));
    }

    // The caller's email comes from the directory, not from the client.
    let user_id = claims.user_id()?;
    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Credential(CredentialError::AccessDenied))?;

    let outcome = decisions.decide(raw_token, &user.email, decision).await?;

    Ok(HttpResponse::Ok().json(DecisionResponse {
        article_id: outcome.article_id.to_string(),
        article_status: outcome.article_status,
        reviewer_status: outcome.reviewer_status,
    }))
}
