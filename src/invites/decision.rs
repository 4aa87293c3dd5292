/// Accept/decline handling for reviewer invitations.
///
/// The credential-validation part of the contract lives here: the invite
/// is resolved first, the authenticated caller's email must match the
/// invite's target (trimmed, case-insensitive), and the invite is
/// consumed exactly once before any reviewer/article state changes.

use std::sync::Arc;

use crate::error::{AppError, CredentialError};
use crate::invites::registry::{DecisionOutcome, ReviewDecision, ReviewerRegistry};
use crate::invites::service::InviteService;
use crate::validators::normalize_email;

#[derive(Clone)]
pub struct InviteDecisionService {
    invites: InviteService,
    registry: Arc<dyn ReviewerRegistry>,
}

impl InviteDecisionService {
    pub fn new(invites: InviteService, registry: Arc<dyn ReviewerRegistry>) -> Self {
        Self { invites, registry }
    }

    pub async fn decide(
        &self,
        raw_token: &str,
        caller_email: &str,
        decision: ReviewDecision,
    ) -> Result<DecisionOutcome, AppError> {
        // Read-only lookup first so a mismatched caller cannot burn the
        // invite.
        let invitation = self.invites.resolve(raw_token).await?;

        if normalize_email(caller_email) != normalize_email(&invitation.email) {
            tracing::warn!(
                article_id = %invitation.article_id,
                "Invite decision attempted by a non-matching identity"
            );
            return Err(AppError::Credential(CredentialError::AccessDenied));
        }

        let invitation = self.invites.consume(raw_token).await?;

        self.registry
            .apply_decision(&invitation.email, invitation.article_id, decision)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invites::registry::InMemoryReviewerRegistry;
    use crate::invites::store::InMemoryInviteStore;
    use uuid::Uuid;

    struct Fixture {
        invites: InviteService,
        registry: Arc<InMemoryReviewerRegistry>,
        service: InviteDecisionService,
    }

    fn fixture() -> Fixture {
        let invites = InviteService::new(Arc::new(InMemoryInviteStore::new()));
        let registry = Arc::new(InMemoryReviewerRegistry::new());
        let service = InviteDecisionService::new(invites.clone(), registry.clone());
        Fixture {
            invites,
            registry,
            service,
        }
    }

    #[tokio::test]
    async fn accept_consumes_the_invite_and_records_the_decision() {
        let f = fixture();
        let article_id = Uuid::new_v4();
        let raw = f
            .invites
            .create_invite("reviewer@y.com", article_id)
            .await
            .unwrap();

        let outcome = f
            .service
            .decide(&raw, "reviewer@y.com", ReviewDecision::Accept)
            .await
            .unwrap();

        assert_eq!(outcome.article_id, article_id);
        assert_eq!(outcome.reviewer_status, "accepted");
        assert_eq!(outcome.article_status, "in_review");
        assert_eq!(
            f.registry.decision_for(article_id, "reviewer@y.com"),
            Some(ReviewDecision::Accept)
        );

        // The invite is spent
        assert!(f.invites.resolve(&raw).await.is_err());
    }

    #[tokio::test]
    async fn decline_records_the_decision() {
        let f = fixture();
        let article_id = Uuid::new_v4();
        let raw = f
            .invites
            .create_invite("reviewer@y.com", article_id)
            .await
            .unwrap();

        let outcome = f
            .service
            .decide(&raw, "reviewer@y.com", ReviewDecision::Decline)
            .await
            .unwrap();

        assert_eq!(outcome.reviewer_status, "declined");
        assert_eq!(outcome.article_status, "awaiting_reviewers");
    }

    #[tokio::test]
    async fn caller_email_comparison_ignores_case_and_whitespace() {
        let f = fixture();
        let raw = f
            .invites
            .create_invite("reviewer@y.com", Uuid::new_v4())
            .await
            .unwrap();

        assert!(f
            .service
            .decide(&raw, "  Reviewer@Y.COM ", ReviewDecision::Accept)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn mismatched_caller_is_denied_and_invite_survives() {
        let f = fixture();
        let raw = f
            .invites
            .create_invite("reviewer@y.com", Uuid::new_v4())
            .await
            .unwrap();

        let result = f
            .service
            .decide(&raw, "intruder@z.com", ReviewDecision::Accept)
            .await;
        match result {
            Err(AppError::Credential(CredentialError::AccessDenied)) => {}
            other => panic!("expected AccessDenied, got {:?}", other.map(|_| ())),
        }

        // The invite was not consumed and still resolves
        assert!(f.invites.resolve(&raw).await.is_ok());
    }

    #[tokio::test]
    async fn second_decision_on_the_same_invite_fails() {
        let f = fixture();
        let raw = f
            .invites
            .create_invite("reviewer@y.com", Uuid::new_v4())
            .await
            .unwrap();

        f.service
            .decide(&raw, "reviewer@y.com", ReviewDecision::Accept)
            .await
            .unwrap();

        let result = f
            .service
            .decide(&raw, "reviewer@y.com", ReviewDecision::Decline)
            .await;
        match result {
            Err(AppError::Credential(CredentialError::InvalidToken)) => {}
            other => panic!("expected InvalidToken, got {:?}", other.map(|_| ())),
        }
    }
}
