/// Boundary to the reviewer/article domain.
///
/// The credential core only needs one operation from it: record an
/// accept/decline outcome and report the resulting statuses. Everything
/// else about articles and reviewers lives in the main application.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept,
    Decline,
}

impl ReviewDecision {
    fn reviewer_status(self) -> &'static str {
        match self {
            ReviewDecision::Accept => "accepted",
            ReviewDecision::Decline => "declined",
        }
    }

    fn article_status(self) -> &'static str {
        match self {
            ReviewDecision::Accept => "in_review",
            ReviewDecision::Decline => "awaiting_reviewers",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub article_id: Uuid,
    pub article_status: String,
    pub reviewer_status: String,
}

#[async_trait]
pub trait ReviewerRegistry: Send + Sync {
    async fn apply_decision(
        &self,
        email: &str,
        article_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<DecisionOutcome, AppError>;
}

/// Postgres-backed registry over the platform's reviewer tables.
pub struct PgReviewerRegistry {
    pool: PgPool,
}

impl PgReviewerRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewerRegistry for PgReviewerRegistry {
    async fn apply_decision(
        &self,
        email: &str,
        article_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<DecisionOutcome, AppError> {
        sqlx::query(
            r#"
            INSERT INTO article_reviewers (article_id, email, status, decided_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (article_id, email)
            DO UPDATE SET status = $3, decided_at = NOW()
            "#,
        )
        .bind(article_id)
        .bind(email)
        .bind(decision.reviewer_status())
        .execute(&self.pool)
        .await?;

        let article_status = sqlx::query_scalar::<_, String>(
            "UPDATE articles SET status = $1 WHERE id = $2 RETURNING status",
        )
        .bind(decision.article_status())
        .bind(article_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DecisionOutcome {
            article_id,
            article_status,
            reviewer_status: decision.reviewer_status().to_string(),
        })
    }
}

/// In-memory registry for tests and local development.
#[derive(Default)]
pub struct InMemoryReviewerRegistry {
    decisions: RwLock<HashMap<(Uuid, String), ReviewDecision>>,
}

impl InMemoryReviewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decision_for(&self, article_id: Uuid, email: &str) -> Option<ReviewDecision> {
        self.decisions
            .read()
            .unwrap()
            .get(&(article_id, email.to_string()))
            .copied()
    }
}

#[async_trait]
impl ReviewerRegistry for InMemoryReviewerRegistry {
    async fn apply_decision(
        &self,
        email: &str,
        article_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<DecisionOutcome, AppError> {
        self.decisions
            .write()
            .unwrap()
            .insert((article_id, email.to_string()), decision);

        Ok(DecisionOutcome {
            article_id,
            article_status: decision.article_status().to_string(),
            reviewer_status: decision.reviewer_status().to_string(),
        })
    }
}
