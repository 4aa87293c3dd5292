/// Reviewer invitation tokens: creation, resolution, one-time
/// consumption, and the accept/decline decision flow built on top.

mod decision;
mod registry;
mod service;
mod store;

pub use decision::InviteDecisionService;
pub use registry::{
    DecisionOutcome, InMemoryReviewerRegistry, PgReviewerRegistry, ReviewDecision, ReviewerRegistry,
};
pub use service::{Invitation, InviteService};
pub use store::{InMemoryInviteStore, InviteRecord, InviteStore, PgInviteStore};
