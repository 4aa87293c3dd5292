mod auth;
mod health_check;
mod reviewer_invites;

pub use auth::{refresh, resend_code, signin, signout, signup, verify};
pub use health_check::health_check;
pub use reviewer_invites::{accept_invite, create_invite, decline_invite, resolve_invite};
