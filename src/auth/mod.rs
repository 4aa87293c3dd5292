/// Credential issuance and validation: random codes and digests, JWT
/// access/refresh pairs, and the passwordless magic-link flow.

mod claims;
mod code;
mod jwt;
mod magic_link;
mod tokens;

pub use claims::{AccessClaims, RefreshClaims};
pub use code::{constant_time_eq, generate_code, hash_token};
pub use jwt::{create_access_token, create_refresh_token, decode_refresh_token, validate_access_token};
pub use magic_link::{backoff, MagicLinkService};
pub use tokens::{TokenPair, TokenService};
