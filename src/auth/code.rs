/// Random code generation and one-way digests.
///
/// Codes ride in URL query parameters, so they are plain alphanumeric.
/// Anything that must be stored but never recovered (refresh tokens,
/// invite codes) is stored as a SHA-256 hex digest and compared in
/// constant time.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const CODE_LENGTH: usize = 32;

/// Generate a cryptographically unpredictable alphanumeric code.
pub fn generate_code() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// SHA-256 digest, lowercase hex.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Comparison that does not leak a match prefix through timing.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_alphanumeric_and_fixed_length() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn codes_do_not_repeat() {
        let a = generate_code();
        let b = generate_code();
        assert_ne!(a, b);
    }

    #[test]
    fn hashing_is_deterministic_and_hex() {
        let code = generate_code();
        let h1 = hash_token(&code);
        let h2 = hash_token(&code);
        assert_eq!(h1, h2);
        assert_ne!(h1, code);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn constant_time_eq_matches_equality() {
        assert!(constant_time_eq("abc123", "abc123"));
        assert!(!constant_time_eq("abc123", "abc124"));
        assert!(!constant_time_eq("abc123", "abc1234"));
    }
}
