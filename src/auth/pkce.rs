//! PKCE verifier and challenge generation (RFC 7636, S256 only).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random code verifier.
///
/// 48 random bytes encode to a 64-character URL-safe string, inside the
/// RFC's 43-128 character window.
pub fn generate_code_verifier() -> String {
    let mut random_bytes = [0u8; 48];
    rand::thread_rng().fill(&mut random_bytes[..]);
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Compute the S256 code challenge: `BASE64URL(SHA256(verifier))`.
pub fn code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_length_and_charset() {
        let verifier = generate_code_verifier();
        assert_eq!(verifier.len(), 64);
        assert!(verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_verifiers_are_unique() {
        assert_ne!(generate_code_verifier(), generate_code_verifier());
    }

    #[test]
    fn test_challenge_is_deterministic() {
        assert_eq!(code_challenge("some-verifier"), code_challenge("some-verifier"));
        assert_ne!(code_challenge("verifier-1"), code_challenge("verifier-2"));
    }
}
