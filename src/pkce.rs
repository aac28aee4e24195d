use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Shortest verifier RFC 7636 allows.
pub const MIN_VERIFIER_LEN: usize = 43;
/// Longest verifier RFC 7636 allows.
pub const MAX_VERIFIER_LEN: usize = 128;
pub const DEFAULT_VERIFIER_LEN: usize = MAX_VERIFIER_LEN;

/// RFC 7636 `unreserved` characters.
const UNRESERVED: &[u8; 66] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

// Largest multiple of 66 that fits in a byte; bytes at or above it are redrawn.
const ACCEPT_BELOW: u8 = (256 / UNRESERVED.len() * UNRESERVED.len()) as u8;

/// PKCE code verifier. Single-use secret; `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The S256 challenge derived from this verifier.
    #[must_use]
    pub fn challenge(&self) -> String {
        generate_code_challenge(&self.0)
    }

    pub(crate) fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for CodeVerifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CodeVerifier(<redacted>)")
    }
}

/// A fresh verifier together with its S256 challenge.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PkcePair {
    pub verifier: CodeVerifier,
    pub challenge: String,
}

/// Generates a verifier of exactly `length` unreserved characters and its challenge.
///
/// Randomness comes from the operating system CSPRNG. Rejection sampling keeps
/// every character equally likely.
///
/// # Errors
///
/// Returns [`Error::InvalidVerifierLength`] if `length` is outside `43..=128`, or
/// [`Error::EntropySourceUnavailable`] if the OS randomness source fails.
pub fn generate(length: usize) -> Result<PkcePair, Error> {
    if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&length) {
        return Err(Error::InvalidVerifierLength(length));
    }

    let mut verifier = String::with_capacity(length);
    let mut buf = [0u8; 2 * MAX_VERIFIER_LEN];
    while verifier.len() < length {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| Error::EntropySourceUnavailable(e.to_string()))?;
        for byte in buf.iter().copied().filter(|b| *b < ACCEPT_BELOW) {
            verifier.push(char::from(UNRESERVED[usize::from(byte) % UNRESERVED.len()]));
            if verifier.len() == length {
                break;
            }
        }
    }

    let verifier = CodeVerifier(verifier);
    let challenge = verifier.challenge();
    Ok(PkcePair {
        verifier,
        challenge,
    })
}

/// Computes the S256 code challenge from a code verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Random OAuth `state` value binding a callback to the browser that started the login.
///
/// # Errors
///
/// Returns [`Error::EntropySourceUnavailable`] if the OS randomness source fails.
pub fn generate_state() -> Result<String, Error> {
    let mut random_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut random_bytes)
        .map_err(|e| Error::EntropySourceUnavailable(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(random_bytes))
}

/// Whether `c` may appear in a verifier.
#[must_use]
pub fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_length_exact_for_all_valid_lengths() {
        for len in MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN {
            let pair = generate(len).unwrap();
            assert_eq!(pair.verifier.as_str().len(), len);
        }
    }

    #[test]
    fn test_verifier_unreserved_charset() {
        let pair = generate(DEFAULT_VERIFIER_LEN).unwrap();
        assert!(
            pair.verifier.as_str().chars().all(is_unreserved),
            "verifier should only use unreserved characters: {}",
            pair.verifier.as_str()
        );
    }

    #[test]
    fn test_verifier_length_out_of_range() {
        assert!(matches!(generate(42), Err(Error::InvalidVerifierLength(42))));
        assert!(matches!(generate(129), Err(Error::InvalidVerifierLength(129))));
        assert!(matches!(generate(0), Err(Error::InvalidVerifierLength(0))));
    }

    #[test]
    fn test_state_length() {
        assert_eq!(generate_state().unwrap().len(), 22);
    }

    #[test]
    fn test_state_uniqueness() {
        assert_ne!(generate_state().unwrap(), generate_state().unwrap());
    }

    #[test]
    fn test_verifier_uniqueness() {
        let v1 = generate(DEFAULT_VERIFIER_LEN).unwrap();
        let v2 = generate(DEFAULT_VERIFIER_LEN).unwrap();
        assert_ne!(v1.verifier, v2.verifier, "verifiers should be unique");
    }

    #[test]
    fn test_challenge_matches_verifier() {
        let pair = generate(64).unwrap();
        assert_eq!(pair.challenge, generate_code_challenge(pair.verifier.as_str()));
        // 32-byte digest -> 43 base64url chars, no padding
        assert_eq!(pair.challenge.len(), 43);
        assert!(!pair.challenge.contains('='));
    }

    #[test]
    fn test_code_challenge_deterministic() {
        let verifier = "test_verifier_string";
        let c1 = generate_code_challenge(verifier);
        let c2 = generate_code_challenge(verifier);
        assert_eq!(c1, c2, "challenge should be deterministic");
    }

    #[test]
    fn test_code_challenge_changes_with_one_character() {
        let verifier = "a".repeat(DEFAULT_VERIFIER_LEN);
        let mut changed = verifier.clone();
        changed.replace_range(64..65, "b");
        assert_ne!(
            generate_code_challenge(&verifier),
            generate_code_challenge(&changed)
        );
    }

    #[test]
    fn test_code_challenge_rfc7636_vector() {
        // RFC 7636 Appendix B
        assert_eq!(
            generate_code_challenge("dBjjJOTrTcwVEcGxRkdGWKBc7I5S1hQAxf3gAoRrVIK"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1zVj5uJpcx3NLaZHI"
        );
    }

    #[test]
    fn test_debug_redacts_verifier() {
        let pair = generate(MIN_VERIFIER_LEN).unwrap();
        let printed = format!("{pair:?}");
        assert!(!printed.contains(pair.verifier.as_str()));
    }
}
