//! PKCE verifier/challenge pairs and random `state` / `nonce` values.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ChallengeMethod {
    #[strum(to_string = "S256")]
    S256,
    #[strum(to_string = "plain")]
    Plain,
}

/// A code verifier and the challenge derived from it.
///
/// The challenge goes into the authorize URL; the verifier is sent later
/// when the code is redeemed.
#[derive(Debug, Clone)]
pub struct PkcePair {
    verifier: SecretString,
    challenge: String,
    method: ChallengeMethod,
}

impl PkcePair {
    /// Fresh 32-byte verifier with an S256 challenge.
    pub fn generate() -> Self {
        Self::s256(URL_SAFE_NO_PAD.encode(random_bytes::<32>()))
    }

    pub fn s256(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier: SecretString::new(verifier),
            challenge,
            method: ChallengeMethod::S256,
        }
    }

    pub fn plain(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        Self {
            challenge: verifier.clone(),
            verifier: SecretString::new(verifier),
            method: ChallengeMethod::Plain,
        }
    }

    pub fn verifier(&self) -> &str {
        self.verifier.expose_secret()
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    pub fn method(&self) -> ChallengeMethod {
        self.method
    }
}

/// 32 hex characters for the `state` parameter.
pub fn random_state() -> String {
    hex_encode(&random_bytes::<16>())
}

/// 32 hex characters for the `nonce` parameter.
pub fn random_nonce() -> String {
    hex_encode(&random_bytes::<16>())
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    for chunk in buf.chunks_mut(16) {
        let id = uuid::Uuid::new_v4();
        let len = chunk.len();
        chunk.copy_from_slice(&id.as_bytes()[..len]);
    }
    buf
}

fn hex_encode(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s256_matches_rfc7636_example() {
        let pair = PkcePair::s256("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(pair.challenge(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
        assert_eq!(pair.method().to_string(), "S256");
    }

    #[test]
    fn generated_verifier_has_valid_length_and_alphabet() {
        let pair = PkcePair::generate();
        assert_eq!(pair.verifier().len(), 43);
        assert!(pair
            .verifier()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(pair.verifier(), PkcePair::generate().verifier());
    }

    #[test]
    fn plain_challenge_equals_verifier() {
        let pair = PkcePair::plain("abc");
        assert_eq!(pair.challenge(), "abc");
        assert_eq!(pair.method(), ChallengeMethod::Plain);
    }

    #[test]
    fn random_state_is_hex_and_unique() {
        let a = random_state();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, random_nonce());
    }
}
