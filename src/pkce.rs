//! PKCE (Proof Key for Code Exchange) helpers
//!
//! Implements the RFC 7636 pieces the authorization flow needs: a random code
//! verifier that stays on the client and the S256 challenge that is sent to
//! the authorization endpoint.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The only challenge method we send
pub const CHALLENGE_METHOD: &str = "S256";

/// Minimum verifier length allowed by RFC 7636
pub const MIN_VERIFIER_LEN: usize = 43;

/// Maximum verifier length allowed by RFC 7636
pub const MAX_VERIFIER_LEN: usize = 128;

/// Random bytes drawn per verifier (86 characters once base64url encoded)
const VERIFIER_ENTROPY_BYTES: usize = 64;

/// A PKCE code verifier
///
/// Only constructed through [`generate_verifier`] or [`CodeVerifier::parse`],
/// so every instance satisfies the RFC 7636 length and alphabet rules.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Validate a verifier read back from storage
    ///
    /// # Errors
    ///
    /// Returns an error if the value is outside 43-128 characters or contains
    /// characters outside the unreserved URL alphabet.
    pub fn parse(value: String) -> Result<Self, String> {
        if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&value.len()) {
            return Err(format!(
                "code verifier must be {MIN_VERIFIER_LEN}-{MAX_VERIFIER_LEN} characters, got {}",
                value.len()
            ));
        }
        if !value.bytes().all(is_unreserved) {
            return Err("code verifier contains characters outside [A-Za-z0-9-._~]".to_string());
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<String> for CodeVerifier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CodeVerifier> for String {
    fn from(verifier: CodeVerifier) -> Self {
        verifier.0
    }
}

// Verifiers are secrets; keep them out of debug output and logs.
impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeVerifier(<{} chars>)", self.0.len())
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

/// Generate a cryptographically secure code verifier
///
/// Draws 64 bytes from the thread-local CSPRNG (seeded from the OS) and
/// base64url-encodes them without padding.
#[must_use]
pub fn generate_verifier() -> CodeVerifier {
    let mut bytes = [0u8; VERIFIER_ENTROPY_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    CodeVerifier(URL_SAFE_NO_PAD.encode(bytes))
}

/// Derive the S256 code challenge: `BASE64URL(SHA256(verifier))`
#[must_use]
pub fn derive_challenge(verifier: &CodeVerifier) -> String {
    let digest = Sha256::digest(verifier.as_str().as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
