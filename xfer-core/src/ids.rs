//! Identifier and secret newtypes.
//!
//! Mirrors the `BlobId`/`UploadId` newtype-over-random-bytes pattern this
//! workspace uses elsewhere, but with the hex encodings and byte widths the
//! coordinator's wire format calls for rather than UUIDs.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Opaque 16-hex-character file identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn generate() -> Self {
        Self(random_hex(8))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// 20-hex-character owner capability token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerToken(String);

impl OwnerToken {
    pub fn generate() -> Self {
        Self(random_hex(10))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a client-supplied token.
    pub fn verify(&self, candidate: &str) -> bool {
        use subtle::ConstantTimeEq;
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl From<String> for OwnerToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// 128-bit random challenge nonce, base64-encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    pub fn generate() -> Self {
        use base64::Engine;
        let mut buf = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut buf);
        Self(base64::engine::general_purpose::STANDARD.encode(buf))
    }

    pub fn as_b64(&self) -> &str {
        &self.0
    }
}

impl From<String> for Nonce {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_is_sixteen_hex_chars() {
        let id = FileId::generate();
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn owner_token_is_twenty_hex_chars() {
        let tok = OwnerToken::generate();
        assert_eq!(tok.as_str().len(), 20);
    }

    #[test]
    fn owner_token_verify_is_exact() {
        let tok = OwnerToken::from("abc123".to_string());
        assert!(tok.verify("abc123"));
        assert!(!tok.verify("abc124"));
        assert!(!tok.verify("abc12"));
    }

    #[test]
    fn two_nonces_differ() {
        assert_ne!(Nonce::generate().as_b64(), Nonce::generate().as_b64());
    }
}
