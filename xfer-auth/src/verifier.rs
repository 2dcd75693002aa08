//! HMAC challenge-response verification (`send-v1`).
//!
//! The verifier never caches a nonce itself: it reads the record's current
//! `auth`/`nonce` fields from the metadata store, checks the signature in
//! constant time, and unconditionally rotates the nonce before returning —
//! both the accept and reject paths carry the next challenge.

use std::sync::Arc;

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use xfer_core::{FileId, Nonce};
use xfer_meta::FieldStore;

type HmacSha256 = Hmac<Sha256>;

const FIELD_AUTH: &str = "auth";
const FIELD_NONCE: &str = "nonce";

/// Sentinel written to the `auth` field for files that don't require auth.
pub const UNENCRYPTED_SENTINEL: &str = "unencrypted";

pub struct AuthVerifier {
    store: Arc<dyn FieldStore>,
}

/// Outcome of a successful challenge check: the caller must surface
/// `next_nonce` via `WWW-Authenticate: send-v1 <next_nonce>` on its response,
/// win or lose, so the client always has a fresh challenge to sign next time.
pub struct Verified {
    pub next_nonce: Nonce,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("file not found")]
    NotFound,
    #[error("missing or invalid Authorization header")]
    BadSignature { next_nonce: Nonce },
    #[error("metadata backend unavailable")]
    Backend(#[from] xfer_meta::MetaError),
}

impl AuthVerifier {
    pub fn new(store: Arc<dyn FieldStore>) -> Self {
        Self { store }
    }

    /// Verifies `authorization_header` (the full `send-v1 <sig>` value) against
    /// the stored auth key and current nonce for `id`, then rotates the nonce.
    ///
    /// Returns `Ok` with the nonce to challenge with next on success; on
    /// failure returns `BadSignature` carrying that same next nonce, so the
    /// HTTP layer can attach it to the 401 response either way.
    pub async fn verify(
        &self,
        id: &FileId,
        authorization_header: Option<&str>,
    ) -> Result<Verified, VerifyError> {
        let fields = self.store.get_all(id.as_str()).await?;
        if fields.is_empty() {
            return Err(VerifyError::NotFound);
        }

        let stored_auth = fields.get(FIELD_AUTH).cloned().unwrap_or_default();
        let stored_nonce = fields.get(FIELD_NONCE).cloned().unwrap_or_default();

        let ok = authorization_header
            .and_then(|h| h.strip_prefix("send-v1 "))
            .map(|sig| verify_signature(&stored_auth, &stored_nonce, sig))
            .unwrap_or(false);

        let next_nonce = Nonce::generate();
        self.store
            .set_field(id.as_str(), FIELD_NONCE, next_nonce.as_b64())
            .await?;

        if ok {
            Ok(Verified { next_nonce })
        } else {
            Err(VerifyError::BadSignature { next_nonce })
        }
    }
}

fn verify_signature(auth_key_b64: &str, nonce_b64: &str, candidate_sig_b64: &str) -> bool {
    let Ok(key) = base64::engine::general_purpose::STANDARD.decode(auth_key_b64) else {
        return false;
    };
    let Ok(candidate) = decode_flexible(candidate_sig_b64) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };
    mac.update(nonce_b64.as_bytes());
    mac.verify_slice(&candidate).is_ok()
}

/// Accepts both standard and URL-safe base64, matching the flexibility the
/// handshake allows on the client-supplied signature.
fn decode_flexible(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeStore {
        records: Mutex<HashMap<String, HashMap<String, String>>>,
    }

    #[async_trait::async_trait]
    impl FieldStore for FakeStore {
        async fn set_field(&self, id: &str, field: &str, value: &str) -> xfer_meta::MetaResult<()> {
            self.records
                .lock()
                .unwrap()
                .entry(id.to_string())
                .or_default()
                .insert(field.to_string(), value.to_string());
            Ok(())
        }
        async fn get_field(&self, id: &str, field: &str) -> xfer_meta::MetaResult<Option<String>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(id)
                .and_then(|m| m.get(field).cloned()))
        }
        async fn get_all(&self, id: &str) -> xfer_meta::MetaResult<HashMap<String, String>> {
            Ok(self.records.lock().unwrap().get(id).cloned().unwrap_or_default())
        }
        async fn del_field(&self, id: &str, fields: &[&str]) -> xfer_meta::MetaResult<()> {
            if let Some(m) = self.records.lock().unwrap().get_mut(id) {
                for f in fields {
                    m.remove(*f);
                }
            }
            Ok(())
        }
        async fn incr(&self, _id: &str, _field: &str, _delta: i64) -> xfer_meta::MetaResult<i64> {
            unimplemented!()
        }
        async fn expire(&self, _id: &str, _seconds: u64) -> xfer_meta::MetaResult<()> {
            Ok(())
        }
        async fn ttl(&self, _id: &str) -> xfer_meta::MetaResult<Option<i64>> {
            Ok(None)
        }
        async fn exists(&self, id: &str) -> xfer_meta::MetaResult<bool> {
            Ok(self.records.lock().unwrap().contains_key(id))
        }
        async fn del(&self, id: &str) -> xfer_meta::MetaResult<()> {
            self.records.lock().unwrap().remove(id);
            Ok(())
        }
    }

    fn key_b64() -> String {
        base64::engine::general_purpose::STANDARD.encode([7u8; 32])
    }

    #[tokio::test]
    async fn accepts_correct_signature_and_rejects_replay() {
        let store = Arc::new(FakeStore {
            records: Mutex::new(HashMap::new()),
        });
        let id = FileId::from("0123456789abcdef".to_string());
        let auth_key = key_b64();
        store
            .set_fields(
                id.as_str(),
                &[("auth", &auth_key), ("nonce", "initialnonce")],
            )
            .await
            .unwrap();

        let verifier = AuthVerifier::new(store.clone());

        let mut mac = HmacSha256::new_from_slice(
            &base64::engine::general_purpose::STANDARD
                .decode(&auth_key)
                .unwrap(),
        )
        .unwrap();
        mac.update(b"initialnonce");
        let sig = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let header = format!("send-v1 {sig}");
        let result = verifier.verify(&id, Some(&header)).await;
        assert!(result.is_ok());

        // Replaying the same signature against the rotated nonce must fail.
        let replay = verifier.verify(&id, Some(&header)).await;
        assert!(matches!(replay, Err(VerifyError::BadSignature { .. })));
    }

    #[tokio::test]
    async fn missing_header_is_rejected_but_still_rotates_nonce() {
        let store = Arc::new(FakeStore {
            records: Mutex::new(HashMap::new()),
        });
        let id = FileId::from("fedcba9876543210".to_string());
        store
            .set_fields(id.as_str(), &[("auth", &key_b64()), ("nonce", "n0")])
            .await
            .unwrap();
        let verifier = AuthVerifier::new(store);

        let result = verifier.verify(&id, None).await;
        assert!(matches!(result, Err(VerifyError::BadSignature { .. })));
    }
}
