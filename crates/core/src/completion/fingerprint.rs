//! Canonical request fingerprints used as response cache keys

use std::fmt;

use relay_domain::{ChatMessage, GenerationParams};
use sha2::{Digest, Sha256};

/// SHA-256 digest of a canonical request encoding
///
/// Messages are hashed in order; parameters are hashed as a key-sorted map,
/// so two requests with the same content and parameters share a key
/// regardless of how the caller built them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestFingerprint([u8; 32]);

impl RequestFingerprint {
    pub fn compute(model: &str, messages: &[ChatMessage], params: &GenerationParams) -> Self {
        let mut hasher = Sha256::new();

        write_field(&mut hasher, b"model");
        write_field(&mut hasher, model.as_bytes());

        hasher.update((messages.len() as u64).to_be_bytes());
        for message in messages {
            write_field(&mut hasher, message.role.as_str().as_bytes());
            write_field(&mut hasher, message.content.as_bytes());
        }

        let params = params.to_sorted_map();
        hasher.update((params.len() as u64).to_be_bytes());
        for (key, value) in &params {
            write_field(&mut hasher, key.as_bytes());
            write_field(&mut hasher, value.to_string().as_bytes());
        }

        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Length-prefixed so field boundaries cannot be shifted between fields.
fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}
