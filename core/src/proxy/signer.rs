//! Request signing (secp256k1 ECDSA over SHA-256)
//!
//! Signed message layout, byte for byte:
//!
//! ```text
//! payload_bytes || decimal(timestamp_ns) || utf8(counterparty_address)
//! ```
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization, so each message has exactly one valid encoding
//! - Output is base64 of the 64-byte `r || s` (big-endian) form

use base64::{engine::general_purpose::STANDARD, Engine as _};
use k256::ecdsa::{signature::DigestSigner, Signature, SigningKey};
use sha2::{Digest, Sha256};

use crate::error::ConfigError;

/// Per-request signed payload. Never reused across requests.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    pub payload: Vec<u8>,
    pub timestamp_ns: i64,
    pub signature: String,
}

pub struct RequestSigner {
    signing_key: SigningKey,
}

impl RequestSigner {
    /// Parse a 32-byte secret scalar from hex (optional `0x` prefix).
    pub fn from_hex(private_key: &str) -> Result<Self, ConfigError> {
        let trimmed = private_key.trim();
        let hex_key = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(hex_key)
            .map_err(|e| ConfigError::InvalidPrivateKey(format!("not valid hex ({})", e)))?;
        if bytes.len() != 32 {
            return Err(ConfigError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }

        let signing_key = SigningKey::from_slice(&bytes).map_err(|_| {
            ConfigError::InvalidPrivateKey("scalar is zero or exceeds the curve order".to_string())
        })?;
        Ok(Self { signing_key })
    }

    /// Canonical bytes covered by the signature.
    pub fn canonical_message(payload: &[u8], timestamp_ns: i64, counterparty: &str) -> Vec<u8> {
        let timestamp = timestamp_ns.to_string();
        let mut message = Vec::with_capacity(payload.len() + timestamp.len() + counterparty.len());
        message.extend_from_slice(payload);
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(counterparty.as_bytes());
        message
    }

    pub fn sign(&self, payload: &[u8], timestamp_ns: i64, counterparty: &str) -> String {
        let message = Self::canonical_message(payload, timestamp_ns, counterparty);
        let signature: Signature = self
            .signing_key
            .sign_digest(Sha256::new_with_prefix(&message));
        let signature = signature.normalize_s().unwrap_or(signature);
        STANDARD.encode(signature.to_bytes())
    }

    /// Build a fresh envelope; the timestamp is read exactly once.
    pub fn seal(&self, payload: Vec<u8>, timestamp_ns: i64, counterparty: &str) -> SignedEnvelope {
        let signature = self.sign(&payload, timestamp_ns, counterparty);
        SignedEnvelope {
            payload,
            timestamp_ns,
            signature,
        }
    }

    /// Compressed SEC1 public key, hex encoded.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key().to_sec1_bytes())
    }

    pub fn verifying_key(&self) -> &k256::ecdsa::VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}
