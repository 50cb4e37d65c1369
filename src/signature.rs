//! Signature engine capability and signature value types.
//!
//! The engine performs ECDSA sign/verify given a key handle, a declared
//! algorithm, and message bytes. Signing routes through the key store's
//! private key handle; verification needs only the exported public key.
//!
//! # Falsification Claims
//!
//! - F020: Public keys are SEC1 uncompressed P-256 points (65 bytes)
//! - F021: Signatures are DER-encoded and length-plausible for P-256
//! - F022: Verify returns false for a wrong signature, never an error
//! - F023: Verify errors distinctly for malformed signature bytes

use crate::error::{Error, Result};
use crate::key_store::KeyPairHandle;
use std::fmt;

/// Signature algorithm identifier.
///
/// Fixed to SHA-256 over ECDSA P-256, the JCA `"SHA256withECDSA"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureAlgorithm {
    /// ECDSA over P-256 with SHA-256 message digest.
    #[default]
    Sha256WithEcdsa,
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256WithEcdsa => write!(f, "SHA256withECDSA"),
        }
    }
}

/// Exported public key from a stored key pair.
///
/// SEC1 uncompressed point format: `04 || X (32 bytes) || Y (32 bytes)`.
/// Can be shipped to other systems for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Create a public key from raw SEC1 bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the bytes are not a 65-byte uncompressed
    /// P-256 point.
    pub fn from_sec1_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != 65 {
            return Err(Error::invalid_input(format!(
                "invalid P-256 public key length: {} (expected 65)",
                bytes.len()
            )));
        }
        if bytes[0] != 0x04 {
            return Err(Error::invalid_input(
                "public key must be in uncompressed point format (0x04 prefix)",
            ));
        }
        Ok(Self { bytes })
    }

    /// Get the raw SEC1 bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the X coordinate of the public key point.
    #[must_use]
    pub fn x(&self) -> &[u8] {
        &self.bytes[1..33]
    }

    /// Get the Y coordinate of the public key point.
    #[must_use]
    pub fn y(&self) -> &[u8] {
        &self.bytes[33..65]
    }

    /// Hex rendering for display layers.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// A DER-encoded ECDSA signature over some message.
///
/// Valid only in combination with the exact message bytes and public key
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureValue {
    bytes: Vec<u8>,
}

impl SignatureValue {
    /// Create a signature value from raw DER bytes.
    ///
    /// Only framing is checked here; full DER decoding happens inside the
    /// engine at verification time.
    ///
    /// # Errors
    ///
    /// Returns `SignatureDecode` if the bytes cannot be a DER-encoded
    /// P-256 ECDSA signature.
    pub fn from_der(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::signature_decode("signature cannot be empty"));
        }
        // DER SEQUENCE of two INTEGERs; 0x30 tag, 8..=72 bytes for P-256
        if bytes[0] != 0x30 {
            return Err(Error::signature_decode(
                "signature does not start with a DER SEQUENCE tag",
            ));
        }
        if bytes.len() < 8 || bytes.len() > 72 {
            return Err(Error::signature_decode(format!(
                "invalid P-256 signature length: {} (expected 8-72)",
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    /// Get the raw DER bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the signature length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the signature is empty (always false for constructed values).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex rendering for display layers.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// Platform signature engine capability.
///
/// Mirrors the shape of a platform signature service: sign through a
/// handle, verify against exported public key bytes.
pub trait SignatureEngine {
    /// Sign `message` with the private key referenced by `handle`.
    ///
    /// The message is digested per `algorithm` inside the engine; callers
    /// pass raw message bytes.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` when the handle's alias no longer exists, and
    /// `Signing` on engine faults or an unsupported algorithm.
    fn sign(
        &self,
        handle: &KeyPairHandle,
        algorithm: SignatureAlgorithm,
        message: &[u8],
    ) -> Result<SignatureValue>;

    /// Verify `signature` over `message` against `public_key`.
    ///
    /// Returns `Ok(false)` for a well-formed but cryptographically wrong
    /// signature. This operation has no side effects.
    ///
    /// # Errors
    ///
    /// Returns `SignatureDecode` when the signature bytes are not valid
    /// DER, and `InvalidInput` when the public key cannot be parsed.
    fn verify(
        &self,
        public_key: &PublicKey,
        algorithm: SignatureAlgorithm,
        message: &[u8],
        signature: &SignatureValue,
    ) -> Result<bool>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_point() -> Vec<u8> {
        let mut bytes = vec![0x04];
        bytes.extend_from_slice(&[0xAB; 32]);
        bytes.extend_from_slice(&[0xCD; 32]);
        bytes
    }

    // F020: Public keys are SEC1 uncompressed P-256 points
    #[test]
    fn test_public_key_structure() {
        let pk = PublicKey::from_sec1_bytes(sample_point()).unwrap();
        assert_eq!(pk.as_bytes().len(), 65);
        assert_eq!(pk.x(), &[0xAB; 32]);
        assert_eq!(pk.y(), &[0xCD; 32]);
    }

    #[test]
    fn test_public_key_invalid_length() {
        let result = PublicKey::from_sec1_bytes(vec![0x04; 33]);
        assert!(result.is_err());
    }

    #[test]
    fn test_public_key_compressed_rejected() {
        let mut bytes = vec![0x02];
        bytes.extend_from_slice(&[0x00; 64]);
        assert!(PublicKey::from_sec1_bytes(bytes).is_err());
    }

    #[test]
    fn test_public_key_hex() {
        let pk = PublicKey::from_sec1_bytes(sample_point()).unwrap();
        let hex = pk.to_hex();
        assert_eq!(hex.len(), 130);
        assert!(hex.starts_with("04abab"));
    }

    // F021: Signatures are DER-encoded and length-plausible
    #[test]
    fn test_signature_framing_validation() {
        // Missing SEQUENCE tag
        assert!(SignatureValue::from_der(vec![0x02; 70]).is_err());
        // Empty
        assert!(SignatureValue::from_der(vec![]).is_err());
        // Too long for P-256
        assert!(SignatureValue::from_der(vec![0x30; 100]).is_err());
        // Plausible
        let sig = SignatureValue::from_der(vec![0x30; 70]).unwrap();
        assert_eq!(sig.len(), 70);
        assert!(!sig.is_empty());
    }

    #[test]
    fn test_signature_hex() {
        let sig = SignatureValue::from_der(vec![0x30; 16]).unwrap();
        assert_eq!(sig.to_hex(), "30".repeat(16));
    }

    #[test]
    fn test_algorithm_display() {
        assert_eq!(
            SignatureAlgorithm::Sha256WithEcdsa.to_string(),
            "SHA256withECDSA"
        );
    }
}
