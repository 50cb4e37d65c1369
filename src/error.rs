//! Error types for Llavero.
//!
//! All errors implement `std::error::Error` and provide human-readable messages.
//! Variants mirror the workflow failure taxonomy: every platform fault is
//! caught at an operation boundary and surfaced as one of these, never as a
//! panic.
//!
//! # Falsification Claims
//! - F001: All errors implement std::error::Error
//! - F002: Error messages are human-readable
//! - F003: Missing-input failures are distinct from verification failures
//! - F004: Malformed signature bytes are distinct from wrong signatures

use crate::key_store::SecurityLevel;
use thiserror::Error;

/// Primary error type for Llavero operations.
///
/// Each variant provides sufficient context for debugging while remaining
/// actionable for programmatic error handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Key pair generation failed.
    ///
    /// Covers key store access failures, unsupported algorithms, and
    /// policy violations.
    #[error("key generation failed: {reason}")]
    KeyGeneration {
        /// Why the key store refused or failed.
        reason: String,
    },

    /// No key exists under the requested alias.
    ///
    /// Raised when signing or attesting without a prior generation, or
    /// after the alias was deleted out from under the handle.
    #[error("key not found: no entry under alias '{alias}'")]
    KeyNotFound {
        /// The alias that was looked up.
        alias: String,
    },

    /// The signature engine failed to produce a signature.
    #[error("signing failed: {reason}")]
    Signing {
        /// Engine-reported failure detail.
        reason: String,
    },

    /// A required input for verification was absent.
    ///
    /// This is a precondition failure, distinct from a verification
    /// returning `false`.
    #[error("missing input: {what}")]
    MissingInput {
        /// Which input was absent (e.g. "signature", "public key").
        what: String,
    },

    /// Signature bytes could not be decoded as a DER ECDSA signature.
    ///
    /// A structurally valid but cryptographically wrong signature never
    /// produces this error; verification returns `false` instead.
    #[error("malformed signature encoding: {reason}")]
    SignatureDecode {
        /// What was wrong with the encoding.
        reason: String,
    },

    /// Attestation chain retrieval failed or the chain was unusable.
    #[error("attestation failed: {reason}")]
    Attestation {
        /// Why the chain was rejected.
        reason: String,
    },

    /// A required security level cannot be met on this system.
    ///
    /// Only raised under [`HardwarePolicy::RequireStrongBox`]; the default
    /// policy falls back silently instead.
    ///
    /// [`HardwarePolicy::RequireStrongBox`]: crate::key_store::HardwarePolicy::RequireStrongBox
    #[error("security level not available: {level}")]
    NotAvailable {
        /// The level that was required but absent.
        level: SecurityLevel,
    },

    /// Invalid input was provided to an API.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Description of what was invalid.
        reason: String,
    },
}

/// Result type alias for Llavero operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new `KeyGeneration` error.
    #[must_use]
    pub fn key_generation(reason: impl Into<String>) -> Self {
        Self::KeyGeneration {
            reason: reason.into(),
        }
    }

    /// Create a new `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(alias: impl Into<String>) -> Self {
        Self::KeyNotFound {
            alias: alias.into(),
        }
    }

    /// Create a new `Signing` error.
    #[must_use]
    pub fn signing(reason: impl Into<String>) -> Self {
        Self::Signing {
            reason: reason.into(),
        }
    }

    /// Create a new `MissingInput` error.
    #[must_use]
    pub fn missing_input(what: impl Into<String>) -> Self {
        Self::MissingInput { what: what.into() }
    }

    /// Create a new `SignatureDecode` error.
    #[must_use]
    pub fn signature_decode(reason: impl Into<String>) -> Self {
        Self::SignatureDecode {
            reason: reason.into(),
        }
    }

    /// Create a new `Attestation` error.
    #[must_use]
    pub fn attestation(reason: impl Into<String>) -> Self {
        Self::Attestation {
            reason: reason.into(),
        }
    }

    /// Create a new `NotAvailable` error.
    #[must_use]
    pub const fn not_available(level: SecurityLevel) -> Self {
        Self::NotAvailable { level }
    }

    /// Create a new `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Check if this error indicates a missing key.
    #[must_use]
    pub const fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }

    /// Check if this error is a missing-input precondition failure.
    #[must_use]
    pub const fn is_missing_input(&self) -> bool {
        matches!(self, Self::MissingInput { .. })
    }

    /// Check if this error indicates malformed signature bytes.
    #[must_use]
    pub const fn is_signature_decode(&self) -> bool {
        matches!(self, Self::SignatureDecode { .. })
    }

    /// Check if this error indicates an unavailable security level.
    #[must_use]
    pub const fn is_not_available(&self) -> bool {
        matches!(self, Self::NotAvailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // F001: All errors implement std::error::Error
    #[test]
    fn test_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }

    // F002: Error messages are human-readable
    #[test]
    fn test_error_messages_are_readable() {
        let err = Error::key_not_found("my_ecdsa_key");
        let msg = err.to_string();
        assert!(msg.contains("my_ecdsa_key"));
        assert!(msg.contains("not found"));
    }

    // F003: Missing-input failures are distinct from verification failures
    #[test]
    fn test_missing_input_distinct() {
        let err = Error::missing_input("signature");
        assert!(err.is_missing_input());
        assert!(!err.is_signature_decode());
        assert!(err.to_string().contains("signature"));
    }

    // F004: Malformed signature bytes are distinct from wrong signatures
    #[test]
    fn test_signature_decode_distinct() {
        let err = Error::signature_decode("truncated DER sequence");
        assert!(err.is_signature_decode());
        assert!(!err.is_missing_input());
    }

    #[test]
    fn test_display_impl_not_generic() {
        let errors = vec![
            Error::key_generation("store unavailable"),
            Error::key_not_found("k1"),
            Error::signing("engine fault"),
            Error::missing_input("public key"),
            Error::signature_decode("bad tag"),
            Error::attestation("empty chain"),
            Error::not_available(SecurityLevel::StrongBox),
            Error::invalid_input("test"),
        ];

        for err in errors {
            let msg = err.to_string();
            assert!(msg.len() > 10, "Message too short: {msg}");
            assert!(!msg.eq_ignore_ascii_case("error"), "Generic message: {msg}");
        }
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::key_not_found("k").is_key_not_found());
        assert!(!Error::signing("x").is_key_not_found());

        assert!(Error::not_available(SecurityLevel::StrongBox).is_not_available());
        assert!(!Error::key_generation("x").is_not_available());
    }

    #[test]
    fn test_error_equality_and_clone() {
        let e1 = Error::key_not_found("k1");
        let e2 = e1.clone();
        let e3 = Error::key_not_found("k2");

        assert_eq!(e1, e2);
        assert_ne!(e1, e3);
    }

    #[test]
    fn test_error_debug() {
        let err = Error::attestation("empty chain");
        let debug = format!("{err:?}");
        assert!(debug.contains("Attestation"));
        assert!(debug.contains("empty chain"));
    }
}
