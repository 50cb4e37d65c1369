//! Key store capability: hardware-protected key material, addressed by alias.
//!
//! A [`KeyStore`] persists asymmetric key pairs under platform protection.
//! Private key material is never exported; callers hold a [`KeyPairHandle`]
//! referencing the stored entry and route all use through a
//! [`SignatureEngine`].
//!
//! # Security Model
//!
//! Keys generated through a key store:
//! - Never materialize raw private key bytes in process memory
//! - May be backed by a dedicated StrongBox security chip
//! - Persist beyond the process lifetime, owned by the store
//! - Are replaced (not duplicated) when regenerated under the same alias
//!
//! # Falsification Claims
//!
//! - F010: Generating under an existing alias replaces the entry
//! - F011: A handle is valid only while its alias exists
//! - F012: StrongBox preference falls back silently by default
//! - F013: RequireStrongBox fails loudly when the chip is absent
//! - F014: Attestation challenge is 20 bytes from a CSPRNG
//!
//! [`SignatureEngine`]: crate::signature::SignatureEngine

use crate::error::Result;
use crate::signature::PublicKey;
use bitflags::bitflags;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

/// Length in bytes of the attestation challenge included in a [`KeySpec`].
pub const CHALLENGE_LEN: usize = 20;

bitflags! {
    /// Purposes a generated key pair is authorized for.
    ///
    /// The signing workflow uses `SIGN | VERIFY`; the other purposes exist
    /// so a spec can be rejected by stores that do not support them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KeyPurpose: u8 {
        /// Produce signatures with the private key.
        const SIGN = 0b0001;
        /// Verify signatures with the public key.
        const VERIFY = 0b0010;
        /// Encrypt with the public key.
        const ENCRYPT = 0b0100;
        /// Decrypt with the private key.
        const DECRYPT = 0b1000;
    }
}

/// Elliptic curve for generated key pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Curve {
    /// NIST P-256 (secp256r1) - the only curve this workflow uses.
    #[default]
    P256,
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P256 => write!(f, "P-256 (secp256r1)"),
        }
    }
}

/// Digest bound to generated keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Digest {
    /// SHA-256.
    #[default]
    Sha256,
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "SHA-256"),
        }
    }
}

/// Where a key's private material actually lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SecurityLevel {
    /// Software-only storage inside the store process.
    Software,
    /// Isolated trusted execution environment on the main SoC.
    TrustedEnvironment,
    /// Dedicated StrongBox security chip, fully outside the SoC.
    StrongBox,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Software => write!(f, "Software"),
            Self::TrustedEnvironment => write!(f, "Trusted Environment"),
            Self::StrongBox => write!(f, "StrongBox"),
        }
    }
}

/// How a generation request treats StrongBox availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HardwarePolicy {
    /// Request StrongBox backing, fall back to the trusted environment
    /// without error when the chip is absent.
    ///
    /// This mirrors how Android treats `setIsStrongBoxBacked`.
    #[default]
    PreferStrongBox,
    /// Fail generation with [`Error::NotAvailable`] when StrongBox backing
    /// cannot be granted.
    ///
    /// [`Error::NotAvailable`]: crate::error::Error::NotAvailable
    RequireStrongBox,
    /// Do not request StrongBox backing at all.
    NoStrongBox,
}

impl fmt::Display for HardwarePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreferStrongBox => write!(f, "Prefer StrongBox"),
            Self::RequireStrongBox => write!(f, "Require StrongBox"),
            Self::NoStrongBox => write!(f, "No StrongBox"),
        }
    }
}

/// How a key came to exist in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOrigin {
    /// Generated inside the store; private material never existed outside.
    Generated,
    /// Imported from caller-supplied material.
    Imported,
}

impl fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated => write!(f, "generated"),
            Self::Imported => write!(f, "imported"),
        }
    }
}

/// Parameters for generating a key pair.
///
/// Built the way Android's `KeyGenParameterSpec` is built: start from
/// defaults, override what matters.
///
/// # Example
///
/// ```
/// use llavero::key_store::{HardwarePolicy, KeySpec};
///
/// let spec = KeySpec::new()
///     .with_hardware_policy(HardwarePolicy::PreferStrongBox)
///     .with_unlocked_device_required(true);
/// assert_eq!(spec.attestation_challenge.len(), 20);
/// ```
#[derive(Debug, Clone)]
pub struct KeySpec {
    /// Authorized purposes.
    pub purposes: KeyPurpose,
    /// Curve for the key pair.
    pub curve: Curve,
    /// Digest bound to the key.
    pub digest: Digest,
    /// StrongBox request policy.
    pub hardware_policy: HardwarePolicy,
    /// Random challenge folded into the attestation certificate.
    pub attestation_challenge: [u8; CHALLENGE_LEN],
    /// Whether key use requires prior user authentication.
    pub user_auth_required: bool,
    /// Whether key use requires the device to be unlocked.
    pub unlocked_device_required: bool,
}

impl KeySpec {
    /// Create a spec with the workflow defaults: P-256, SHA-256,
    /// SIGN | VERIFY, prefer StrongBox, no user authentication, unlocked
    /// device required, and a fresh random attestation challenge.
    #[must_use]
    pub fn new() -> Self {
        let mut challenge = [0u8; CHALLENGE_LEN];
        OsRng.fill_bytes(&mut challenge);
        Self {
            purposes: KeyPurpose::SIGN | KeyPurpose::VERIFY,
            curve: Curve::P256,
            digest: Digest::Sha256,
            hardware_policy: HardwarePolicy::default(),
            attestation_challenge: challenge,
            user_auth_required: false,
            unlocked_device_required: true,
        }
    }

    /// Set the authorized purposes.
    #[must_use]
    pub const fn with_purposes(mut self, purposes: KeyPurpose) -> Self {
        self.purposes = purposes;
        self
    }

    /// Set the StrongBox request policy.
    #[must_use]
    pub const fn with_hardware_policy(mut self, policy: HardwarePolicy) -> Self {
        self.hardware_policy = policy;
        self
    }

    /// Replace the random attestation challenge with a caller-chosen one.
    #[must_use]
    pub const fn with_challenge(mut self, challenge: [u8; CHALLENGE_LEN]) -> Self {
        self.attestation_challenge = challenge;
        self
    }

    /// Set whether key use requires prior user authentication.
    #[must_use]
    pub const fn with_user_auth_required(mut self, required: bool) -> Self {
        self.user_auth_required = required;
        self
    }

    /// Set whether key use requires the device to be unlocked.
    #[must_use]
    pub const fn with_unlocked_device_required(mut self, required: bool) -> Self {
        self.unlocked_device_required = required;
        self
    }
}

impl Default for KeySpec {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque reference to a generated key pair.
///
/// The public half is exported bytes; the private half stays inside the
/// store and is reachable only through a [`SignatureEngine`]. A handle is
/// valid only while its alias exists in the store.
///
/// [`SignatureEngine`]: crate::signature::SignatureEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairHandle {
    alias: String,
    public_key: PublicKey,
    security_level: SecurityLevel,
}

impl KeyPairHandle {
    /// Create a handle. Called by key store implementations.
    #[must_use]
    pub const fn new(alias: String, public_key: PublicKey, security_level: SecurityLevel) -> Self {
        Self {
            alias,
            public_key,
            security_level,
        }
    }

    /// The alias this handle references.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The exported public key.
    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// The security level the store actually granted.
    ///
    /// Under [`HardwarePolicy::PreferStrongBox`] this can be lower than
    /// what was requested.
    #[must_use]
    pub const fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    /// Whether the private key lives in a StrongBox chip.
    #[must_use]
    pub fn is_strongbox_backed(&self) -> bool {
        self.security_level == SecurityLevel::StrongBox
    }
}

/// Properties of a stored key, as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    /// How the key came to exist.
    pub origin: KeyOrigin,
    /// Where the private material lives.
    pub security_level: SecurityLevel,
}

/// Platform key store capability.
///
/// Implementations persist key pairs under hardware protection and
/// produce attestation certificate chains for them. All operations are
/// synchronous; no retry or cancellation semantics are defined.
pub trait KeyStore {
    /// Check whether an entry exists under `alias`.
    fn exists(&self, alias: &str) -> bool;

    /// Delete the entry under `alias`, invalidating any outstanding
    /// handles for it. Deleting a missing alias is not an error.
    fn delete(&mut self, alias: &str);

    /// Generate a fresh key pair under `alias`.
    ///
    /// Regeneration semantics: an existing entry under the same alias is
    /// deleted and replaced, never added to.
    ///
    /// # Errors
    ///
    /// Returns `KeyGeneration` on store failure or an unsupported spec,
    /// and `NotAvailable` when the key spec requires a security level the
    /// store cannot grant.
    fn generate(&mut self, alias: &str, spec: &KeySpec) -> Result<KeyPairHandle>;

    /// Retrieve the attestation certificate chain for `alias`, leaf first,
    /// as DER-encoded certificates.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` when no entry exists under `alias`, and
    /// `Attestation` when the store cannot produce a usable chain.
    fn certificate_chain(&self, alias: &str) -> Result<Vec<Vec<u8>>>;

    /// Report the origin and security level of the key under `alias`.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` when no entry exists under `alias`.
    fn key_info(&self, alias: &str) -> Result<KeyInfo>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // F014: Attestation challenge is 20 bytes from a CSPRNG
    #[test]
    fn test_fresh_specs_get_distinct_challenges() {
        let a = KeySpec::new();
        let b = KeySpec::new();
        // 2^-160 collision probability; equality means the RNG is broken
        assert_ne!(a.attestation_challenge, b.attestation_challenge);
    }

    #[test]
    fn test_spec_defaults() {
        let spec = KeySpec::new();
        assert_eq!(spec.purposes, KeyPurpose::SIGN | KeyPurpose::VERIFY);
        assert_eq!(spec.curve, Curve::P256);
        assert_eq!(spec.digest, Digest::Sha256);
        assert_eq!(spec.hardware_policy, HardwarePolicy::PreferStrongBox);
        assert!(!spec.user_auth_required);
        assert!(spec.unlocked_device_required);
    }

    #[test]
    fn test_spec_builder() {
        let spec = KeySpec::new()
            .with_purposes(KeyPurpose::SIGN)
            .with_hardware_policy(HardwarePolicy::RequireStrongBox)
            .with_challenge([7; CHALLENGE_LEN])
            .with_user_auth_required(true)
            .with_unlocked_device_required(false);

        assert_eq!(spec.purposes, KeyPurpose::SIGN);
        assert_eq!(spec.hardware_policy, HardwarePolicy::RequireStrongBox);
        assert_eq!(spec.attestation_challenge, [7; CHALLENGE_LEN]);
        assert!(spec.user_auth_required);
        assert!(!spec.unlocked_device_required);
    }

    #[test]
    fn test_purpose_flags_compose() {
        let p = KeyPurpose::SIGN | KeyPurpose::VERIFY;
        assert!(p.contains(KeyPurpose::SIGN));
        assert!(p.contains(KeyPurpose::VERIFY));
        assert!(!p.contains(KeyPurpose::ENCRYPT));
    }

    #[test]
    fn test_security_level_ordering() {
        assert!(SecurityLevel::StrongBox > SecurityLevel::TrustedEnvironment);
        assert!(SecurityLevel::TrustedEnvironment > SecurityLevel::Software);
    }

    #[test]
    fn test_display_impls() {
        assert_eq!(Curve::P256.to_string(), "P-256 (secp256r1)");
        assert_eq!(Digest::Sha256.to_string(), "SHA-256");
        assert_eq!(SecurityLevel::StrongBox.to_string(), "StrongBox");
        assert_eq!(HardwarePolicy::PreferStrongBox.to_string(), "Prefer StrongBox");
        assert_eq!(KeyOrigin::Generated.to_string(), "generated");
    }
}
