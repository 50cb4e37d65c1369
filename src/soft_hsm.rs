//! In-process software security module.
//!
//! [`SoftHsm`] implements the [`KeyStore`] and [`SignatureEngine`]
//! capabilities entirely in process memory with real P-256 ECDSA, so the
//! signing workflow can run end-to-end on any machine. It stands in for a
//! platform keystore, including simulated
//! StrongBox availability so both hardware-policy branches are reachable.
//!
//! Attestation is modeled with a per-store attestation root: every store
//! owns a self-signed P-256 root certificate, and every generated key gets
//! a leaf certificate signed by that root. The leaf embeds the key's public
//! key (in its subject public key info) and the generation-time attestation
//! challenge (under the key attestation extension OID), giving the chain
//! the same shape a hardware keystore returns.
//!
//! # Falsification Claims
//!
//! - F040: Generated signatures verify against the exported public key
//! - F041: Regeneration replaces the entry and invalidates old handles
//! - F042: Signing through a deleted alias fails with KeyNotFound
//! - F043: The leaf certificate embeds the stored public key
//! - F044: RequireStrongBox fails when the simulated chip is absent
//! - F045: PreferStrongBox falls back to the trusted environment

use crate::error::{Error, Result};
use crate::key_store::{
    HardwarePolicy, KeyInfo, KeyOrigin, KeyPairHandle, KeyPurpose, KeySpec, KeyStore,
    SecurityLevel, CHALLENGE_LEN,
};
use crate::signature::{PublicKey, SignatureAlgorithm, SignatureEngine, SignatureValue};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::EncodePrivateKey;
use rand::rngs::OsRng;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CustomExtension, DnType, IsCa, KeyPair,
    PKCS_ECDSA_P256_SHA256,
};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// OID of the Android key attestation certificate extension; the challenge
/// travels under it so external verifiers can find it where they expect it.
const ATTESTATION_EXTENSION_OID: [u64; 10] = [1, 3, 6, 1, 4, 1, 11129, 2, 1, 17];

/// Common name of the per-store attestation root certificate.
const ROOT_COMMON_NAME: &str = "SoftHsm Attestation Root";

struct SoftKeyEntry {
    signing_key: SigningKey,
    public_key: PublicKey,
    security_level: SecurityLevel,
    chain: Vec<Vec<u8>>,
}

/// Software security module backing the signing workflow.
///
/// Keys live for the lifetime of the store. Unlike a hardware keystore
/// nothing persists across processes, which is exactly what the demo
/// workflow and the test suite need.
///
/// # Example
///
/// ```
/// use llavero::key_store::{KeySpec, KeyStore};
/// use llavero::signature::{SignatureAlgorithm, SignatureEngine};
/// use llavero::soft_hsm::SoftHsm;
///
/// # fn main() -> llavero::Result<()> {
/// let mut hsm = SoftHsm::new()?;
/// let handle = hsm.generate("demo", &KeySpec::new())?;
/// let sig = hsm.sign(&handle, SignatureAlgorithm::Sha256WithEcdsa, b"hello")?;
/// assert!(hsm.verify(
///     handle.public_key(),
///     SignatureAlgorithm::Sha256WithEcdsa,
///     b"hello",
///     &sig
/// )?);
/// # Ok(())
/// # }
/// ```
pub struct SoftHsm {
    entries: HashMap<String, SoftKeyEntry>,
    root_key: KeyPair,
    root_cert: Certificate,
    strongbox_available: bool,
}

impl std::fmt::Debug for SoftHsm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftHsm")
            .field("key_count", &self.entries.len())
            .field("strongbox_available", &self.strongbox_available)
            .finish_non_exhaustive()
    }
}

impl SoftHsm {
    /// Create a store with an available simulated StrongBox.
    ///
    /// # Errors
    ///
    /// Returns `KeyGeneration` if the attestation root cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_strongbox(true)
    }

    /// Create a store without StrongBox backing, for exercising fallback
    /// and require-policy behavior.
    ///
    /// # Errors
    ///
    /// Returns `KeyGeneration` if the attestation root cannot be created.
    pub fn without_strongbox() -> Result<Self> {
        Self::with_strongbox(false)
    }

    fn with_strongbox(strongbox_available: bool) -> Result<Self> {
        let root_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
            .map_err(|e| Error::key_generation(format!("attestation root key: {e}")))?;

        let mut params = CertificateParams::new(Vec::<String>::default())
            .map_err(|e| Error::key_generation(format!("attestation root params: {e}")))?;
        params
            .distinguished_name
            .push(DnType::CommonName, ROOT_COMMON_NAME);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

        let root_cert = params
            .self_signed(&root_key)
            .map_err(|e| Error::key_generation(format!("attestation root cert: {e}")))?;

        Ok(Self {
            entries: HashMap::new(),
            root_key,
            root_cert,
            strongbox_available,
        })
    }

    /// Whether the simulated StrongBox chip is present.
    #[must_use]
    pub const fn is_strongbox_available(&self) -> bool {
        self.strongbox_available
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Resolve the security level a spec's policy yields on this store.
    fn grant_level(&self, policy: HardwarePolicy) -> Result<SecurityLevel> {
        match policy {
            HardwarePolicy::NoStrongBox => Ok(SecurityLevel::TrustedEnvironment),
            HardwarePolicy::PreferStrongBox => {
                if self.strongbox_available {
                    Ok(SecurityLevel::StrongBox)
                } else {
                    // Silent fallback is the contract of this policy
                    Ok(SecurityLevel::TrustedEnvironment)
                }
            }
            HardwarePolicy::RequireStrongBox => {
                if self.strongbox_available {
                    Ok(SecurityLevel::StrongBox)
                } else {
                    Err(Error::not_available(SecurityLevel::StrongBox))
                }
            }
        }
    }

    /// Issue the leaf attestation certificate for a freshly generated key.
    fn issue_leaf(
        &self,
        alias: &str,
        signing_key: &SigningKey,
        challenge: &[u8; CHALLENGE_LEN],
    ) -> Result<Vec<u8>> {
        let pkcs8 = signing_key
            .to_pkcs8_der()
            .map_err(|e| Error::attestation(format!("leaf key encoding: {e}")))?;
        let leaf_key = KeyPair::try_from(pkcs8.as_bytes())
            .map_err(|e| Error::attestation(format!("leaf key import: {e}")))?;

        let mut params = CertificateParams::new(Vec::<String>::default())
            .map_err(|e| Error::attestation(format!("leaf params: {e}")))?;
        params.distinguished_name.push(DnType::CommonName, alias);

        // Challenge as a DER OCTET STRING under the attestation OID
        let mut content = Vec::with_capacity(CHALLENGE_LEN + 2);
        content.push(0x04);
        content.push(CHALLENGE_LEN as u8);
        content.extend_from_slice(challenge);
        params
            .custom_extensions
            .push(CustomExtension::from_oid_content(
                &ATTESTATION_EXTENSION_OID,
                content,
            ));

        let leaf = params
            .signed_by(&leaf_key, &self.root_cert, &self.root_key)
            .map_err(|e| Error::attestation(format!("leaf issuance: {e}")))?;

        Ok(leaf.der().to_vec())
    }
}

impl KeyStore for SoftHsm {
    fn exists(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    fn delete(&mut self, alias: &str) {
        if self.entries.remove(alias).is_some() {
            debug!(alias, "deleted key entry");
        }
    }

    #[instrument(level = "debug", skip(self, spec))]
    fn generate(&mut self, alias: &str, spec: &KeySpec) -> Result<KeyPairHandle> {
        if alias.is_empty() {
            return Err(Error::invalid_input("key alias cannot be empty"));
        }
        if spec.purposes.intersects(KeyPurpose::ENCRYPT | KeyPurpose::DECRYPT) {
            return Err(Error::key_generation(
                "only SIGN and VERIFY purposes are supported",
            ));
        }
        if !spec.purposes.contains(KeyPurpose::SIGN) {
            return Err(Error::key_generation("spec does not authorize signing"));
        }

        let security_level = self.grant_level(spec.hardware_policy)?;

        // Regeneration semantics: replace, never add
        if self.entries.remove(alias).is_some() {
            debug!(alias, "replacing existing key entry");
        }

        let signing_key = SigningKey::random(&mut OsRng);
        let point = signing_key.verifying_key().to_encoded_point(false);
        let public_key = PublicKey::from_sec1_bytes(point.as_bytes().to_vec())?;

        let leaf = self.issue_leaf(alias, &signing_key, &spec.attestation_challenge)?;
        let chain = vec![leaf, self.root_cert.der().to_vec()];

        self.entries.insert(
            alias.to_owned(),
            SoftKeyEntry {
                signing_key,
                public_key: public_key.clone(),
                security_level,
                chain,
            },
        );
        debug!(
            alias,
            %security_level,
            key_count = self.entries.len(),
            "generated key pair"
        );

        Ok(KeyPairHandle::new(
            alias.to_owned(),
            public_key,
            security_level,
        ))
    }

    fn certificate_chain(&self, alias: &str) -> Result<Vec<Vec<u8>>> {
        let entry = self
            .entries
            .get(alias)
            .ok_or_else(|| Error::key_not_found(alias))?;
        debug!(alias, certs = entry.chain.len(), "retrieved certificate chain");
        Ok(entry.chain.clone())
    }

    fn key_info(&self, alias: &str) -> Result<KeyInfo> {
        let entry = self
            .entries
            .get(alias)
            .ok_or_else(|| Error::key_not_found(alias))?;
        Ok(KeyInfo {
            origin: KeyOrigin::Generated,
            security_level: entry.security_level,
        })
    }
}

impl SignatureEngine for SoftHsm {
    #[instrument(level = "debug", skip(self, handle, message))]
    fn sign(
        &self,
        handle: &KeyPairHandle,
        algorithm: SignatureAlgorithm,
        message: &[u8],
    ) -> Result<SignatureValue> {
        let SignatureAlgorithm::Sha256WithEcdsa = algorithm;

        let entry = self
            .entries
            .get(handle.alias())
            .ok_or_else(|| Error::key_not_found(handle.alias()))?;
        // A stale handle from before a regeneration must not sign with the
        // replacement key
        if entry.public_key != *handle.public_key() {
            return Err(Error::signing(
                "handle no longer matches the stored key (alias was regenerated)",
            ));
        }

        let signature: Signature = entry.signing_key.sign(message);
        let der = signature.to_der();
        debug!(
            alias = handle.alias(),
            bytes = der.as_bytes().len(),
            "signed message"
        );
        SignatureValue::from_der(der.as_bytes().to_vec())
    }

    fn verify(
        &self,
        public_key: &PublicKey,
        algorithm: SignatureAlgorithm,
        message: &[u8],
        signature: &SignatureValue,
    ) -> Result<bool> {
        let SignatureAlgorithm::Sha256WithEcdsa = algorithm;

        let verifying_key = VerifyingKey::from_sec1_bytes(public_key.as_bytes())
            .map_err(|e| Error::invalid_input(format!("public key: {e}")))?;
        let sig = Signature::from_der(signature.as_bytes())
            .map_err(|e| Error::signature_decode(e.to_string()))?;

        // Wrong signature is a false outcome, not an error
        Ok(verifying_key.verify(message, &sig).is_ok())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    const ALG: SignatureAlgorithm = SignatureAlgorithm::Sha256WithEcdsa;

    fn hsm() -> SoftHsm {
        SoftHsm::new().unwrap()
    }

    // F040: Generated signatures verify against the exported public key
    #[test]
    fn test_sign_verify_roundtrip() {
        let mut hsm = hsm();
        let handle = hsm.generate("k1", &KeySpec::new()).unwrap();

        let sig = hsm.sign(&handle, ALG, b"test message").unwrap();
        assert!(hsm.verify(handle.public_key(), ALG, b"test message", &sig).unwrap());
    }

    #[test]
    fn test_wrong_message_fails_closed() {
        let mut hsm = hsm();
        let handle = hsm.generate("k1", &KeySpec::new()).unwrap();

        let sig = hsm.sign(&handle, ALG, b"message 1").unwrap();
        let valid = hsm.verify(handle.public_key(), ALG, b"message 2", &sig).unwrap();
        assert!(!valid);
    }

    #[test]
    fn test_malformed_signature_is_decode_error() {
        let mut hsm = hsm();
        let handle = hsm.generate("k1", &KeySpec::new()).unwrap();

        // Framing-valid bytes that are not a DER ECDSA signature
        let garbage = SignatureValue::from_der(vec![0x30; 40]).unwrap();
        let err = hsm
            .verify(handle.public_key(), ALG, b"msg", &garbage)
            .unwrap_err();
        assert!(err.is_signature_decode());
    }

    // F041: Regeneration replaces the entry and invalidates old handles
    #[test]
    fn test_regeneration_replaces_entry() {
        let mut hsm = hsm();
        let old = hsm.generate("k1", &KeySpec::new()).unwrap();
        let new = hsm.generate("k1", &KeySpec::new()).unwrap();

        assert_eq!(hsm.key_count(), 1);
        assert_ne!(old.public_key(), new.public_key());

        // Stale handle must not sign with the replacement key
        let err = hsm.sign(&old, ALG, b"msg").unwrap_err();
        assert!(matches!(err, Error::Signing { .. }));
    }

    // F042: Signing through a deleted alias fails with KeyNotFound
    #[test]
    fn test_sign_after_delete_fails() {
        let mut hsm = hsm();
        let handle = hsm.generate("k1", &KeySpec::new()).unwrap();
        hsm.delete("k1");

        assert!(!hsm.exists("k1"));
        let err = hsm.sign(&handle, ALG, b"msg").unwrap_err();
        assert!(err.is_key_not_found());
    }

    // F043: The leaf certificate embeds the stored public key
    #[test]
    fn test_leaf_embeds_public_key_and_challenge() {
        let mut hsm = hsm();
        let spec = KeySpec::new().with_challenge([0x5A; CHALLENGE_LEN]);
        let handle = hsm.generate("k1", &spec).unwrap();

        let chain = hsm.certificate_chain("k1").unwrap();
        assert_eq!(chain.len(), 2);

        let leaf = &chain[0];
        let pk = handle.public_key().as_bytes();
        assert!(leaf.windows(pk.len()).any(|w| w == pk));
        assert!(leaf
            .windows(CHALLENGE_LEN)
            .any(|w| w == [0x5A; CHALLENGE_LEN]));
    }

    #[test]
    fn test_chain_for_missing_alias() {
        let hsm = hsm();
        assert!(hsm.certificate_chain("ghost").unwrap_err().is_key_not_found());
        assert!(hsm.key_info("ghost").unwrap_err().is_key_not_found());
    }

    // F044: RequireStrongBox fails when the simulated chip is absent
    #[test]
    fn test_require_strongbox_fails_without_chip() {
        let mut hsm = SoftHsm::without_strongbox().unwrap();
        let spec = KeySpec::new().with_hardware_policy(HardwarePolicy::RequireStrongBox);

        let err = hsm.generate("k1", &spec).unwrap_err();
        assert!(err.is_not_available());
        assert!(!hsm.exists("k1"));
    }

    // F045: PreferStrongBox falls back to the trusted environment
    #[test]
    fn test_prefer_strongbox_falls_back() {
        let mut hsm = SoftHsm::without_strongbox().unwrap();
        let handle = hsm.generate("k1", &KeySpec::new()).unwrap();

        assert_eq!(handle.security_level(), SecurityLevel::TrustedEnvironment);
        assert!(!handle.is_strongbox_backed());
    }

    #[test]
    fn test_strongbox_granted_when_available() {
        let mut hsm = hsm();
        let handle = hsm.generate("k1", &KeySpec::new()).unwrap();

        assert_eq!(handle.security_level(), SecurityLevel::StrongBox);
        let info = hsm.key_info("k1").unwrap();
        assert_eq!(info.origin, KeyOrigin::Generated);
        assert_eq!(info.security_level, SecurityLevel::StrongBox);
    }

    #[test]
    fn test_unsupported_purposes_rejected() {
        let mut hsm = hsm();
        let spec = KeySpec::new().with_purposes(KeyPurpose::SIGN | KeyPurpose::ENCRYPT);
        assert!(matches!(
            hsm.generate("k1", &spec).unwrap_err(),
            Error::KeyGeneration { .. }
        ));

        let spec = KeySpec::new().with_purposes(KeyPurpose::VERIFY);
        assert!(matches!(
            hsm.generate("k1", &spec).unwrap_err(),
            Error::KeyGeneration { .. }
        ));
    }

    #[test]
    fn test_empty_alias_rejected() {
        let mut hsm = hsm();
        let err = hsm.generate("", &KeySpec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_delete_missing_alias_is_noop() {
        let mut hsm = hsm();
        hsm.delete("never-existed");
        assert_eq!(hsm.key_count(), 0);
    }

    #[test]
    #[traced_test]
    fn test_generation_is_logged() {
        let mut hsm = hsm();
        hsm.generate("k1", &KeySpec::new()).unwrap();
        assert!(logs_contain("generated key pair"));
    }

    #[test]
    fn test_debug_does_not_leak_entries() {
        let mut hsm = hsm();
        hsm.generate("secret-alias", &KeySpec::new()).unwrap();
        let debug = format!("{hsm:?}");
        assert!(debug.contains("SoftHsm"));
        assert!(!debug.contains("secret-alias"));
    }
}
