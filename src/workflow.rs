//! Signing workflow controller.
//!
//! [`SigningWorkflow`] orchestrates the four user-driven operations of the
//! demo (generate key pair, sign, verify, attest) over any security
//! module implementing [`KeyStore`] + [`SignatureEngine`]. It enforces the
//! operation preconditions, tracks the session stage, and converts every
//! underlying fault into a [`WorkflowStatus`] update so a presentation
//! layer never sees a panic.
//!
//! # Session State Machine
//!
//! ```text
//! Unkeyed ──generate──▶ Keyed ──sign──▶ Signed ──verify(true)──▶ Verified
//!                         │
//!                         └──attest──▶ (attested flag, any stage ≥ Keyed)
//! ```
//!
//! Regenerating keys resets the stage to `Keyed` and clears the signature,
//! verification outcome, and attestation chain: a signature computed under
//! a deleted key is no longer meaningful.
//!
//! # Example
//!
//! ```
//! use llavero::soft_hsm::SoftHsm;
//! use llavero::workflow::{SigningWorkflow, DEMO_MESSAGE};
//!
//! # fn main() -> llavero::Result<()> {
//! let mut workflow = SigningWorkflow::new(SoftHsm::new()?, "my_ecdsa_key");
//! workflow.generate_key_pair()?;
//! workflow.sign(DEMO_MESSAGE)?;
//! assert!(workflow.verify(DEMO_MESSAGE)?);
//! let chain = workflow.attest()?;
//! assert!(!chain.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Falsification Claims
//!
//! - F050: Sign before generation fails with KeyNotFound
//! - F051: Verify without a signature fails with MissingInput
//! - F052: A failed operation updates the status, never panics
//! - F053: Regeneration clears signature, verification, and attestation
//! - F054: Verify has no side effects beyond status and stage
//! - F055: Attest is reachable from Keyed without signing first

use crate::attestation::AttestationChain;
use crate::error::{Error, Result};
use crate::key_store::{KeyPairHandle, KeySpec, KeyStore};
use crate::signature::{SignatureAlgorithm, SignatureEngine, SignatureValue};
use std::fmt;
use tracing::{debug, instrument};

/// The fixed message the demo workflow signs.
pub const DEMO_MESSAGE: &[u8] = b"Hello, ECDSA! This message will be signed.";

/// Where the session currently is in the four-step flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkflowStage {
    /// No key pair exists yet.
    Unkeyed,
    /// A key pair exists; nothing signed under it yet.
    Keyed,
    /// A signature exists for the current key pair.
    Signed,
    /// The signature verified true against the current public key.
    Verified,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unkeyed => write!(f, "unkeyed"),
            Self::Keyed => write!(f, "keyed"),
            Self::Signed => write!(f, "signed"),
            Self::Verified => write!(f, "verified"),
        }
    }
}

/// Human-readable outcome of the most recent operation.
///
/// Mutated by every operation, consumed only for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStatus {
    success: bool,
    message: String,
}

impl WorkflowStatus {
    fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Whether the most recent operation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// The display message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Sequential four-step signing workflow over a security module.
///
/// Operations are strictly synchronous and user-driven; each runs to
/// completion before the next can be invoked, and no operation retries
/// automatically. Every failure is terminal for that invocation: it is
/// returned to the caller *and* recorded in the status for display.
pub struct SigningWorkflow<M> {
    module: M,
    alias: String,
    algorithm: SignatureAlgorithm,
    handle: Option<KeyPairHandle>,
    signature: Option<SignatureValue>,
    chain: Option<AttestationChain>,
    stage: WorkflowStage,
    attested: bool,
    status: WorkflowStatus,
}

impl<M> SigningWorkflow<M>
where
    M: KeyStore + SignatureEngine,
{
    /// Create a workflow over `module`, keyed under `alias`.
    pub fn new(module: M, alias: impl Into<String>) -> Self {
        Self {
            module,
            alias: alias.into(),
            algorithm: SignatureAlgorithm::Sha256WithEcdsa,
            handle: None,
            signature: None,
            chain: None,
            stage: WorkflowStage::Unkeyed,
            attested: false,
            status: WorkflowStatus::success(
                "started; generate a key pair to begin",
            ),
        }
    }

    /// Generate a fresh key pair with the default [`KeySpec`].
    ///
    /// # Errors
    ///
    /// See [`Self::generate_key_pair_with`].
    pub fn generate_key_pair(&mut self) -> Result<KeyPairHandle> {
        self.generate_key_pair_with(&KeySpec::new())
    }

    /// Generate a fresh key pair under the workflow alias.
    ///
    /// Regeneration semantics: an existing entry under the alias is
    /// deleted and replaced, and all downstream session state (signature,
    /// verification outcome, attestation chain) is cleared.
    ///
    /// # Errors
    ///
    /// Returns `KeyGeneration` on store failure and `NotAvailable` when
    /// the key spec's hardware policy cannot be satisfied. The failure is also
    /// recorded in the status.
    #[instrument(level = "debug", skip(self, spec))]
    pub fn generate_key_pair_with(&mut self, spec: &KeySpec) -> Result<KeyPairHandle> {
        let outcome = self.module.generate(&self.alias, spec);
        match outcome {
            Ok(handle) => {
                debug!(alias = %self.alias, level = %handle.security_level(), "key pair generated");
                self.handle = Some(handle.clone());
                // Old signature and chain refer to a key that no longer exists
                self.signature = None;
                self.chain = None;
                self.attested = false;
                self.stage = WorkflowStage::Keyed;
                self.status = WorkflowStatus::success(format!(
                    "new EC P-256 key pair generated ({})",
                    handle.security_level()
                ));
                Ok(handle)
            }
            Err(e) => {
                self.status = WorkflowStatus::failure(format!("error generating keys: {e}"));
                Err(e)
            }
        }
    }

    /// Sign `message` with the current key pair.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` when no key pair has been generated (or its
    /// alias has since been deleted), and `Signing` on engine faults. The
    /// failure is also recorded in the status.
    #[instrument(level = "debug", skip(self, message))]
    pub fn sign(&mut self, message: &[u8]) -> Result<SignatureValue> {
        let outcome = match self.handle.as_ref() {
            None => Err(Error::key_not_found(&self.alias)),
            Some(handle) => self.module.sign(handle, self.algorithm, message),
        };
        match outcome {
            Ok(signature) => {
                debug!(bytes = signature.len(), "message signed");
                self.signature = Some(signature.clone());
                self.stage = WorkflowStage::Signed;
                self.status = WorkflowStatus::success("message signed successfully");
                Ok(signature)
            }
            Err(e) => {
                self.status = WorkflowStatus::failure(format!("error signing data: {e}"));
                Err(e)
            }
        }
    }

    /// Verify the current signature over `message`.
    ///
    /// Returns `false` for a cryptographic mismatch; that is an answer,
    /// not an error. Has no side effects beyond status and stage.
    ///
    /// # Errors
    ///
    /// Returns `MissingInput` when the public key or signature is absent,
    /// and `SignatureDecode` for malformed signature bytes. The failure is
    /// also recorded in the status.
    #[instrument(level = "debug", skip(self, message))]
    pub fn verify(&mut self, message: &[u8]) -> Result<bool> {
        let outcome = match (self.handle.as_ref(), self.signature.as_ref()) {
            (None, _) => Err(Error::missing_input("public key")),
            (_, None) => Err(Error::missing_input("signature")),
            (Some(handle), Some(signature)) => {
                self.module
                    .verify(handle.public_key(), self.algorithm, message, signature)
            }
        };
        match outcome {
            Ok(valid) => {
                if valid {
                    self.stage = WorkflowStage::Verified;
                    self.status = WorkflowStatus::success("signature verified: true");
                } else {
                    self.status = WorkflowStatus::failure("signature verified: false");
                }
                Ok(valid)
            }
            Err(e) => {
                self.status = WorkflowStatus::failure(format!("error verifying signature: {e}"));
                Err(e)
            }
        }
    }

    /// Retrieve the attestation chain for the current key.
    ///
    /// Reachable from any stage with a key; signing first is not required.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` when the alias does not exist and
    /// `Attestation` when the store returns an empty or malformed chain.
    /// The failure is also recorded in the status.
    #[instrument(level = "debug", skip(self))]
    pub fn attest(&mut self) -> Result<AttestationChain> {
        let outcome = if self.module.exists(&self.alias) {
            self.module
                .certificate_chain(&self.alias)
                .and_then(AttestationChain::from_der_certs)
        } else {
            Err(Error::key_not_found(&self.alias))
        };
        match outcome {
            Ok(chain) => {
                debug!(certs = chain.len(), "attestation chain retrieved");
                self.chain = Some(chain.clone());
                self.attested = true;
                self.status = WorkflowStatus::success(format!(
                    "attestation type: {}",
                    chain.leaf_type()
                ));
                Ok(chain)
            }
            Err(e) => {
                self.status = WorkflowStatus::failure(format!("error attesting key: {e}"));
                Err(e)
            }
        }
    }

    /// The alias this workflow keys under.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Current session stage.
    #[must_use]
    pub const fn stage(&self) -> WorkflowStage {
        self.stage
    }

    /// Whether an attestation chain has been retrieved for the current key.
    #[must_use]
    pub const fn attested(&self) -> bool {
        self.attested
    }

    /// Outcome of the most recent operation, for display.
    #[must_use]
    pub const fn status(&self) -> &WorkflowStatus {
        &self.status
    }

    /// Current key pair handle, if one exists.
    #[must_use]
    pub const fn handle(&self) -> Option<&KeyPairHandle> {
        self.handle.as_ref()
    }

    /// Current signature, if one exists.
    #[must_use]
    pub const fn signature(&self) -> Option<&SignatureValue> {
        self.signature.as_ref()
    }

    /// Most recently retrieved attestation chain, if any.
    #[must_use]
    pub const fn attestation_chain(&self) -> Option<&AttestationChain> {
        self.chain.as_ref()
    }

    /// Gate for a "Sign" control: a key pair must exist.
    #[must_use]
    pub const fn can_sign(&self) -> bool {
        self.handle.is_some()
    }

    /// Gate for a "Verify" control: a signature must exist.
    #[must_use]
    pub const fn can_verify(&self) -> bool {
        self.signature.is_some()
    }

    /// Gate for an "Attest" control: a key pair must exist.
    #[must_use]
    pub const fn can_attest(&self) -> bool {
        self.handle.is_some()
    }

    /// Hex rendering of the public key, if one exists.
    #[must_use]
    pub fn public_key_hex(&self) -> Option<String> {
        self.handle.as_ref().map(|h| h.public_key().to_hex())
    }

    /// Hex rendering of the signature, if one exists.
    #[must_use]
    pub fn signature_hex(&self) -> Option<String> {
        self.signature.as_ref().map(SignatureValue::to_hex)
    }

    /// Hex rendering of the attestation leaf certificate, if retrieved.
    #[must_use]
    pub fn attestation_leaf_hex(&self) -> Option<String> {
        self.chain.as_ref().map(AttestationChain::leaf_hex)
    }

    /// Borrow the underlying security module.
    #[must_use]
    pub const fn module(&self) -> &M {
        &self.module
    }

    /// Consume the workflow, returning the security module.
    #[must_use]
    pub fn into_module(self) -> M {
        self.module
    }
}

impl<M: fmt::Debug> fmt::Debug for SigningWorkflow<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningWorkflow")
            .field("alias", &self.alias)
            .field("stage", &self.stage)
            .field("attested", &self.attested)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}
