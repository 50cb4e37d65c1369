//! Llavero: Hardware-Backed Signing Workflow in Safe Rust
//!
//! Llavero implements the key-lifecycle and signing workflow of a
//! hardware-backed ECDSA demo: generate a P-256 key pair under platform
//! protection, sign a message, verify the signature, and attest the key's
//! provenance with a certificate chain. The workflow is thin orchestration
//! over pluggable security capabilities; all cryptography is delegated.
//!
//! # Design Philosophy
//!
//! - **Iron Lotus Framework**: Toyota Production System principles applied to systems programming
//! - **Popperian Falsification**: every module carries claims its tests attempt to disprove
//! - **Capability seams**: key store and signature engine are traits; the
//!   private key is never representable in process memory
//!
//! # Architecture
//!
//! | Concern | Module | Role |
//! |---------|--------|------|
//! | Failure taxonomy | [`error`] | One `Error` enum, no panics at boundaries |
//! | Key store capability | [`key_store`] | Alias-addressed hardware key storage |
//! | Signature engine capability | [`signature`] | ECDSA P-256 / SHA-256 sign + verify |
//! | Attestation | [`attestation`] | Leaf-first certificate chains |
//! | Software backend | [`soft_hsm`] | Real-crypto in-process security module |
//! | Controller | [`workflow`] | Generate → Sign → Verify → Attest |
//!
//! # Quick Start
//!
//! ```
//! use llavero::soft_hsm::SoftHsm;
//! use llavero::workflow::{SigningWorkflow, DEMO_MESSAGE};
//!
//! # fn main() -> llavero::Result<()> {
//! let mut workflow = SigningWorkflow::new(SoftHsm::new()?, "my_ecdsa_key");
//!
//! workflow.generate_key_pair()?;
//! workflow.sign(DEMO_MESSAGE)?;
//! assert!(workflow.verify(DEMO_MESSAGE)?);
//! assert_eq!(workflow.attest()?.leaf_type(), "X.509");
//!
//! println!("{}", workflow.status());
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations that can fail return [`Result<T, Error>`]. The workflow
//! controller additionally converts every failure into a human-readable
//! [`WorkflowStatus`] so a presentation layer only ever renders strings.
//!
//! # Concurrency Model
//!
//! The workflow is single-threaded, synchronous, and user-driven: each
//! operation runs to completion before the next can be invoked. Correctness
//! under concurrent external mutation of the same alias is the platform's
//! responsibility, not this crate's.
//!
//! [`WorkflowStatus`]: workflow::WorkflowStatus

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)] // Allow StrongBox, SoftHsm, etc. without backticks

pub mod attestation;
pub mod error;
pub mod key_store;
pub mod signature;
pub mod soft_hsm;
pub mod workflow;

// Re-export main types for convenience
pub use attestation::AttestationChain;
pub use error::{Error, Result};
pub use key_store::{
    HardwarePolicy, KeyInfo, KeyOrigin, KeyPairHandle, KeyPurpose, KeySpec, KeyStore,
    SecurityLevel,
};
pub use signature::{PublicKey, SignatureAlgorithm, SignatureEngine, SignatureValue};
pub use soft_hsm::SoftHsm;
pub use workflow::{SigningWorkflow, WorkflowStage, WorkflowStatus, DEMO_MESSAGE};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
