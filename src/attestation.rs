//! Attestation chains: certificate-based proof of key provenance.
//!
//! An [`AttestationChain`] is the ordered, leaf-first list of DER-encoded
//! certificates the key store bound to a key at generation time. The leaf
//! binds the exported public key and the attestation challenge; the rest of
//! the chain roots it in the store's attestation authority.
//!
//! # Falsification Claims
//!
//! - F030: A chain is never empty
//! - F031: Every certificate in a chain is independently DER-framed
//! - F032: The leaf is the first certificate

use crate::error::{Error, Result};
use std::fmt;

/// Certificate type label for display, matching what platform keystores
/// report for their certificate objects.
pub const CERTIFICATE_TYPE: &str = "X.509";

/// Ordered, leaf-first attestation certificate chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationChain {
    certs: Vec<Vec<u8>>,
}

impl AttestationChain {
    /// Build a chain from leaf-first DER certificates.
    ///
    /// # Errors
    ///
    /// Returns `Attestation` if the chain is empty or any certificate is
    /// not plausibly DER-encoded (X.509 certificates are DER SEQUENCEs).
    pub fn from_der_certs(certs: Vec<Vec<u8>>) -> Result<Self> {
        if certs.is_empty() {
            return Err(Error::attestation("certificate chain is empty"));
        }
        for (i, cert) in certs.iter().enumerate() {
            if cert.len() < 4 || cert[0] != 0x30 {
                return Err(Error::attestation(format!(
                    "certificate {i} is not a DER SEQUENCE"
                )));
            }
        }
        Ok(Self { certs })
    }

    /// The leaf certificate, DER-encoded.
    ///
    /// Construction guarantees the chain is non-empty.
    #[must_use]
    pub fn leaf(&self) -> &[u8] {
        &self.certs[0]
    }

    /// Number of certificates in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Check if the chain is empty (always false for constructed chains).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Iterate the chain leaf-first.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.certs.iter().map(Vec::as_slice)
    }

    /// The display type of the leaf certificate.
    #[must_use]
    pub const fn leaf_type(&self) -> &'static str {
        CERTIFICATE_TYPE
    }

    /// Hex rendering of the leaf certificate for display layers.
    #[must_use]
    pub fn leaf_hex(&self) -> String {
        hex::encode(self.leaf())
    }

    /// Check whether the leaf certificate embeds `public_key_sec1`.
    ///
    /// The subject public key info of the leaf contains the uncompressed
    /// point bytes verbatim, so a subsequence search is sufficient to tie
    /// a chain to the currently stored key without a full X.509 parser.
    #[must_use]
    pub fn leaf_binds_key(&self, public_key_sec1: &[u8]) -> bool {
        !public_key_sec1.is_empty()
            && self
                .leaf()
                .windows(public_key_sec1.len())
                .any(|w| w == public_key_sec1)
    }
}

impl fmt::Display for AttestationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chain, {} certificate(s), leaf {} bytes",
            CERTIFICATE_TYPE,
            self.len(),
            self.leaf().len()
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fake_cert(fill: u8, len: usize) -> Vec<u8> {
        let mut cert = vec![0x30, 0x82];
        cert.resize(len, fill);
        cert
    }

    // F030: A chain is never empty
    #[test]
    fn test_empty_chain_rejected() {
        let result = AttestationChain::from_der_certs(vec![]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err(),
            Error::attestation("certificate chain is empty")
        );
    }

    // F031: Every certificate in a chain is independently DER-framed
    #[test]
    fn test_malformed_cert_rejected() {
        let result = AttestationChain::from_der_certs(vec![fake_cert(1, 40), vec![0xFF; 40]]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("certificate 1"));
    }

    #[test]
    fn test_truncated_cert_rejected() {
        assert!(AttestationChain::from_der_certs(vec![vec![0x30]]).is_err());
    }

    // F032: The leaf is the first certificate
    #[test]
    fn test_leaf_first_ordering() {
        let leaf = fake_cert(0xAA, 40);
        let root = fake_cert(0xBB, 60);
        let chain = AttestationChain::from_der_certs(vec![leaf.clone(), root]).unwrap();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.leaf(), leaf.as_slice());
        assert_eq!(chain.iter().next().unwrap(), leaf.as_slice());
    }

    #[test]
    fn test_leaf_binds_key_subsequence() {
        let mut leaf = fake_cert(0x00, 30);
        leaf.extend_from_slice(&[0x04, 0xDE, 0xAD, 0xBE, 0xEF]);
        leaf.extend_from_slice(&[0x00; 10]);
        let chain = AttestationChain::from_der_certs(vec![leaf]).unwrap();

        assert!(chain.leaf_binds_key(&[0x04, 0xDE, 0xAD, 0xBE, 0xEF]));
        assert!(!chain.leaf_binds_key(&[0x05, 0x01, 0x02, 0x03, 0x04]));
        assert!(!chain.leaf_binds_key(&[]));
    }

    #[test]
    fn test_display_and_hex() {
        let chain = AttestationChain::from_der_certs(vec![fake_cert(0x11, 8)]).unwrap();
        assert_eq!(chain.leaf_type(), "X.509");
        assert!(chain.to_string().contains("X.509"));
        assert_eq!(chain.leaf_hex().len(), 16);
    }
}
