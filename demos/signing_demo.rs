//! Hardware-Backed Signing Demo
//!
//! Walks the four-step workflow: generate a P-256 key pair, sign the demo
//! message, verify the signature, and attest the key.
//!
//! Run with: cargo run --example `signing_demo`
//!
//! Set `RUST_LOG=llavero=debug` to see the key store's internal logging.

use llavero::soft_hsm::SoftHsm;
use llavero::workflow::{SigningWorkflow, DEMO_MESSAGE};
use llavero::KeyStore;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), llavero::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║       LLAVERO - ECDSA P-256 Signing Workflow Demo          ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let hsm = SoftHsm::new()?;
    println!(
        "{} StrongBox {}",
        if hsm.is_strongbox_available() { "✓" } else { "❌" },
        if hsm.is_strongbox_available() {
            "supported"
        } else {
            "not supported"
        }
    );
    println!();

    let mut workflow = SigningWorkflow::new(hsm, "my_ecdsa_key");

    // 1. Generate key pair
    println!("1. Generating EC P-256 key pair...");
    let handle = workflow.generate_key_pair()?;
    println!("✓ {}", workflow.status());
    println!("  Security level: {}", handle.security_level());
    let info = workflow.module().key_info(workflow.alias())?;
    println!("  Origin: {}", info.origin);
    if let Some(hex) = workflow.public_key_hex() {
        println!("  Public key: {}...{}", &hex[..16], &hex[hex.len() - 8..]);
    }
    println!();

    // 2. Sign the demo message
    println!(
        "2. Signing message: \"{}\"",
        String::from_utf8_lossy(DEMO_MESSAGE)
    );
    let signature = workflow.sign(DEMO_MESSAGE)?;
    println!("✓ {}", workflow.status());
    println!("  Signature: {} bytes (DER format)", signature.len());
    println!();

    // 3. Verify the signature
    println!("3. Verifying signature...");
    let valid = workflow.verify(DEMO_MESSAGE)?;
    println!("{} {}", if valid { "✓" } else { "❌" }, workflow.status());
    println!();

    // Tampered message must fail closed
    println!("   Testing tampered message...");
    let tampered = workflow.verify(b"Hello, ECDSA! This message was tampered.")?;
    println!(
        "{} Tampered message rejected: {}",
        if tampered { "❌" } else { "✓" },
        !tampered
    );
    // Restore the verified state for the record
    workflow.verify(DEMO_MESSAGE)?;
    println!();

    // 4. Attest the key
    println!("4. Attesting key...");
    let chain = workflow.attest()?;
    println!("✓ {}", workflow.status());
    println!("  Chain: {chain}");
    if let Some(hex) = workflow.attestation_leaf_hex() {
        println!("  Leaf: {}...{}", &hex[..16], &hex[hex.len() - 8..]);
    }
    println!();

    println!("Final stage: {}", workflow.stage());
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║                    Demo Complete                           ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    Ok(())
}
