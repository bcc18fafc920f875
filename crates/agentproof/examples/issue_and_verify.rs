//! Issue and verify: provision a credential, issue a constrained proof,
//! verify it against a live transaction, and consult the trust registry.
//!
//! Run with:
//!   cargo run --example issue_and_verify -p agentproof

use std::sync::Arc;

use agentproof::{
    Agent, Constraints, Credential, CredentialStore, ExecutionContext, Intent, IssuerConfig,
    KeyRing, MemoryCredentialStore, Principal, ProofIssuer, ProofRequest, ProofVerifier,
    RedemptionLedger, RegistryConfig, ServiceKey, TrustRegistry,
};

fn main() -> agentproof::Result<()> {
    // ── 1. Wire the service components ──────────────────────────────────────
    let keys = Arc::new(KeyRing::new(ServiceKey::generate()));
    let ledger = Arc::new(RedemptionLedger::new());
    let credentials = Arc::new(MemoryCredentialStore::new());
    credentials.insert(Credential::new("cred-alice", "alice"))?;

    let issuer = ProofIssuer::new(
        Arc::clone(&keys),
        credentials,
        Arc::clone(&ledger),
        IssuerConfig::default(),
    );
    let verifier = ProofVerifier::new(Arc::clone(&keys), ledger);
    println!("Signing key: {}", keys.active_kid());
    println!();

    // ── 2. Issue a single-use proof capped at 500 ───────────────────────────
    let request = ProofRequest::new(
        Principal::new("alice", "cred-alice"),
        Agent::new("travel-bot", "Travel Bot", "2.1.0"),
        Intent::new("book_flight", "airline", "/bookings", "POST")
            .with_parameter("amount", serde_json::json!(420)),
    )
    .with_constraints(Constraints::single_use().with_max_amount(500.0))
    .expires_in(120);

    let proof = issuer.create(request)?;
    println!("Issued {}", proof.proof_id());
    println!("  Expires:  {}", agentproof::time::to_rfc3339(proof.expires_at()));
    println!("  Header:   {}...", &proof.header[..48]);
    println!();

    // ── 3. Verify against a transaction that exceeds the cap ──────────────
    //
    // A failed check does not burn the single use.
    let over = verifier.verify_with_context(
        &proof.header,
        &ExecutionContext::default().with_amount(900.0),
    );
    println!("Verify at 900: valid={} errors={:?}", over.valid, over.errors);

    // ── 4. Verify for real, then replay ─────────────────────────────────────
    let ok = verifier.verify(&proof.header);
    println!(
        "Verify:        valid={} liability accepted by {:?}",
        ok.valid, ok.liability_accepted_by
    );
    let replay = verifier.verify(&proof.header);
    println!("Replay:        valid={} errors={:?}", replay.valid, replay.errors);
    println!();

    // ── 5. Trust registry ───────────────────────────────────────────────────
    let registry = TrustRegistry::new(RegistryConfig::default());
    println!("Unknown pair:  {:?}", registry.resolve("travel-bot", "alice"));

    registry.register("travel-bot", "alice", Some("Travel Bot".into()), None)?;
    registry.adjust_score("travel-bot", "alice", 1)?;
    println!("Registered:    {:?}", registry.resolve("travel-bot", "alice"));

    registry.revoke("travel-bot", "alice", "card reported stolen")?;
    println!("Revoked:       {:?}", registry.resolve("travel-bot", "alice"));

    Ok(())
}
