//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle:
//! 1. Provision a service key and credentials
//! 2. Register an agent with its principal
//! 3. Issue a constrained, single-use proof
//! 4. Verify it against a live transaction
//! 5. Revoke the pair and re-register it
//! 6. Restart the service from disk

use std::sync::Arc;

use agentproof::credential::{Credential, CredentialStore, MemoryCredentialStore};
use agentproof::crypto::{KeyRing, ServiceKey};
use agentproof::proof::{
    Agent, Constraints, ExecutionContext, Intent, IssuerConfig, Principal, ProofIssuer,
    ProofRequest, ProofVerifier, RedemptionLedger, VerifyError,
};
use agentproof::registry::{RegistryConfig, TrustRegistry};
use agentproof::storage::{load_or_generate, FileRecordStore, TrustRecordStore};
use serde_json::json;

#[test]
fn full_workflow_issue_verify_revoke() {
    let dir = tempfile::tempdir().unwrap();

    // ── Step 1: Provision key and credentials ───────────────────────────
    let key_path = dir.path().join("service.apk");
    let key = load_or_generate(&key_path, "operator-passphrase").expect("key should be created");
    let kid = key.kid().clone();
    let keys = Arc::new(KeyRing::new(key));

    let credentials = Arc::new(MemoryCredentialStore::new());
    credentials
        .insert(Credential::new("cred-alice", "alice").with_device_attestation("alice-phone"))
        .unwrap();

    let ledger = Arc::new(RedemptionLedger::new());
    let issuer = ProofIssuer::new(
        Arc::clone(&keys),
        credentials.clone(),
        Arc::clone(&ledger),
        IssuerConfig::default(),
    );
    let verifier = ProofVerifier::new(Arc::clone(&keys), Arc::clone(&ledger));

    // ── Step 2: Register the agent ───────────────────────────────────────
    let store: Arc<dyn TrustRecordStore> =
        Arc::new(FileRecordStore::new(dir.path().join("trust")).unwrap());
    let registry = TrustRegistry::with_store(RegistryConfig::default(), Arc::clone(&store)).unwrap();
    registry
        .register("shopper-bot", "alice", Some("Shopper".into()), Some("2.1.0".into()))
        .unwrap();
    assert!(registry.resolve("shopper-bot", "alice").trusted);

    // ── Step 3: Issue a proof ────────────────────────────────────────────
    let request = ProofRequest::new(
        Principal::new("alice", "cred-alice").with_device_attestation("alice-phone"),
        Agent::new("shopper-bot", "Shopper", "2.1.0"),
        Intent::new("purchase", "shop.example.com", "/checkout", "POST")
            .with_parameter("amount", json!(42.5)),
    )
    .with_constraints(
        Constraints::single_use()
            .with_max_amount(100.0)
            .with_allowed_recipients(["merchant-7"]),
    )
    .expires_in(120);
    let proof = issuer.create(request).expect("issuance should succeed");
    assert_eq!(proof.kid, kid);

    // ── Step 4: Verify against the live transaction ─────────────────────
    let wrong_recipient = ExecutionContext::default().with_recipient("merchant-9");
    let rejected = verifier.verify_with_context(&proof.header, &wrong_recipient);
    assert!(!rejected.valid);
    assert_eq!(rejected.errors, vec![VerifyError::RecipientNotAllowed]);

    let context = ExecutionContext::default().with_recipient("merchant-7");
    let accepted = verifier.verify_with_context(&proof.header, &context);
    assert!(accepted.valid, "errors: {:?}", accepted.errors);
    assert_eq!(accepted.liability_accepted_by.as_deref(), Some("alice"));
    assert_eq!(accepted.agent_id.as_deref(), Some("shopper-bot"));

    let replay = verifier.verify_with_context(&proof.header, &context);
    assert_eq!(replay.errors, vec![VerifyError::AlreadyUsed]);

    registry.adjust_score("shopper-bot", "alice", 1).unwrap();
    assert_eq!(registry.resolve("shopper-bot", "alice").trust_score, 51);

    // ── Step 5: Revoke and re-register ───────────────────────────────────
    registry
        .revoke("shopper-bot", "alice", "lost device")
        .unwrap();
    let resolution = registry.resolve("shopper-bot", "alice");
    assert!(resolution.revoked);
    assert!(!resolution.trusted);

    registry.register("shopper-bot", "alice", None, None).unwrap();
    assert!(!registry.resolve("shopper-bot", "alice").revoked);

    // ── Step 6: Restart from disk ────────────────────────────────────────
    drop(registry);
    let reloaded_key = load_or_generate(&key_path, "operator-passphrase").unwrap();
    assert_eq!(reloaded_key.kid(), &kid);

    let registry = TrustRegistry::with_store(RegistryConfig::default(), store).unwrap();
    let record = registry.record("shopper-bot", "alice").unwrap();
    assert_eq!(record.trust_score, 51);
    assert!(!record.revoked);
    assert_eq!(record.history.len(), 4);

    // A proof from the old process still verifies with the reloaded key.
    let restarted = ProofVerifier::new(
        Arc::new(KeyRing::new(reloaded_key)),
        Arc::new(RedemptionLedger::new()),
    );
    let plain = issuer
        .create(ProofRequest::new(
            Principal::new("alice", "cred-alice").with_device_attestation("alice-phone"),
            Agent::new("shopper-bot", "Shopper", "2.1.0"),
            Intent::new("browse", "shop.example.com", "/catalog", "GET"),
        ))
        .unwrap();
    assert!(restarted.verify(&plain.header).valid);
}

#[test]
fn key_rotation_keeps_outstanding_proofs_valid() {
    let seed = [7u8; 32];
    let keys = Arc::new(KeyRing::new(ServiceKey::derive(&seed, 1).unwrap()));
    let credentials = Arc::new(MemoryCredentialStore::new());
    credentials.insert(Credential::new("c", "p")).unwrap();
    let ledger = Arc::new(RedemptionLedger::new());
    let issuer = ProofIssuer::new(
        Arc::clone(&keys),
        credentials,
        Arc::clone(&ledger),
        IssuerConfig::default(),
    );
    let verifier = ProofVerifier::new(Arc::clone(&keys), ledger);

    let request = || {
        ProofRequest::new(
            Principal::new("p", "c"),
            Agent::new("a", "Agent", "1"),
            Intent::new("read", "svc", "/r", "GET"),
        )
    };

    let before = issuer.create(request()).unwrap();
    let retired = keys.rotate(ServiceKey::derive(&seed, 2).unwrap());
    let after = issuer.create(request()).unwrap();

    assert_eq!(before.kid, retired);
    assert_ne!(after.kid, retired);
    assert!(verifier.verify(&before.header).valid);
    assert!(verifier.verify(&after.header).valid);

    keys.forget(&retired);
    assert_eq!(
        verifier.verify(&before.header).errors,
        vec![VerifyError::UnknownKey]
    );
}
