//! Property-based tests for Liability Proofs.
//!
//! For arbitrary principals, agents, intents and lifetimes:
//! 1. A freshly issued proof verifies and echoes its identities
//! 2. Every proof is expired after `expires_at`
//! 3. The header reproduces the exact signed payload
//! 4. Flipping any payload byte breaks the signature

use std::sync::Arc;

use agentproof::credential::{Credential, CredentialStore, MemoryCredentialStore};
use agentproof::crypto::{KeyRing, ServiceKey};
use agentproof::proof::header::{decode_header, ProofEnvelope};
use agentproof::proof::{
    Agent, Intent, IssuerConfig, Principal, ProofIssuer, ProofRequest, ProofVerifier,
    RedemptionLedger, VerifyError,
};
use chrono::Duration;
use proptest::prelude::*;

struct Service {
    issuer: ProofIssuer,
    verifier: ProofVerifier,
}

fn service(principal: &str) -> Service {
    let keys = Arc::new(KeyRing::new(ServiceKey::generate()));
    let ledger = Arc::new(RedemptionLedger::new());
    let credentials = MemoryCredentialStore::new();
    credentials
        .insert(Credential::new(format!("cred-{principal}"), principal))
        .expect("credential insert should succeed");
    Service {
        issuer: ProofIssuer::new(
            Arc::clone(&keys),
            Arc::new(credentials),
            Arc::clone(&ledger),
            IssuerConfig::default(),
        ),
        verifier: ProofVerifier::new(keys, ledger),
    }
}

fn request(principal: &str, agent: &str, action: &str, service: &str, ttl: i64) -> ProofRequest {
    ProofRequest::new(
        Principal::new(principal, format!("cred-{principal}")),
        Agent::new(agent, "Agent", "1.0.0"),
        Intent::new(action, service, "/v1/act", "POST"),
    )
    .expires_in(ttl)
}

// =============================================================================
// Issue then verify
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_create_then_verify_is_valid(
        principal in "[a-z][a-z0-9_-]{2,15}",
        agent in "[a-z][a-z0-9.-]{2,20}",
        action in "[a-z_]{1,12}",
        svc in "[a-z]{3,10}\\.[a-z]{2,4}",
        ttl in 1i64..=86_400,
    ) {
        let s = service(&principal);
        let proof = s.issuer.create(request(&principal, &agent, &action, &svc, ttl)).unwrap();
        let result = s.verifier.verify(&proof.header);

        prop_assert!(result.valid, "errors: {:?}", result.errors);
        prop_assert_eq!(result.principal_id.as_deref(), Some(principal.as_str()));
        prop_assert_eq!(result.agent_id.as_deref(), Some(agent.as_str()));
        prop_assert_eq!(result.liability_accepted_by.as_deref(), Some(principal.as_str()));
        let intent = result.intent.unwrap();
        prop_assert_eq!(intent.action, action);
        prop_assert_eq!(intent.target.service, svc);
    }

    #[test]
    fn prop_verify_after_expiry_is_expired(
        ttl in 1i64..=86_400,
        late_by in 1i64..=100_000,
    ) {
        let s = service("p");
        let proof = s.issuer.create(request("p", "a", "act", "svc.io", ttl)).unwrap();
        let at = proof.expires_at() + Duration::seconds(late_by);
        let result = s.verifier.verify_at(&proof.header, at);

        prop_assert!(!result.valid);
        prop_assert!(result.has_error(VerifyError::Expired));
        prop_assert!(result.liability_accepted_by.is_none());
    }

    #[test]
    fn prop_header_reproduces_signed_payload(
        principal in "[a-z]{1,12}",
        amount in 0u64..1_000_000_000,
    ) {
        let s = service(&principal);
        let mut req = request(&principal, "agent", "pay", "bank.io", 300);
        req.intent = req.intent.with_parameter("amount", serde_json::json!(amount));
        let proof = s.issuer.create(req).unwrap();

        let decoded = decode_header(&proof.header).unwrap();
        prop_assert_eq!(decoded.payload().unwrap(), proof.payload);
    }

    #[test]
    fn prop_flipping_any_payload_byte_breaks_signature(
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let s = service("p");
        let proof = s.issuer.create(request("p", "a", "act", "svc.io", 300)).unwrap();
        let envelope = ProofEnvelope::parse(&proof.header).unwrap();
        let mut bytes = envelope.payload_bytes().unwrap();
        let i = index.index(bytes.len());
        bytes[i] ^= mask;

        let tampered = envelope.with_payload_bytes(&bytes).encode();
        let result = s.verifier.verify(&tampered);
        prop_assert!(!result.valid);
        prop_assert_eq!(result.errors, vec![VerifyError::BadSignature]);
    }
}
