//! Edge case tests: hostile headers, boundary lifetimes, odd intents.

use std::sync::Arc;

use agentproof::credential::{Credential, CredentialStore, MemoryCredentialStore};
use agentproof::crypto::{KeyRing, ServiceKey};
use agentproof::proof::header::{ProofEnvelope, MAX_HEADER_LEN};
use agentproof::proof::{
    Agent, Constraints, Intent, IssuerConfig, Principal, ProofIssuer, ProofRequest, ProofVerifier,
    RedemptionLedger, VerifyError,
};
use agentproof::ProofError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use serde_json::json;

fn setup(max_ttl_secs: i64) -> (ProofIssuer, ProofVerifier) {
    let keys = Arc::new(KeyRing::new(ServiceKey::generate()));
    let ledger = Arc::new(RedemptionLedger::new());
    let credentials = MemoryCredentialStore::new();
    credentials.insert(Credential::new("cred", "user")).unwrap();
    (
        ProofIssuer::new(
            Arc::clone(&keys),
            Arc::new(credentials),
            Arc::clone(&ledger),
            IssuerConfig { max_ttl_secs },
        ),
        ProofVerifier::new(keys, ledger),
    )
}

fn request() -> ProofRequest {
    ProofRequest::new(
        Principal::new("user", "cred"),
        Agent::new("agent", "Agent", "1.0.0"),
        Intent::new("act", "svc.io", "/", "POST"),
    )
}

#[test]
fn edge_hostile_headers_are_malformed() {
    let (_, verifier) = setup(3_600);
    let oversized = "A".repeat(MAX_HEADER_LEN + 10);
    let not_json = URL_SAFE_NO_PAD.encode("hello");
    let wrong_shape = URL_SAFE_NO_PAD.encode(r#"{"v":"one"}"#);
    let bad_sig = URL_SAFE_NO_PAD.encode(
        r#"{"v":1,"alg":"Ed25519","kid":"apk_x","payload":"e30","sig":"AAAA"}"#,
    );
    for header in [
        "",
        "\u{0}\u{1}",
        "🦀🦀🦀",
        "====",
        oversized.as_str(),
        not_json.as_str(),
        wrong_shape.as_str(),
        bad_sig.as_str(),
    ] {
        let result = verifier.verify(header);
        assert!(!result.valid);
        assert_eq!(result.errors, vec![VerifyError::Malformed], "{header:.40}");
    }
}

#[test]
fn edge_signed_non_payload_is_malformed() {
    // Authentic signature over bytes that are not a proof payload.
    let key = ServiceKey::generate();
    let kid = key.kid().clone();
    let bytes = br#"{"hello":"world"}"#;
    let sig = key.sign(bytes);
    let header = ProofEnvelope::new(kid, bytes, &sig).encode();

    let verifier = ProofVerifier::new(
        Arc::new(KeyRing::new(key)),
        Arc::new(RedemptionLedger::new()),
    );
    assert_eq!(verifier.verify(&header).errors, vec![VerifyError::Malformed]);
}

#[test]
fn edge_lifetime_boundaries() {
    let (issuer, verifier) = setup(60);
    assert!(matches!(
        issuer.create(request().expires_in(61)),
        Err(ProofError::InvalidExpiry(_))
    ));

    let proof = issuer.create(request().expires_in(1)).unwrap();
    assert!(verifier.verify_at(&proof.header, proof.expires_at()).valid);
    let just_after = proof.expires_at() + Duration::milliseconds(1);
    assert_eq!(
        verifier.verify_at(&proof.header, just_after).errors,
        vec![VerifyError::Expired]
    );
}

#[test]
fn edge_unicode_and_large_intents() {
    let (issuer, verifier) = setup(3_600);
    let mut req = request();
    req.intent = Intent::new("überweisen", "bank.例え.jp", "/転送", "POST")
        .with_parameter("memo", json!("x".repeat(4_000)))
        .with_parameter("nested", json!({"a": [1, 2, {"b": null}]}));
    let proof = issuer.create(req).unwrap();

    let result = verifier.verify(&proof.header);
    assert!(result.valid);
    assert_eq!(result.intent.unwrap().target.endpoint, "/転送");
}

#[test]
fn edge_non_numeric_amount_is_not_evaluated() {
    let (issuer, verifier) = setup(3_600);
    let mut req = request().with_constraints(Constraints::default().with_max_amount(10.0));
    req.intent = req.intent.with_parameter("amount", json!("a lot"));
    let proof = issuer.create(req).unwrap();
    assert!(verifier.verify(&proof.header).valid);
}

#[test]
fn edge_header_whitespace_is_tolerated() {
    let (issuer, verifier) = setup(3_600);
    let proof = issuer.create(request()).unwrap();
    let padded = format!("  {}\n", proof.header);
    assert!(verifier.verify(&padded).valid);
}
