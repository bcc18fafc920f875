//! Concurrency test: single-use redemption under contention.
//!
//! Validates that no matter how many verifiers race on one single-use
//! proof, exactly one of them accepts it.

use std::sync::{Arc, Barrier};
use std::thread;

use agentproof::credential::{Credential, CredentialStore, MemoryCredentialStore};
use agentproof::crypto::{KeyRing, ServiceKey};
use agentproof::proof::{
    Agent, Constraints, Intent, IssuerConfig, Principal, ProofIssuer, ProofRequest, ProofVerifier,
    RedemptionLedger, VerifyError,
};

fn setup() -> (ProofIssuer, Arc<ProofVerifier>) {
    let keys = Arc::new(KeyRing::new(ServiceKey::generate()));
    let ledger = Arc::new(RedemptionLedger::new());
    let credentials = MemoryCredentialStore::new();
    credentials.insert(Credential::new("cred-1", "user-1")).unwrap();
    let issuer = ProofIssuer::new(
        Arc::clone(&keys),
        Arc::new(credentials),
        Arc::clone(&ledger),
        IssuerConfig::default(),
    );
    (issuer, Arc::new(ProofVerifier::new(keys, ledger)))
}

fn single_use_request(n: usize) -> ProofRequest {
    ProofRequest::new(
        Principal::new("user-1", "cred-1"),
        Agent::new("agent-1", "Racer", "1.0.0"),
        Intent::new("transfer", "bank.io", &format!("/transfer/{n}"), "POST"),
    )
    .with_constraints(Constraints::single_use())
}

#[test]
fn stress_two_verifiers_one_winner() {
    let (issuer, verifier) = setup();
    for round in 0..200 {
        let proof = issuer.create(single_use_request(round)).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let verifier = Arc::clone(&verifier);
                let barrier = Arc::clone(&barrier);
                let header = proof.header.clone();
                thread::spawn(move || {
                    barrier.wait();
                    verifier.verify(&header)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let valid = results.iter().filter(|r| r.valid).count();
        assert_eq!(valid, 1, "round {round}: {results:?}");
        let loser = results.iter().find(|r| !r.valid).unwrap();
        assert_eq!(loser.errors, vec![VerifyError::AlreadyUsed]);
    }
}

#[test]
fn stress_32_verifiers_many_proofs() {
    let (issuer, verifier) = setup();
    let headers: Arc<Vec<String>> = Arc::new(
        (0..100)
            .map(|n| issuer.create(single_use_request(n)).unwrap().header)
            .collect(),
    );

    let barrier = Arc::new(Barrier::new(32));
    let handles: Vec<_> = (0..32)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            let headers = Arc::clone(&headers);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                headers
                    .iter()
                    .map(|h| verifier.verify(h).valid)
                    .collect::<Vec<bool>>()
            })
        })
        .collect();

    let mut accepted = vec![0usize; headers.len()];
    for handle in handles {
        for (i, valid) in handle.join().unwrap().into_iter().enumerate() {
            if valid {
                accepted[i] += 1;
            }
        }
    }
    assert!(accepted.iter().all(|&n| n == 1), "{accepted:?}");
}

#[test]
fn stress_reusable_proofs_verify_concurrently() {
    let (issuer, verifier) = setup();
    let proof = issuer
        .create(ProofRequest::new(
            Principal::new("user-1", "cred-1"),
            Agent::new("agent-1", "Reader", "1.0.0"),
            Intent::new("read", "bank.io", "/balance", "GET"),
        ))
        .unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            let header = proof.header.clone();
            thread::spawn(move || (0..50).all(|_| verifier.verify(&header).valid))
        })
        .collect();

    for h in handles {
        assert!(h.join().unwrap());
    }
}
