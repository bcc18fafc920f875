//! Concurrency test: parallel trust registry mutations and lookups.
//!
//! Validates that per-pair mutations never lose updates and that
//! independent pairs proceed in parallel with consistent results.

use std::sync::Arc;
use std::thread;

use agentproof::registry::{RegistryConfig, TrustEventKind, TrustRegistry};
use agentproof::storage::FileRecordStore;

fn wide_config() -> RegistryConfig {
    RegistryConfig {
        initial_trust_score: 0,
        max_trust_score: 1_000_000,
        ..RegistryConfig::default()
    }
}

#[test]
fn stress_score_adjustments_are_not_lost() {
    let registry = Arc::new(TrustRegistry::new(wide_config()));
    registry.register("agent", "principal", None, None).unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..250 {
                    registry.adjust_score("agent", "principal", 1).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let record = registry.record("agent", "principal").unwrap();
    assert_eq!(record.trust_score, 4_000);
    // One registration plus one event per adjustment.
    assert_eq!(record.history.len(), 4_001);
}

#[test]
fn stress_100_pairs_registered_in_parallel() {
    let registry = Arc::new(TrustRegistry::new(RegistryConfig::default()));

    let handles: Vec<_> = (0..10)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..10 {
                    let agent = format!("agent-{t}-{i}");
                    registry
                        .register(&agent, "principal", Some(agent.clone()), None)
                        .unwrap();
                    // Racing re-registration of the same pair is a no-op.
                    registry
                        .register(&agent, "principal", Some(agent.clone()), None)
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(registry.len(), 100);
    for t in 0..10 {
        for i in 0..10 {
            let record = registry
                .record(&format!("agent-{t}-{i}"), "principal")
                .unwrap();
            assert_eq!(record.trust_score, 50);
            assert_eq!(record.history.len(), 1);
        }
    }
}

#[test]
fn stress_revoke_register_race_leaves_consistent_history() {
    let registry = Arc::new(TrustRegistry::new(RegistryConfig::default()));
    registry.register("a", "p", None, None).unwrap();

    let revoker = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for i in 0..200 {
                registry.revoke("a", "p", &format!("round {i}")).unwrap();
            }
        })
    };
    let registrar = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..200 {
                registry.register("a", "p", None, None).unwrap();
            }
        })
    };
    let reader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..1_000 {
                let r = registry.resolve("a", "p");
                // A revoked pair is never reported as trusted.
                assert!(!(r.revoked && r.trusted));
            }
        })
    };
    revoker.join().unwrap();
    registrar.join().unwrap();
    reader.join().unwrap();

    let record = registry.record("a", "p").unwrap();
    let revocations = record
        .history
        .iter()
        .filter(|e| matches!(e.kind, TrustEventKind::Revoked { .. }))
        .count();
    assert_eq!(revocations, 200);

    // The final flag agrees with the last revoke/reinstate event.
    let last = record
        .history
        .iter()
        .rev()
        .find(|e| matches!(e.kind, TrustEventKind::Revoked { .. } | TrustEventKind::Reinstated))
        .unwrap();
    assert_eq!(
        record.revoked,
        matches!(last.kind, TrustEventKind::Revoked { .. })
    );
}

#[test]
fn stress_persistent_registry_concurrent_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileRecordStore::new(dir.path()).unwrap());
    let registry = Arc::new(
        TrustRegistry::with_store(RegistryConfig::default(), store.clone()).unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let agent = format!("agent-{t}");
                registry.register(&agent, "p", None, None).unwrap();
                for _ in 0..10 {
                    registry.adjust_score(&agent, "p", 1).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    drop(registry);

    let reloaded = TrustRegistry::with_store(RegistryConfig::default(), store).unwrap();
    assert_eq!(reloaded.len(), 8);
    for t in 0..8 {
        assert_eq!(reloaded.resolve(&format!("agent-{t}"), "p").trust_score, 60);
    }
}
