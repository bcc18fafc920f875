//! Redemption ledger for single-use proofs.
//!
//! The issuer registers every single-use proof here; the verifier redeems
//! it. Redemption is an atomic check-and-mark under the lock of the shard
//! that owns the proof ID, so two concurrent verifications of the same
//! proof can never both observe it unredeemed.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::types::ProofId;

const SHARD_COUNT: usize = 16;

/// Outcome of a redemption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    /// First redemption; the proof is now spent.
    Redeemed,
    /// The proof was redeemed before.
    AlreadyUsed,
    /// The ledger has no entry for this proof.
    Unknown,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    expires_at: DateTime<Utc>,
    redeemed_at: Option<DateTime<Utc>>,
}

/// Sharded map of single-use proof IDs to their redemption state.
pub struct RedemptionLedger {
    shards: Vec<Mutex<HashMap<ProofId, LedgerEntry>>>,
}

impl RedemptionLedger {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
        }
    }

    fn shard(&self, id: &ProofId) -> &Mutex<HashMap<ProofId, LedgerEntry>> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }

    /// Record a freshly issued single-use proof as unredeemed.
    pub fn register(&self, id: &ProofId, expires_at: DateTime<Utc>) {
        let mut shard = self.shard(id).lock().unwrap_or_else(PoisonError::into_inner);
        shard.entry(id.clone()).or_insert(LedgerEntry {
            expires_at,
            redeemed_at: None,
        });
    }

    /// Atomically redeem a proof.
    pub fn redeem(&self, id: &ProofId, now: DateTime<Utc>) -> Redemption {
        let mut shard = self.shard(id).lock().unwrap_or_else(PoisonError::into_inner);
        match shard.get_mut(id) {
            None => Redemption::Unknown,
            Some(entry) if entry.redeemed_at.is_some() => Redemption::AlreadyUsed,
            Some(entry) => {
                entry.redeemed_at = Some(now);
                log::debug!("redeemed single-use proof {id}");
                Redemption::Redeemed
            }
        }
    }

    /// Read the redemption state without changing it.
    ///
    /// `None` when the ledger has no entry for the proof.
    pub fn is_redeemed(&self, id: &ProofId) -> Option<bool> {
        let shard = self.shard(id).lock().unwrap_or_else(PoisonError::into_inner);
        shard.get(id).map(|entry| entry.redeemed_at.is_some())
    }

    /// Drop entries whose proofs have expired. Returns how many were dropped.
    ///
    /// Expired proofs fail verification on expiry alone, so their
    /// redemption state is no longer needed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut purged = 0;
        for shard in &self.shards {
            let mut shard = shard.lock().unwrap_or_else(PoisonError::into_inner);
            let before = shard.len();
            shard.retain(|_, entry| entry.expires_at >= now);
            purged += before - shard.len();
        }
        if purged > 0 {
            log::debug!("purged {purged} expired ledger entries");
        }
        purged
    }

    /// Number of tracked proofs.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RedemptionLedger {
    fn default() -> Self {
        Self::new()
    }
}
