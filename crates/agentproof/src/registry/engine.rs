//! Trust Registry engine.
//!
//! Records sit behind per-key mutexes inside an outer map lock that is
//! only held long enough to find or create a key's slot. Mutations of one
//! pair serialize on its mutex; other pairs are never blocked. Every
//! mutation is applied to a copy, persisted, and only then committed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::record::{
    RegistryConfig, RevocationEntry, TrustEventKind, TrustKey, TrustRecord, TrustResolution,
};
use crate::error::{ProofError, Result};
use crate::storage::TrustRecordStore;

/// `None` marks a slot whose first registration has not committed.
type Slot = Arc<Mutex<Option<TrustRecord>>>;

/// Mapping of (agent, principal) pairs to trust state.
pub struct TrustRegistry {
    config: RegistryConfig,
    slots: RwLock<HashMap<TrustKey, Slot>>,
    store: Option<Arc<dyn TrustRecordStore>>,
}

impl TrustRegistry {
    /// In-memory registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            slots: RwLock::new(HashMap::new()),
            store: None,
        }
    }

    /// Registry backed by a store. Existing records are loaded up front.
    pub fn with_store(config: RegistryConfig, store: Arc<dyn TrustRecordStore>) -> Result<Self> {
        let records = store.load_all()?;
        log::info!("loaded {} trust records", records.len());
        let slots = records
            .into_iter()
            .map(|record| (record.key(), Arc::new(Mutex::new(Some(record)))))
            .collect();
        Ok(Self {
            config,
            slots: RwLock::new(slots),
            store: Some(store),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn slot(&self, key: &TrustKey) -> Option<Slot> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).cloned()
    }

    fn slot_or_insert(&self, key: &TrustKey) -> Slot {
        if let Some(slot) = self.slot(key) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn commit(&self, current: &mut Option<TrustRecord>, next: TrustRecord) -> Result<()> {
        if let Some(store) = &self.store {
            store.persist(&next)?;
        }
        *current = Some(next);
        Ok(())
    }

    /// Look up a pair. Unknown pairs get a neutral, untrusted answer.
    pub fn resolve(&self, agent_id: &str, principal_id: &str) -> TrustResolution {
        self.record(agent_id, principal_id)
            .map(|record| record.resolution(&self.config))
            .unwrap_or_else(|| TrustResolution::unknown(&self.config))
    }

    /// Snapshot of a pair's full record.
    pub fn record(&self, agent_id: &str, principal_id: &str) -> Option<TrustRecord> {
        let slot = self.slot(&TrustKey::new(agent_id, principal_id))?;
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Register a pair, or refresh it.
    ///
    /// Re-registering a revoked pair reinstates it. Metadata is only
    /// overwritten by values that are supplied. Re-registering with
    /// unchanged metadata changes nothing, score included.
    pub fn register(
        &self,
        agent_id: &str,
        principal_id: &str,
        agent_name: Option<String>,
        agent_version: Option<String>,
    ) -> Result<()> {
        self.register_at(
            agent_id,
            principal_id,
            agent_name,
            agent_version,
            crate::time::now(),
        )
    }

    pub fn register_at(
        &self,
        agent_id: &str,
        principal_id: &str,
        agent_name: Option<String>,
        agent_version: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        require("agent_id", agent_id)?;
        require("principal_id", principal_id)?;
        let key = TrustKey::new(agent_id, principal_id);
        let slot = self.slot_or_insert(&key);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(existing) = guard.as_ref() else {
            let record = TrustRecord::new(&key, agent_name, agent_version, &self.config, now);
            self.commit(&mut guard, record)?;
            log::info!("registered trust pair {key}");
            return Ok(());
        };

        let mut next = existing.clone();
        let mut changed = false;
        if next.revoked {
            next.revoked = false;
            next.revocation = None;
            next.record_event(TrustEventKind::Reinstated, now);
            changed = true;
        }
        let name_changed = agent_name.is_some() && agent_name != next.agent_name;
        let version_changed = agent_version.is_some() && agent_version != next.agent_version;
        if name_changed || version_changed {
            if name_changed {
                next.agent_name = agent_name;
            }
            if version_changed {
                next.agent_version = agent_version;
            }
            next.record_event(TrustEventKind::Refreshed, now);
            changed = true;
        }

        if changed {
            self.commit(&mut guard, next)?;
            log::info!("refreshed trust pair {key}");
        }
        Ok(())
    }

    /// Revoke a pair. The record stays; only its flag changes.
    pub fn revoke(&self, agent_id: &str, principal_id: &str, reason: &str) -> Result<()> {
        self.revoke_at(agent_id, principal_id, reason, crate::time::now())
    }

    pub fn revoke_at(
        &self,
        agent_id: &str,
        principal_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let key = TrustKey::new(agent_id, principal_id);
        let unknown = || ProofError::UnknownTrustRecord {
            agent_id: agent_id.to_string(),
            principal_id: principal_id.to_string(),
        };

        let slot = self.slot(&key).ok_or_else(unknown)?;
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.as_ref().ok_or_else(unknown)?.clone();

        next.revoked = true;
        next.revocation = Some(RevocationEntry {
            reason: reason.to_string(),
            revoked_at: now,
        });
        next.record_event(
            TrustEventKind::Revoked {
                reason: reason.to_string(),
            },
            now,
        );
        self.commit(&mut guard, next)?;
        log::warn!("revoked trust pair {key}: {reason}");
        Ok(())
    }

    /// Move a pair's score by `delta`, clamped to `0..=max_trust_score`.
    /// Returns the new score.
    pub fn adjust_score(&self, agent_id: &str, principal_id: &str, delta: i64) -> Result<i64> {
        let key = TrustKey::new(agent_id, principal_id);
        let unknown = || ProofError::UnknownTrustRecord {
            agent_id: agent_id.to_string(),
            principal_id: principal_id.to_string(),
        };

        let slot = self.slot(&key).ok_or_else(unknown)?;
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let current = guard.as_ref().ok_or_else(unknown)?;

        let score = current
            .trust_score
            .saturating_add(delta)
            .clamp(0, self.config.max_trust_score);
        if score == current.trust_score {
            return Ok(score);
        }

        let mut next = current.clone();
        let applied = score - next.trust_score;
        next.trust_score = score;
        next.record_event(
            TrustEventKind::ScoreAdjusted {
                delta: applied,
                score,
            },
            crate::time::now(),
        );
        self.commit(&mut guard, next)?;
        log::debug!("trust pair {key} score now {score}");
        Ok(score)
    }

    /// Number of registered pairs.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            slots.values().cloned().collect()
        };
        slots
            .iter()
            .filter(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TrustRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustRegistry")
            .field("config", &self.config)
            .field("persistent", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ProofError::InvalidRequest(format!("{field} is required")));
    }
    Ok(())
}
