//! Trust records: the state behind one (agent, principal) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Registry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Score given to a newly registered pair.
    pub initial_trust_score: i64,
    /// Lowest score at which an unrevoked pair counts as trusted.
    pub min_trusted_score: i64,
    /// Upper clamp for score adjustments.
    pub max_trust_score: i64,
    /// Freshness window returned for registered pairs, in seconds.
    pub ttl_secs: u64,
    /// Freshness window returned for unknown pairs, in seconds.
    pub negative_ttl_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_trust_score: 50,
            min_trusted_score: 1,
            max_trust_score: 100,
            ttl_secs: 300,
            negative_ttl_secs: 60,
        }
    }
}

/// Registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrustKey {
    pub agent_id: String,
    pub principal_id: String,
}

impl TrustKey {
    pub fn new(agent_id: impl Into<String>, principal_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            principal_id: principal_id.into(),
        }
    }

    /// Stable hex digest of the pair, safe to use as a file name.
    ///
    /// Each ID is length-prefixed, so no two distinct pairs share an input.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for field in [&self.agent_id, &self.principal_id] {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Display for TrustKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.agent_id, self.principal_id)
    }
}

/// Why and when a pair was revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    pub reason: String,
    pub revoked_at: DateTime<Utc>,
}

/// What happened to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrustEventKind {
    Registered,
    /// Agent metadata changed on re-registration.
    Refreshed,
    Revoked { reason: String },
    Reinstated,
    ScoreAdjusted { delta: i64, score: i64 },
}

/// One entry of a record's append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustEvent {
    pub at: DateTime<Utc>,
    pub kind: TrustEventKind,
}

/// Trust state of an (agent, principal) pair.
///
/// Never deleted: revocation is a flag and every change is appended to
/// `history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRecord {
    pub agent_id: String,
    pub principal_id: String,
    pub agent_name: Option<String>,
    pub agent_version: Option<String>,
    pub trust_score: i64,
    pub revoked: bool,
    pub revocation: Option<RevocationEntry>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<TrustEvent>,
}

impl TrustRecord {
    pub(crate) fn new(
        key: &TrustKey,
        agent_name: Option<String>,
        agent_version: Option<String>,
        config: &RegistryConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id: key.agent_id.clone(),
            principal_id: key.principal_id.clone(),
            agent_name,
            agent_version,
            trust_score: config.initial_trust_score,
            revoked: false,
            revocation: None,
            registered_at: now,
            updated_at: now,
            history: vec![TrustEvent {
                at: now,
                kind: TrustEventKind::Registered,
            }],
        }
    }

    pub fn key(&self) -> TrustKey {
        TrustKey::new(&self.agent_id, &self.principal_id)
    }

    pub(crate) fn record_event(&mut self, kind: TrustEventKind, now: DateTime<Utc>) {
        self.updated_at = now;
        self.history.push(TrustEvent { at: now, kind });
    }

    /// Unrevoked and at or above the trusted score.
    pub fn is_trusted(&self, min_trusted_score: i64) -> bool {
        !self.revoked && self.trust_score >= min_trusted_score
    }

    /// Answer for this record under the registry's current settings.
    pub fn resolution(&self, config: &RegistryConfig) -> TrustResolution {
        TrustResolution {
            trusted: self.is_trusted(config.min_trusted_score),
            trust_score: self.trust_score,
            ttl: config.ttl_secs,
            revoked: self.revoked,
        }
    }
}

/// Answer to a trust lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustResolution {
    pub trusted: bool,
    pub trust_score: i64,
    /// Seconds the caller may cache this answer.
    pub ttl: u64,
    pub revoked: bool,
}

impl TrustResolution {
    /// Neutral answer for a pair that was never registered.
    pub fn unknown(config: &RegistryConfig) -> Self {
        Self {
            trusted: false,
            trust_score: 0,
            ttl: config.negative_ttl_secs,
            revoked: false,
        }
    }
}
