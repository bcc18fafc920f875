//! Shared application state.

use std::sync::Arc;

use anyhow::Context;

use agentproof::storage::{load_or_generate, load_service_key, FileRecordStore};
use agentproof::{
    IssuerConfig, KeyRing, MemoryCredentialStore, ProofIssuer, ProofVerifier, RedemptionLedger,
    RegistryConfig, ServiceKey, TrustRegistry,
};

use crate::config::ServerConfig;

/// Components shared by every handler.
pub struct AppState {
    pub keys: Arc<KeyRing>,
    pub ledger: Arc<RedemptionLedger>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub issuer: ProofIssuer,
    pub verifier: ProofVerifier,
    pub registry: TrustRegistry,
}

impl AppState {
    /// Wire the components together around an existing key, credential
    /// store and registry.
    pub fn new(
        key: ServiceKey,
        credentials: Arc<MemoryCredentialStore>,
        registry: TrustRegistry,
        issuer_config: IssuerConfig,
    ) -> Self {
        let keys = Arc::new(KeyRing::new(key));
        let ledger = Arc::new(RedemptionLedger::new());
        let issuer = ProofIssuer::new(
            Arc::clone(&keys),
            credentials.clone(),
            Arc::clone(&ledger),
            issuer_config,
        );
        let verifier = ProofVerifier::new(Arc::clone(&keys), Arc::clone(&ledger));

        Self {
            keys,
            ledger,
            credentials,
            issuer,
            verifier,
            registry,
        }
    }

    /// Build the state described by the server configuration.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let issuer_config = config.issuer_config();
        issuer_config.validate().context("invalid --max-ttl-secs")?;

        let key = match &config.key_file {
            Some(path) => {
                let passphrase = config
                    .key_passphrase
                    .as_deref()
                    .context("--key-passphrase is required with --key-file")?;
                let key = if config.generate_key {
                    load_or_generate(path, passphrase)
                } else {
                    load_service_key(path, passphrase)
                };
                key.with_context(|| format!("loading service key {}", path.display()))?
            }
            None => {
                let key = ServiceKey::generate();
                tracing::warn!(
                    kid = %key.kid(),
                    "no key file configured; proofs are signed with an ephemeral key"
                );
                key
            }
        };

        let credentials = match &config.credentials_file {
            Some(path) => MemoryCredentialStore::from_json_file(path)
                .with_context(|| format!("loading credentials {}", path.display()))?,
            None => MemoryCredentialStore::new(),
        };
        tracing::info!(count = credentials.len(), "credentials loaded");

        let registry = match config.trust_dir() {
            Some(dir) => {
                let store = FileRecordStore::new(&dir)
                    .with_context(|| format!("opening trust store {}", dir.display()))?;
                let registry = TrustRegistry::with_store(config.registry_config(), Arc::new(store))
                    .context("loading trust records")?;
                tracing::info!(records = registry.len(), dir = %dir.display(), "trust registry loaded");
                registry
            }
            None => TrustRegistry::new(config.registry_config()),
        };

        Ok(Self::new(
            key,
            Arc::new(credentials),
            registry,
            issuer_config,
        ))
    }

    /// In-memory state with a fresh key and default limits.
    pub fn ephemeral() -> Self {
        Self::new(
            ServiceKey::generate(),
            Arc::new(MemoryCredentialStore::new()),
            TrustRegistry::new(RegistryConfig::default()),
            IssuerConfig::default(),
        )
    }
}
