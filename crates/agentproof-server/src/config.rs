//! Server configuration, from flags or environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use agentproof::proof::MAX_TTL_CEILING_SECS;
use agentproof::{IssuerConfig, RegistryConfig};

/// AgentProof HTTP service.
#[derive(Debug, Clone, Parser)]
#[command(name = "agentproof-server", version, about)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "AGENTPROOF_BIND", default_value = "0.0.0.0:5002")]
    pub bind: SocketAddr,

    /// Maximum log level (error, warn, info, debug, trace).
    #[arg(long, env = "AGENTPROOF_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Encrypted service key file (.apk). Without it an ephemeral key is used.
    #[arg(long, env = "AGENTPROOF_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Passphrase for the key file.
    #[arg(
        long,
        env = "AGENTPROOF_KEY_PASSPHRASE",
        hide_env_values = true,
        requires = "key_file"
    )]
    pub key_passphrase: Option<String>,

    /// Create the key file if it does not exist.
    #[arg(long, requires = "key_file")]
    pub generate_key: bool,

    /// Directory for persistent trust records. Without it the registry
    /// lives in memory only.
    #[arg(long, env = "AGENTPROOF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// JSON file of credentials to load at startup.
    #[arg(long, env = "AGENTPROOF_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// Longest proof lifetime accepted, in seconds (at most ten years).
    #[arg(
        long,
        env = "AGENTPROOF_MAX_TTL_SECS",
        default_value_t = 86_400,
        value_parser = clap::value_parser!(i64).range(1..=MAX_TTL_CEILING_SECS)
    )]
    pub max_ttl_secs: i64,

    /// Cache lifetime returned with trust resolutions, in seconds.
    #[arg(long, env = "AGENTPROOF_TRUST_TTL_SECS", default_value_t = 300)]
    pub trust_ttl_secs: u64,
}

impl ServerConfig {
    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }

    pub fn issuer_config(&self) -> IssuerConfig {
        IssuerConfig {
            max_ttl_secs: self.max_ttl_secs,
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            ttl_secs: self.trust_ttl_secs,
            ..RegistryConfig::default()
        }
    }

    /// Where trust records are stored, if anywhere.
    pub fn trust_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("trust"))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::parse_from(["agentproof-server"])
    }
}
