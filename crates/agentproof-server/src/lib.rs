//! HTTP API for AgentProof.
//!
//! Exposes proof issuance and verification, the trust registry and
//! credential provisioning under `/api/v1`, on axum.

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
