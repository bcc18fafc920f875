//! Time utilities for AgentProof.
//!
//! Proof timestamps are UTC `chrono` instants, serialized as RFC 3339.

use chrono::{DateTime, SecondsFormat, Utc};

/// Return the current time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format an instant as an RFC 3339 string with millisecond precision.
pub fn to_rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
