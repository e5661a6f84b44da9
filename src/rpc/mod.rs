//! RPC service definitions and the error taxonomy shared across them.
//!
//! - [`lifecycle`]: the core plugin lifecycle service (ping, register).
//! - [`control`]: the independent service-control surface for host-managed
//!   services; no shared state with the lifecycle protocol.

pub mod control;
pub mod lifecycle;

use serde::{Deserialize, Serialize};

pub use crate::protocol::{Ack, HeartbeatClose, HeartbeatMessage, PluginInfo, PluginState};

/// Errors surfaced by the lifecycle service, on unary calls and as the
/// terminal response of a heartbeat stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LifecycleError {
    /// Registration or heartbeat presented an empty cookie key.
    EmptyCookieKey,
    /// The admission verifier declined the candidate.
    AdmissionRejected { reason: String },
    /// The cookie key is already registered; re-registration requires a host
    /// restart (single-admission policy).
    AlreadyExists { cookie_key: String },
    /// Heartbeat for a cookie key that was never admitted.
    NotFound { cookie_key: String },
    /// Receive or decode failure while serving a stream.
    Internal { message: String },
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleError::EmptyCookieKey => write!(f, "cookie key must not be empty"),
            LifecycleError::AdmissionRejected { reason } => {
                write!(f, "plugin admission rejected: {}", reason)
            }
            LifecycleError::AlreadyExists { cookie_key } => {
                write!(f, "cookie key already registered: {}", cookie_key)
            }
            LifecycleError::NotFound { cookie_key } => {
                write!(f, "cookie key not registered: {}", cookie_key)
            }
            LifecycleError::Internal { message } => write!(f, "internal error: {}", message),
        }
    }
}

impl std::error::Error for LifecycleError {}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Client-side transport failure: a heartbeat send that did not reach the
/// host, or a process-stats sample that could not be taken. Never serialized.
#[derive(Debug)]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
#[path = "tests/rpc_tests.rs"]
mod tests;
