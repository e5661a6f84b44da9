//! Wire types for the plugin lifecycle protocol.
//!
//! `PluginInfo` is the full identity/build record a plugin presents once at
//! registration; `PluginState` is the liveness-tracking subset the heartbeat
//! hot path touches. The two are kept as separate records keyed by the same
//! cookie key so heartbeat handling never walks the full info blob.

use crate::rpc::LifecycleError;
use serde::{Deserialize, Serialize};

/// Status code for a plugin with a recent heartbeat.
pub const PLUGIN_ACTIVE: i32 = 1;

/// Current Unix timestamp in seconds.
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Identity and build metadata supplied once at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub version: String,
    pub app_name: String,
    pub git_hash: String,
    pub git_branch: String,
    pub build_time: String,
    pub runtime_version: String,
    /// Unique identity token; the primary key of the registry.
    pub cookie_key: String,
    /// Opaque credential available to the admission verifier.
    pub cookie_value: String,
    /// Unix seconds of the last accepted heartbeat.
    pub last_heartbeat_time: i64,
    pub state: i32,
}

impl PluginInfo {
    /// Builds a registration record for this process, filling build metadata
    /// captured at compile time (git SHA/branch, build timestamp, rustc
    /// version).
    pub fn for_current_process(
        app_name: impl Into<String>,
        cookie_key: impl Into<String>,
        cookie_value: impl Into<String>,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            app_name: app_name.into(),
            git_hash: env!("HOSTLINK_GIT_SHA").to_string(),
            git_branch: env!("HOSTLINK_GIT_BRANCH").to_string(),
            build_time: env!("HOSTLINK_BUILD_TIMESTAMP").to_string(),
            runtime_version: env!("HOSTLINK_RUSTC_VERSION").to_string(),
            cookie_key: cookie_key.into(),
            cookie_value: cookie_value.into(),
            last_heartbeat_time: 0,
            state: 0,
        }
    }
}

/// The liveness-tracking subset of a plugin record.
///
/// Exists iff a `PluginInfo` with the same cookie key was admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginState {
    pub cookie_key: String,
    pub last_heartbeat_time: i64,
    pub state: i32,
}

impl PluginState {
    /// Creates an active state record stamped with the current time.
    pub fn new(cookie_key: String) -> Self {
        Self {
            cookie_key,
            last_heartbeat_time: now_ts(),
            state: PLUGIN_ACTIVE,
        }
    }

    /// Records an accepted heartbeat.
    pub fn mark_active(&mut self, timestamp: i64) {
        self.last_heartbeat_time = timestamp;
        self.state = PLUGIN_ACTIVE;
    }
}

/// One client-pushed heartbeat on the duplex stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatMessage {
    pub cookie_key: String,
    pub message: String,
    /// Unix seconds, as observed by the sender.
    pub timestamp: i64,
    /// Resident memory in bytes.
    pub memory_usage: f64,
    /// CPU usage in percent.
    pub cpu_usage: f64,
}

/// Unary response payload (`"pong"` for ping, `"ok"` for register).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
    pub timestamp: i64,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: now_ts(),
        }
    }
}

/// The single server→client response on a heartbeat stream.
///
/// Sent only on error paths; a clean end-of-stream produces nothing. Carries
/// the structured error so callers can tell `NotFound` from validation
/// failures without parsing display text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatClose {
    pub error: LifecycleError,
    pub timestamp: i64,
}

impl HeartbeatClose {
    pub fn new(error: LifecycleError) -> Self {
        Self {
            error,
            timestamp: now_ts(),
        }
    }
}
