//! Endpoint resolution and core tunables.
//!
//! The single piece of external configuration is the endpoint name, a base
//! path from which the per-service socket paths are derived. Interval and
//! timeout defaults follow the protocol defaults (10 seconds each) and can
//! be overridden via environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default heartbeat interval (seconds).
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// Default deadline for unary RPC calls (seconds).
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// Environment variable naming the endpoint base path.
pub const ENDPOINT_ENV: &str = "HOSTLINK_ENDPOINT";

/// Environment variable overriding the heartbeat interval (seconds).
pub const HEARTBEAT_INTERVAL_ENV: &str = "HOSTLINK_HEARTBEAT_INTERVAL_SECS";

/// Environment variable overriding the unary RPC timeout (seconds).
pub const RPC_TIMEOUT_ENV: &str = "HOSTLINK_RPC_TIMEOUT_SECS";

/// The well-known local IPC endpoint.
///
/// A single base path fans out to sibling socket paths, one per service,
/// because each connection serves exactly one service: the lifecycle RPC
/// socket, the heartbeat stream socket, and the service-control socket.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: PathBuf,
}

impl Endpoint {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Resolves the endpoint from `HOSTLINK_ENDPOINT`, falling back to
    /// `hostlink` under the system temp directory.
    pub fn from_env() -> Self {
        let base = std::env::var_os(ENDPOINT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("hostlink"));
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Socket path for the unary lifecycle service (ping, register).
    pub fn lifecycle_path(&self) -> PathBuf {
        self.base.with_extension("sock")
    }

    /// Socket path for heartbeat streams.
    pub fn heartbeat_path(&self) -> PathBuf {
        self.base.with_extension("hb.sock")
    }

    /// Socket path for the service-control surface.
    pub fn control_path(&self) -> PathBuf {
        self.base.with_extension("ctl.sock")
    }
}

/// Tunables shared by host and plugin.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Endpoint,
    pub heartbeat_interval: Duration,
    pub rpc_timeout: Duration,
}

impl Config {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
        }
    }

    /// Builds a config from the environment: endpoint plus optional interval
    /// and timeout overrides.
    pub fn from_env() -> Self {
        Self {
            endpoint: Endpoint::from_env(),
            heartbeat_interval: Duration::from_secs(env_secs(
                HEARTBEAT_INTERVAL_ENV,
                DEFAULT_HEARTBEAT_INTERVAL_SECS,
            )),
            rpc_timeout: Duration::from_secs(env_secs(RPC_TIMEOUT_ENV, DEFAULT_RPC_TIMEOUT_SECS)),
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }
}

fn env_secs(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
