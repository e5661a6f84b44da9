//! The plugin registry: admission and liveness bookkeeping.
//!
//! The registry owns two maps keyed by cookie key: the full `PluginInfo`
//! records and the `PluginState` liveness subset the heartbeat path touches.
//! It is a plain structure; the host wraps it in `Arc<tokio::sync::Mutex<_>>`
//! so concurrent streams and unary calls serialize through one lock.
//!
//! Admission is single-shot: a cookie key can never be re-registered while
//! the host lives, because removal is deliberately not implemented. A plugin
//! that crashes and restarts under the same cookie key must wait for a host
//! restart. There is no eviction or TTL expiry; staleness detection is an
//! external concern layered on `last_heartbeat_time`.

use crate::protocol::{PluginInfo, PluginState, PLUGIN_ACTIVE};
use crate::rpc::{LifecycleError, LifecycleResult};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginInfo>,
    states: HashMap<String, PluginState>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a plugin, creating its liveness record stamped with the current
    /// time. Fails with `AlreadyExists` on a duplicate cookie key and leaves
    /// the stored record unchanged.
    pub fn insert(&mut self, mut info: PluginInfo) -> LifecycleResult<()> {
        if self.plugins.contains_key(&info.cookie_key) {
            return Err(LifecycleError::AlreadyExists {
                cookie_key: info.cookie_key,
            });
        }

        let state = PluginState::new(info.cookie_key.clone());
        info.last_heartbeat_time = state.last_heartbeat_time;
        info.state = PLUGIN_ACTIVE;

        self.states.insert(info.cookie_key.clone(), state);
        self.plugins.insert(info.cookie_key.clone(), info);
        Ok(())
    }

    /// Looks up the liveness record for a cookie key.
    pub fn lookup_state(&mut self, cookie_key: &str) -> LifecycleResult<&mut PluginState> {
        self.states
            .get_mut(cookie_key)
            .ok_or_else(|| LifecycleError::NotFound {
                cookie_key: cookie_key.to_string(),
            })
    }

    /// Records an accepted heartbeat: updates the liveness record with the
    /// message timestamp, then propagates it to the full info record.
    pub fn record_heartbeat(&mut self, cookie_key: &str, timestamp: i64) -> LifecycleResult<()> {
        self.lookup_state(cookie_key)?.mark_active(timestamp);
        self.touch(cookie_key, timestamp);
        Ok(())
    }

    /// Best-effort heartbeat propagation onto the full info record. The
    /// stream has already validated the key against the state map, so a miss
    /// here means the two maps diverged; tests assert that never happens.
    fn touch(&mut self, cookie_key: &str, timestamp: i64) {
        if let Some(info) = self.plugins.get_mut(cookie_key) {
            info.last_heartbeat_time = timestamp;
            info.state = PLUGIN_ACTIVE;
        }
    }

    pub fn get(&self, cookie_key: &str) -> Option<&PluginInfo> {
        self.plugins.get(cookie_key)
    }

    pub fn state(&self, cookie_key: &str) -> Option<&PluginState> {
        self.states.get(cookie_key)
    }

    pub fn contains(&self, cookie_key: &str) -> bool {
        self.plugins.contains_key(cookie_key)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Snapshot of all admitted plugins.
    pub fn snapshot(&self) -> Vec<PluginInfo> {
        self.plugins.values().cloned().collect()
    }

    /// The registry as a cookie-key-indexed JSON object, for host-side
    /// inspection and dumps.
    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.plugins)
    }
}
