//! Lifecycle service definition for plugin ↔ host RPC.

use crate::protocol::{Ack, PluginInfo};
use crate::rpc::LifecycleResult;

/// Core lifecycle service exposed by the host to its plugins.
///
/// Heartbeats are not part of this unary surface; they flow over a dedicated
/// duplex stream on the heartbeat socket (see `host::heartbeat`).
#[tarpc::service]
pub trait Lifecycle {
    /// Liveness probe for the channel itself, independent of plugin identity.
    /// Always answers `"pong"` and never touches host state.
    async fn ping() -> Ack;

    /// Admits a plugin into the host registry.
    ///
    /// Fails with `EmptyCookieKey` on a blank identity token,
    /// `AdmissionRejected` when the host's verifier declines the candidate,
    /// and `AlreadyExists` on a duplicate cookie key.
    async fn register(info: PluginInfo) -> LifecycleResult<Ack>;
}
