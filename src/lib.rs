//! Host ↔ plugin lifecycle supervision over local IPC.
//!
//! A long-lived host process admits plugin processes into a registry and
//! tracks their liveness via a client-pushed heartbeat stream. The crate has
//! two halves:
//!
//! - [`host`] — the server side: the lifecycle RPC service (ping/register),
//!   the heartbeat stream handler, and the shared [`registry::PluginRegistry`].
//! - [`plugin`] — the client side: connection setup, registration, and the
//!   background heartbeat sender with its bounded-failure give-up policy.
//!
//! All communication runs over tarpc with Bincode framing on Unix domain
//! sockets; see [`transport`] for the wiring and [`config`] for endpoint
//! resolution.

// Needed to bound the `Send`-ness of the futures returned by generic
// `ServiceControl` implementations (tarpc generates async-fn-in-trait
// methods, whose return types are otherwise unnameable in bounds).
#![feature(return_type_notation)]

pub mod config;
pub mod host;
pub mod plugin;
pub mod protocol;
pub mod registry;
pub mod rpc;
pub mod stats;
pub mod transport;
