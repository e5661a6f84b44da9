//! Plugin side: connection setup, registration, and the background
//! heartbeat sender.

pub mod client;
pub mod heartbeat;

pub use client::{HeartbeatStream, PluginClient};
pub use heartbeat::{HeartbeatHandle, HeartbeatSender, HeartbeatSink, SenderExit};
