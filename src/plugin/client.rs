//! Plugin-side client for the host's lifecycle services.

use crate::config::Config;
use crate::plugin::heartbeat::{HeartbeatHandle, HeartbeatSender, HeartbeatSink};
use crate::protocol::{Ack, HeartbeatClose, HeartbeatMessage, PluginInfo};
use crate::rpc::lifecycle::LifecycleClient;
use crate::rpc::TransportError;
use crate::stats::StatsSampler;
use crate::transport::{self, UnixTransport};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use futures::SinkExt;
use std::sync::Arc;
use std::time::Instant;
use tarpc::{client, context};

/// RPC client for a plugin process talking to its host.
pub struct PluginClient {
    lifecycle: LifecycleClient,
    config: Config,
}

impl PluginClient {
    /// Connects to the host's lifecycle socket.
    pub async fn connect(config: Config) -> Result<Self> {
        let path = config.endpoint.lifecycle_path();
        let transport = transport::connect(&path)
            .await
            .with_context(|| format!("connecting to host at {}", path.display()))?;
        let lifecycle = LifecycleClient::new(client::Config::default(), transport).spawn();
        Ok(Self { lifecycle, config })
    }

    /// Context carrying the configured per-call deadline.
    fn call_context(&self) -> context::Context {
        let mut ctx = context::current();
        ctx.deadline = Instant::now() + self.config.rpc_timeout;
        ctx
    }

    /// Probes the channel. Succeeds with `"pong"` whenever the host is up.
    pub async fn ping(&self) -> Result<Ack> {
        Ok(self.lifecycle.ping(self.call_context()).await?)
    }

    /// Registers this plugin with the host.
    pub async fn register(&self, info: PluginInfo) -> Result<Ack> {
        match self.lifecycle.register(self.call_context(), info).await? {
            Ok(ack) => Ok(ack),
            Err(e) => anyhow::bail!("host refused registration: {}", e),
        }
    }

    /// Opens a heartbeat stream to the host.
    pub async fn open_heartbeat(&self) -> Result<HeartbeatStream> {
        let path = self.config.endpoint.heartbeat_path();
        let transport = transport::connect(&path)
            .await
            .with_context(|| format!("opening heartbeat stream at {}", path.display()))?;
        Ok(HeartbeatStream { transport })
    }

    /// Opens a heartbeat stream and spawns the background sender for
    /// `cookie_key`, using the configured interval.
    pub async fn start_heartbeat(
        &self,
        cookie_key: impl Into<String>,
        sampler: Arc<dyn StatsSampler>,
    ) -> Result<HeartbeatHandle> {
        let stream = self.open_heartbeat().await?;
        Ok(HeartbeatSender::spawn(
            cookie_key.into(),
            stream,
            sampler,
            self.config.heartbeat_interval,
        ))
    }
}

/// Client end of the heartbeat duplex stream: heartbeats out, at most one
/// close response in.
pub struct HeartbeatStream {
    transport: UnixTransport<HeartbeatClose, HeartbeatMessage>,
}

#[async_trait]
impl HeartbeatSink for HeartbeatStream {
    async fn send(&mut self, message: HeartbeatMessage) -> Result<(), TransportError> {
        self.transport
            .send(message)
            .await
            .map_err(|e| TransportError::new(format!("heartbeat send failed: {}", e)))
    }
}
