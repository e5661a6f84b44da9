//! Host assembly: the lifecycle service implementation and the listeners
//! for all three sockets, each accept loop guarded by a shutdown broadcast.

use crate::config::{Config, Endpoint};
use crate::host::heartbeat;
use crate::host::verify::Verifier;
use crate::protocol::{Ack, PluginInfo};
use crate::registry::PluginRegistry;
use crate::rpc::control::{NullControl, ServiceControl};
use crate::rpc::lifecycle::Lifecycle;
use crate::rpc::{LifecycleError, LifecycleResult};
use crate::transport;
use anyhow::Context as _;
use futures::StreamExt;
use std::sync::Arc;
use tarpc::server::{self, Channel};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Server implementation of the lifecycle service.
#[derive(Clone)]
pub struct LifecycleServer {
    registry: Arc<Mutex<PluginRegistry>>,
    verifier: Arc<dyn Verifier>,
}

impl LifecycleServer {
    pub fn new(registry: Arc<Mutex<PluginRegistry>>, verifier: Arc<dyn Verifier>) -> Self {
        Self { registry, verifier }
    }
}

impl Lifecycle for LifecycleServer {
    async fn ping(self, _: tarpc::context::Context) -> Ack {
        Ack::new("pong")
    }

    async fn register(self, _: tarpc::context::Context, info: PluginInfo) -> LifecycleResult<Ack> {
        if info.cookie_key.is_empty() {
            return Err(LifecycleError::EmptyCookieKey);
        }

        self.verifier
            .verify(&info)
            .map_err(|reason| LifecycleError::AdmissionRejected { reason })?;

        let app_name = info.app_name.clone();
        let cookie_key = info.cookie_key.clone();
        let version = info.version.clone();
        self.registry.lock().await.insert(info)?;

        info!(
            app_name = %app_name,
            cookie_key = %cookie_key,
            version = %version,
            "plugin registered"
        );
        Ok(Ack::new("ok"))
    }
}

/// A running host: the shared registry plus a shutdown signal joining all
/// accept loops and removing the socket files.
pub struct HostHandle {
    registry: Arc<Mutex<PluginRegistry>>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
    endpoint: Endpoint,
}

impl HostHandle {
    pub fn registry(&self) -> Arc<Mutex<PluginRegistry>> {
        self.registry.clone()
    }

    /// The registry as a cookie-key-indexed JSON object.
    pub async fn plugins_json(&self) -> serde_json::Result<String> {
        self.registry.lock().await.snapshot_json()
    }

    /// Stops all accept loops and cleans up the socket files. In-flight
    /// streams end when their connections drop.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        for task in self.tasks {
            let _ = task.await;
        }
        for path in [
            self.endpoint.lifecycle_path(),
            self.endpoint.heartbeat_path(),
            self.endpoint.control_path(),
        ] {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Runs a host with the stub service-control handler.
pub async fn run_host(config: &Config, verifier: Arc<dyn Verifier>) -> anyhow::Result<HostHandle> {
    run_host_with_control(config, verifier, NullControl).await
}

/// Runs a host with a caller-supplied service-control handler. All three
/// listeners are bound before this returns, so clients may connect
/// immediately.
pub async fn run_host_with_control<C>(
    config: &Config,
    verifier: Arc<dyn Verifier>,
    control: C,
) -> anyhow::Result<HostHandle>
where
    C: ServiceControl<
            status(..): Send,
            start(..): Send,
            stop(..): Send,
            restart(..): Send,
            list(..): Send,
        > + Clone
        + Send
        + Sync
        + 'static,
{
    let registry = Arc::new(Mutex::new(PluginRegistry::new()));
    let (shutdown_tx, _) = broadcast::channel(1);

    let lifecycle_listener = transport::bind(&config.endpoint.lifecycle_path())
        .with_context(|| {
            format!(
                "binding lifecycle socket {}",
                config.endpoint.lifecycle_path().display()
            )
        })?;
    let heartbeat_listener = transport::bind(&config.endpoint.heartbeat_path())
        .with_context(|| {
            format!(
                "binding heartbeat socket {}",
                config.endpoint.heartbeat_path().display()
            )
        })?;
    let control_listener = transport::bind(&config.endpoint.control_path()).with_context(|| {
        format!(
            "binding control socket {}",
            config.endpoint.control_path().display()
        )
    })?;

    info!(endpoint = %config.endpoint.base().display(), "host listening");

    let lifecycle_server = LifecycleServer::new(registry.clone(), verifier);
    let tasks = vec![
        tokio::spawn(serve_lifecycle(
            lifecycle_listener,
            lifecycle_server,
            shutdown_tx.subscribe(),
        )),
        tokio::spawn(serve_heartbeats(
            heartbeat_listener,
            registry.clone(),
            shutdown_tx.subscribe(),
        )),
        tokio::spawn(serve_control(
            control_listener,
            control,
            shutdown_tx.subscribe(),
        )),
    ];

    Ok(HostHandle {
        registry,
        shutdown_tx,
        tasks,
        endpoint: config.endpoint.clone(),
    })
}

async fn serve_lifecycle(
    listener: UnixListener,
    server_impl: LifecycleServer,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let channel = server::BaseChannel::with_defaults(transport::framed(stream));
                        let server_impl = server_impl.clone();
                        tokio::spawn(async move {
                            channel
                                .execute(server_impl.serve())
                                .for_each(|response| async {
                                    tokio::spawn(response);
                                })
                                .await;
                        });
                    }
                    Err(e) => warn!(error = %e, "lifecycle accept error"),
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}

async fn serve_heartbeats(
    listener: UnixListener,
    registry: Arc<Mutex<PluginRegistry>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        tokio::spawn(heartbeat::serve_stream(
                            transport::framed(stream),
                            registry.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "heartbeat accept error"),
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}

async fn serve_control<C>(
    listener: UnixListener,
    control: C,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    C: ServiceControl<
            status(..): Send,
            start(..): Send,
            stop(..): Send,
            restart(..): Send,
            list(..): Send,
        > + Clone
        + Send
        + Sync
        + 'static,
{
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let channel = server::BaseChannel::with_defaults(transport::framed(stream));
                        let control = control.clone();
                        tokio::spawn(async move {
                            channel
                                .execute(control.serve())
                                .for_each(|response| async {
                                    tokio::spawn(response);
                                })
                                .await;
                        });
                    }
                    Err(e) => warn!(error = %e, "control accept error"),
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod lifecycle_tests;
