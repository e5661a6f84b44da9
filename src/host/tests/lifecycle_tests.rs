//! Integration tests for the lifecycle protocol over real Unix sockets.
//!
//! These spin up a full host (all three listeners) and talk to it through
//! real clients and streams. No mocks are used.

use super::*;
use crate::host::verify::{AcceptAll, CookieValueVerifier};
use crate::protocol::{HeartbeatClose, HeartbeatMessage, PluginState, PLUGIN_ACTIVE};
use crate::rpc::control::{ServiceControlClient, ServiceRequest};
use crate::rpc::lifecycle::LifecycleClient;
use crate::transport::UnixTransport;
use futures::SinkExt;
use std::time::Duration;
use tempfile::TempDir;

struct TestHost {
    config: Config,
    handle: HostHandle,
    _dir: TempDir,
}

impl TestHost {
    async fn start() -> Self {
        Self::with_verifier(Arc::new(AcceptAll)).await
    }

    async fn with_verifier(verifier: Arc<dyn Verifier>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(Endpoint::new(dir.path().join("hostlink")));
        let handle = run_host(&config, verifier).await.unwrap();
        Self {
            config,
            handle,
            _dir: dir,
        }
    }

    async fn client(&self) -> LifecycleClient {
        let transport = transport::connect(&self.config.endpoint.lifecycle_path())
            .await
            .unwrap();
        LifecycleClient::new(tarpc::client::Config::default(), transport).spawn()
    }

    async fn heartbeat_stream(&self) -> UnixTransport<HeartbeatClose, HeartbeatMessage> {
        transport::connect(&self.config.endpoint.heartbeat_path())
            .await
            .unwrap()
    }

    async fn state(&self, cookie_key: &str) -> Option<PluginState> {
        self.handle
            .registry()
            .lock()
            .await
            .state(cookie_key)
            .cloned()
    }

    async fn registry_len(&self) -> usize {
        self.handle.registry().lock().await.len()
    }

    /// Heartbeats are applied asynchronously to the send; poll until the
    /// expected timestamp is visible.
    async fn wait_for_heartbeat(&self, cookie_key: &str, timestamp: i64) {
        for _ in 0..250 {
            if let Some(state) = self.state(cookie_key).await {
                if state.last_heartbeat_time == timestamp {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "heartbeat for {} with timestamp {} never observed",
            cookie_key, timestamp
        );
    }
}

fn test_info(cookie_key: &str) -> PluginInfo {
    PluginInfo {
        version: "1.0".to_string(),
        app_name: "demo-plugin".to_string(),
        git_hash: "abc123".to_string(),
        git_branch: "main".to_string(),
        build_time: "1700000000".to_string(),
        runtime_version: "rustc 1.88.0".to_string(),
        cookie_key: cookie_key.to_string(),
        cookie_value: "s3cret".to_string(),
        last_heartbeat_time: 0,
        state: 0,
    }
}

fn heartbeat(cookie_key: &str, timestamp: i64) -> HeartbeatMessage {
    HeartbeatMessage {
        cookie_key: cookie_key.to_string(),
        message: "ping".to_string(),
        timestamp,
        memory_usage: 1024.0 * 1024.0,
        cpu_usage: 0.5,
    }
}

#[tokio::test]
async fn ping_answers_pong_and_touches_no_state() {
    let host = TestHost::start().await;
    let client = host.client().await;

    for _ in 0..3 {
        let ack = client.ping(tarpc::context::current()).await.unwrap();
        assert_eq!(ack.message, "pong");
        assert!(ack.timestamp > 0);
    }

    assert_eq!(host.registry_len().await, 0);
}

#[tokio::test]
async fn register_admits_plugin_with_active_state() {
    let host = TestHost::start().await;
    let client = host.client().await;

    let ack = client
        .register(tarpc::context::current(), test_info("alice-key"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ack.message, "ok");

    let state = host.state("alice-key").await.unwrap();
    assert_eq!(state.state, PLUGIN_ACTIVE);
    assert!(state.last_heartbeat_time > 0);
}

#[tokio::test]
async fn register_empty_cookie_key_is_rejected_without_state() {
    let host = TestHost::start().await;
    let client = host.client().await;

    let result = client
        .register(tarpc::context::current(), test_info(""))
        .await
        .unwrap();
    assert!(matches!(result, Err(LifecycleError::EmptyCookieKey)));
    assert_eq!(host.registry_len().await, 0);
}

#[tokio::test]
async fn duplicate_registration_keeps_single_entry() {
    let host = TestHost::start().await;
    let client = host.client().await;

    client
        .register(tarpc::context::current(), test_info("alice-key"))
        .await
        .unwrap()
        .unwrap();

    let result = client
        .register(tarpc::context::current(), test_info("alice-key"))
        .await
        .unwrap();
    assert!(matches!(
        result,
        Err(LifecycleError::AlreadyExists { cookie_key }) if cookie_key == "alice-key"
    ));

    assert_eq!(host.registry_len().await, 1);
    let registry = host.handle.registry();
    let registry = registry.lock().await;
    assert_eq!(registry.get("alice-key").unwrap().version, "1.0");
}

#[tokio::test]
async fn verifier_rejection_creates_no_state() {
    let host = TestHost::with_verifier(Arc::new(CookieValueVerifier::new("other-secret"))).await;
    let client = host.client().await;

    let result = client
        .register(tarpc::context::current(), test_info("alice-key"))
        .await
        .unwrap();
    assert!(matches!(
        result,
        Err(LifecycleError::AdmissionRejected { .. })
    ));
    assert_eq!(host.registry_len().await, 0);
}

#[tokio::test]
async fn heartbeat_updates_registered_plugin() {
    let host = TestHost::start().await;
    let client = host.client().await;
    client
        .register(tarpc::context::current(), test_info("alice-key"))
        .await
        .unwrap()
        .unwrap();

    let mut stream = host.heartbeat_stream().await;
    stream.send(heartbeat("alice-key", 1000)).await.unwrap();
    host.wait_for_heartbeat("alice-key", 1000).await;

    let state = host.state("alice-key").await.unwrap();
    assert_eq!(state.last_heartbeat_time, 1000);
    assert_eq!(state.state, PLUGIN_ACTIVE);

    // The full info record is kept in step with the hot-path state.
    let registry = host.handle.registry();
    let registry = registry.lock().await;
    assert_eq!(registry.get("alice-key").unwrap().last_heartbeat_time, 1000);
}

#[tokio::test]
async fn heartbeat_for_unknown_key_closes_stream_with_not_found() {
    let host = TestHost::start().await;
    let client = host.client().await;
    client
        .register(tarpc::context::current(), test_info("alice-key"))
        .await
        .unwrap()
        .unwrap();

    let mut stream = host.heartbeat_stream().await;
    stream.send(heartbeat("alice-key", 1000)).await.unwrap();
    host.wait_for_heartbeat("alice-key", 1000).await;

    stream.send(heartbeat("bob-key", 2000)).await.unwrap();
    let close = stream.next().await.unwrap().unwrap();
    assert!(matches!(
        close.error,
        LifecycleError::NotFound { cookie_key } if cookie_key == "bob-key"
    ));

    // Alice is untouched and nothing was admitted for bob.
    assert_eq!(
        host.state("alice-key").await.unwrap().last_heartbeat_time,
        1000
    );
    assert_eq!(host.registry_len().await, 1);
}

#[tokio::test]
async fn heartbeat_with_empty_key_closes_stream() {
    let host = TestHost::start().await;

    let mut stream = host.heartbeat_stream().await;
    stream.send(heartbeat("", 1000)).await.unwrap();

    let close = stream.next().await.unwrap().unwrap();
    assert!(matches!(close.error, LifecycleError::EmptyCookieKey));
}

#[tokio::test]
async fn clean_end_of_stream_sends_no_response() {
    let host = TestHost::start().await;
    let client = host.client().await;
    client
        .register(tarpc::context::current(), test_info("alice-key"))
        .await
        .unwrap()
        .unwrap();

    let mut stream = host.heartbeat_stream().await;
    stream.send(heartbeat("alice-key", 1000)).await.unwrap();
    host.wait_for_heartbeat("alice-key", 1000).await;

    // Half-close the stream; the server must end the session silently.
    stream.close().await.unwrap();
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn streams_are_isolated_per_plugin() {
    let host = TestHost::start().await;
    let client = host.client().await;
    client
        .register(tarpc::context::current(), test_info("alice-key"))
        .await
        .unwrap()
        .unwrap();

    // A stream killed by an unknown identity must not affect another
    // plugin's live stream.
    let mut bad_stream = host.heartbeat_stream().await;
    bad_stream.send(heartbeat("ghost-key", 500)).await.unwrap();
    assert!(bad_stream.next().await.unwrap().is_ok());

    let mut good_stream = host.heartbeat_stream().await;
    good_stream.send(heartbeat("alice-key", 3000)).await.unwrap();
    host.wait_for_heartbeat("alice-key", 3000).await;
}

#[tokio::test]
async fn control_service_serves_stub_handler() {
    let host = TestHost::start().await;

    let transport = transport::connect(&host.config.endpoint.control_path())
        .await
        .unwrap();
    let control = ServiceControlClient::new(tarpc::client::Config::default(), transport).spawn();

    let services = control.list(tarpc::context::current()).await.unwrap();
    assert!(services.is_empty());

    let status = control
        .status(
            tarpc::context::current(),
            ServiceRequest {
                name: "updater".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(status.name, "updater");
    assert!(!status.running);
}

#[tokio::test]
async fn shutdown_joins_tasks_and_removes_sockets() {
    let TestHost {
        config,
        handle,
        _dir,
    } = TestHost::start().await;

    handle.shutdown().await;

    assert!(!config.endpoint.lifecycle_path().exists());
    assert!(!config.endpoint.heartbeat_path().exists());
    assert!(!config.endpoint.control_path().exists());
}
