//! Service-control definitions for the host's managed-service surface.
//!
//! This RPC group is independent of the lifecycle protocol: it shares no
//! state with the plugin registry and hosts swap in their own handler. The
//! crate ships [`NullControl`], a stub that manages nothing.

use serde::{Deserialize, Serialize};

/// Names a host-managed service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub name: String,
}

/// Status of a host-managed service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub running: bool,
}

/// Control operations for services managed by the host process.
#[tarpc::service]
pub trait ServiceControl {
    async fn status(req: ServiceRequest) -> ServiceStatus;

    async fn start(req: ServiceRequest);

    async fn stop(req: ServiceRequest);

    async fn restart(req: ServiceRequest);

    async fn list() -> Vec<ServiceStatus>;
}

/// Default handler for hosts that manage no services.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullControl;

impl ServiceControl for NullControl {
    async fn status(self, _: tarpc::context::Context, req: ServiceRequest) -> ServiceStatus {
        ServiceStatus {
            name: req.name,
            running: false,
        }
    }

    async fn start(self, _: tarpc::context::Context, _req: ServiceRequest) {}

    async fn stop(self, _: tarpc::context::Context, _req: ServiceRequest) {}

    async fn restart(self, _: tarpc::context::Context, _req: ServiceRequest) {}

    async fn list(self, _: tarpc::context::Context) -> Vec<ServiceStatus> {
        Vec::new()
    }
}
