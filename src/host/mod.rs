//! Host side: the lifecycle service, heartbeat stream handling, and the
//! admission verifier seam.

pub mod heartbeat;
pub mod server;
pub mod verify;

pub use server::{run_host, run_host_with_control, HostHandle, LifecycleServer};
pub use verify::{AcceptAll, CookieValueVerifier, Verifier};
