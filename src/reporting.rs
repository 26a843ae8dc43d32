//! Trap-side plumbing towards the capture API: the HTTP client, the startup readiness gate
//! and the best-effort reporter.

pub mod backend_client;
pub mod readiness_gate;
pub mod reporter;

pub use backend_client::{CaptureBackend, HttpBackend};
pub use readiness_gate::wait_for_backend;
pub use reporter::Reporter;
