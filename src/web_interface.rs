//! HTTP storage boundary: the capture API consumed by the trap and the dashboard.

pub mod routes;
pub mod types;
pub mod web_server;

pub use web_server::WebServer;
