//! # Network Listener Module
//!
//! This module provides the decoy TCP listener. It binds one socket, accepts connections for
//! the whole process lifetime and hands every accepted connection to its own task running the
//! [`connection_handler`](super::connection_handler).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌───────────────────┐    ┌──────────────┐
//! │ Incoming        │───▶│ NetworkListener  │───▶│ handle_connection │───▶│ Reporter     │
//! │ Connections     │    │ (accept loop)    │    │ (one task each)   │    │ (capture API)│
//! └─────────────────┘    └──────────────────┘    └───────────────────┘    └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use snare::configuration::types::TrapConfig;
//! use snare::error_handling::types::NetworkError;
//! use snare::network::connection_handler::HandlerSettings;
//! use snare::network::network_listener::NetworkListener;
//! use snare::reporting::{HttpBackend, Reporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), NetworkError> {
//!     let config = TrapConfig::default();
//!     let backend = HttpBackend::new(
//!         &config.backend_url,
//!         config.report_timeout(),
//!         config.probe_timeout(),
//!     )
//!     .unwrap();
//!     let reporter = Arc::new(Reporter::new(Arc::new(backend), config.report_timeout()));
//!
//!     let listener = NetworkListener::bind(
//!         &config.listen_host,
//!         config.listen_port,
//!         config.backlog,
//!         Arc::new(HandlerSettings::from_config(&config)),
//!         reporter,
//!     )?;
//!
//!     // Never returns
//!     listener.run().await;
//!     Ok(())
//! }
//! ```

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use log::{error, info};
use tokio::net::{TcpListener, TcpSocket};

use super::connection_handler::{handle_connection, HandlerSettings};
use crate::error_handling::types::NetworkError;
use crate::reporting::Reporter;

/// The decoy listener.
///
/// `NetworkListener` is responsible for:
/// - Binding the configured address with address reuse enabled
/// - Accepting connections without ever waiting on a handler
/// - Spawning one independent capture task per connection
///
/// No limit is put on the number of concurrent captures.
pub struct NetworkListener {
    /// Bound and listening socket
    listener: TcpListener,

    /// Banner and read parameters shared by every capture
    settings: Arc<HandlerSettings>,

    /// Destination of every capture
    reporter: Arc<Reporter>,
}

impl NetworkListener {
    /// Binds `host:port` with `SO_REUSEADDR` so that restarts do not trip over sockets left in
    /// `TIME_WAIT`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// * `NetworkError::BadAddress` if `host` is not an IP address
    /// * `NetworkError::SockError` if the socket cannot be created or configured
    /// * `NetworkError::BindFail` if binding or listening fails (port in use, privileged port,
    ///   ...)
    pub fn bind(
        host: &str,
        port: u16,
        backlog: u32,
        settings: Arc<HandlerSettings>,
        reporter: Arc<Reporter>,
    ) -> Result<Self, NetworkError> {
        let ip: IpAddr = host
            .parse()
            .map_err(|_| NetworkError::BadAddress(host.to_string()))?;
        let addr = SocketAddr::new(ip, port);

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(|err| {
            error!("[!] Socket error: {:?}", err);
            NetworkError::SockError(err)
        })?;

        socket.set_reuseaddr(true).map_err(NetworkError::SockError)?;
        socket.bind(addr).map_err(NetworkError::BindFail)?;
        let listener = socket.listen(backlog).map_err(NetworkError::BindFail)?;

        Ok(Self {
            listener,
            settings,
            reporter,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.listener.local_addr().map_err(NetworkError::SockError)
    }

    /// Accept loop. Runs until the process ends.
    ///
    /// An accept error only affects the connection being accepted; it is logged and the loop
    /// moves on.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("Honeypot listening on {}", addr);
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!("New connection from {}", peer);
                    let settings = Arc::clone(&self.settings);
                    let reporter = Arc::clone(&self.reporter);
                    tokio::spawn(async move {
                        handle_connection(stream, peer, &settings, &reporter).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}
