use std::future::Future;
use std::pin::Pin;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use log::{error, info};

use crate::configuration::types::{ApiConfig, TrapConfig};
use crate::error_handling::types::*;
use crate::network::{HandlerSettings, NetworkListener};
use crate::reporting::{wait_for_backend, HttpBackend, Reporter};
use crate::storage::SqliteStorage;
use crate::web_interface::WebServer;

/// Which half of the system this process runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    /// Decoy listener reporting to the capture API
    Trap(TrapConfig),
    /// Capture API in front of the attempt database
    Api(ApiConfig),
}

pub struct Controller {
    role: Role,
}

impl Controller {
    /// Validates the configuration of `role`.
    pub fn new(role: Role) -> Result<Self, ControllerError> {
        let checked = match &role {
            Role::Trap(config) => config.validate(),
            Role::Api(config) => config.validate(),
        };
        if let Err(err) = checked {
            error!("[!] Invalid configuration: {}", err);
            return Err(ControllerError::ConfigurationError(err));
        }
        Ok(Self { role })
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Runs the configured role. Only returns on a startup failure.
    pub async fn run(self) -> Result<(), ControllerError> {
        match self.role {
            Role::Trap(config) => {
                let listener = start_trap(&config).await?;
                listener.run().await;
                Ok(())
            }
            Role::Api(config) => {
                let (addr, server) = start_api(&config).await?;
                info!("Capture API listening on http://{}", addr);
                server.await;
                Ok(())
            }
        }
    }
}

/// Waits for the capture API, then binds the decoy listener.
///
/// The listener is returned bound but not yet accepting.
pub async fn start_trap(config: &TrapConfig) -> Result<NetworkListener, ControllerError> {
    let backend = Arc::new(HttpBackend::new(
        &config.backend_url,
        config.report_timeout(),
        config.probe_timeout(),
    )?);

    info!("Waiting for backend at {}", backend.base_url());
    if !wait_for_backend(
        backend.as_ref(),
        config.probe_attempts,
        config.probe_interval(),
    )
    .await
    {
        return Err(ControllerError::BackendUnavailable(config.probe_attempts));
    }

    let reporter = Arc::new(Reporter::new(backend, config.report_timeout()));
    let settings = Arc::new(HandlerSettings::from_config(config));

    let listener = NetworkListener::bind(
        &config.listen_host,
        config.listen_port,
        config.backlog,
        settings,
        reporter,
    )
    .map_err(|err| {
        error!(
            "[!] Unable to listen on {}:{}: {}",
            config.listen_host, config.listen_port, err
        );
        err
    })?;

    Ok(listener)
}

/// Serving future of the HTTP API, resolves only when the server stops.
pub type ServeFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Opens the attempt database and binds the HTTP server.
///
/// Returns the bound address and the serving future.
pub async fn start_api(config: &ApiConfig) -> Result<(SocketAddr, ServeFuture), ControllerError> {
    let storage = SqliteStorage::open(&config.database_url).await?;
    info!("Attempt database ready at {}", config.database_url);

    let ip: IpAddr = config
        .bind_address
        .parse()
        .map_err(|_| NetworkError::BadAddress(config.bind_address.clone()))?;
    let (addr, server) =
        WebServer::new(Arc::new(storage)).bind(SocketAddr::new(ip, config.port))?;
    Ok((addr, Box::pin(server)))
}
