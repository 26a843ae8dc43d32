use clap::Args;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://backend:8000";
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 2222;
pub const DEFAULT_BACKLOG: u32 = 100;
pub const DEFAULT_BANNER: &str = "SSH-2.0-OpenSSH_8.9p1 Ubuntu-3ubuntu0.1";
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;
pub const DEFAULT_REPORT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 30;
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

pub const DEFAULT_API_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_API_PORT: u16 = 8000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://attempts.db";

/// Runtime parameters of the decoy listener.
///
/// Every field can be given on the command line, through the matching `SNARE_*` environment
/// variable, or in the `[trap]` table of a TOML configuration file.
#[derive(Args, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrapConfig {
    /// Base URL of the capture API receiving the attempts
    ///
    /// # Command Line
    /// Use `--backend-url <URL>` or `SNARE_BACKEND_URL`
    #[arg(long, env = "SNARE_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Address the decoy listener binds to
    #[arg(long, env = "SNARE_LISTEN_HOST", default_value = DEFAULT_LISTEN_HOST)]
    pub listen_host: String,

    /// Port the decoy listener binds to
    #[arg(long, env = "SNARE_LISTEN_PORT", default_value_t = DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,

    /// Pending connection queue length handed to `listen(2)`
    #[arg(long, env = "SNARE_BACKLOG", default_value_t = DEFAULT_BACKLOG)]
    pub backlog: u32,

    /// Identification line sent to every peer, `\r\n` is appended on the wire
    #[arg(long, env = "SNARE_BANNER", default_value = DEFAULT_BANNER)]
    pub banner: String,

    /// Seconds to wait for the first bytes of a peer before recording a timeout
    #[arg(long, env = "SNARE_READ_TIMEOUT_SECS", default_value_t = DEFAULT_READ_TIMEOUT_SECS)]
    pub read_timeout_secs: u64,

    /// Upper bound of bytes read from a peer
    #[arg(long, env = "SNARE_READ_BUFFER_SIZE", default_value_t = DEFAULT_READ_BUFFER_SIZE)]
    pub read_buffer_size: usize,

    /// Seconds allowed for delivering one attempt to the capture API
    #[arg(
        long,
        env = "SNARE_REPORT_TIMEOUT_SECS",
        default_value_t = DEFAULT_REPORT_TIMEOUT_SECS
    )]
    pub report_timeout_secs: u64,

    /// Number of liveness probes before giving up on the capture API
    ///
    /// # Note
    /// Must be at least 1, the listener never starts without a successful probe
    #[arg(long, env = "SNARE_PROBE_ATTEMPTS", default_value_t = DEFAULT_PROBE_ATTEMPTS)]
    pub probe_attempts: u32,

    /// Seconds to sleep between two failed liveness probes
    #[arg(
        long,
        env = "SNARE_PROBE_INTERVAL_SECS",
        default_value_t = DEFAULT_PROBE_INTERVAL_SECS
    )]
    pub probe_interval_secs: u64,

    /// Seconds allowed for a single liveness probe
    #[arg(
        long,
        env = "SNARE_PROBE_TIMEOUT_SECS",
        default_value_t = DEFAULT_PROBE_TIMEOUT_SECS
    )]
    pub probe_timeout_secs: u64,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            listen_host: DEFAULT_LISTEN_HOST.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            backlog: DEFAULT_BACKLOG,
            banner: DEFAULT_BANNER.to_string(),
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            report_timeout_secs: DEFAULT_REPORT_TIMEOUT_SECS,
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

impl TrapConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Runtime parameters of the capture API.
#[derive(Args, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Address the HTTP API binds to
    #[arg(long, env = "SNARE_API_BIND_ADDRESS", default_value = DEFAULT_API_BIND_ADDRESS)]
    pub bind_address: String,

    /// Port the HTTP API binds to
    #[arg(long, env = "SNARE_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub port: u16,

    /// SQLite database holding the attempts, created when missing
    ///
    /// # Command Line
    /// Use `--database-url sqlite://<path>` or `SNARE_DATABASE_URL`
    #[arg(long, env = "SNARE_DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_API_BIND_ADDRESS.to_string(),
            port: DEFAULT_API_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}
