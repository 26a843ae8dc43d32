//! # Connection Handler
//!
//! Per-connection capture state machine:
//!
//! ```text
//! START ─▶ BANNER_SENT ─▶ AWAIT_DATA ─┬─▶ DATA ────┐
//!                                     ├─▶ EMPTY ───┤
//!                                     ├─▶ TIMEOUT ─┼─▶ report ─▶ CLOSED
//!                                     └─▶ ERROR ───┘
//! ```
//!
//! The handler owns its stream; whatever happens, the stream is shut down and dropped before
//! [`handle_connection`] returns.

use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::types::Outcome;
use crate::configuration::types::TrapConfig;
use crate::reporting::Reporter;

/// Fixed per-listener parameters of the capture.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerSettings {
    /// Bytes written on connect, line terminator included
    pub banner: Vec<u8>,
    pub read_timeout: Duration,
    pub read_buffer_size: usize,
}

impl HandlerSettings {
    pub fn new(banner: &str, read_timeout: Duration, read_buffer_size: usize) -> Self {
        let mut banner = banner.trim_end_matches(['\r', '\n']).as_bytes().to_vec();
        banner.extend_from_slice(b"\r\n");
        Self {
            banner,
            read_timeout,
            read_buffer_size,
        }
    }

    pub fn from_config(config: &TrapConfig) -> Self {
        Self::new(
            &config.banner,
            config.read_timeout(),
            config.read_buffer_size,
        )
    }
}

/// Sends the banner and classifies what the peer does next.
///
/// The peer gets a single read of at most `read_buffer_size` bytes within `read_timeout`.
/// A failed banner write is classified like any other I/O failure.
pub async fn capture<S>(stream: &mut S, settings: &HandlerSettings) -> Outcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // START -> BANNER_SENT
    if let Err(e) = stream.write_all(&settings.banner).await {
        return Outcome::from_io_error(&e);
    }
    if let Err(e) = stream.flush().await {
        return Outcome::from_io_error(&e);
    }

    // BANNER_SENT -> AWAIT_DATA
    let mut buffer = vec![0u8; settings.read_buffer_size];
    match tokio::time::timeout(settings.read_timeout, stream.read(&mut buffer)).await {
        Err(_) => Outcome::Timeout,
        Ok(Ok(0)) => Outcome::Empty,
        Ok(Ok(n)) => {
            trace!(
                "captured {} bytes: {}",
                n,
                String::from_utf8_lossy(&buffer[..std::cmp::min(n, 64)])
            );
            Outcome::from_bytes(&buffer[..n])
        }
        Ok(Err(e)) => Outcome::from_io_error(&e),
    }
}

/// Runs the full capture for one accepted connection and reports the result.
///
/// Exactly one report is issued per call, whatever the outcome. The stream is consumed and
/// closed on return.
pub async fn handle_connection<S>(
    mut stream: S,
    peer: SocketAddr,
    settings: &HandlerSettings,
    reporter: &Reporter,
) -> Outcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let outcome = capture(&mut stream, settings).await;
    debug!("[{}] capture finished: {}", peer, outcome);

    reporter.report(peer.ip(), &outcome.payload()).await;

    // -> CLOSED, the drop at the end of scope releases the socket either way
    if let Err(e) = stream.shutdown().await {
        trace!("[{}] shutdown failed: {}", peer, e);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::ReportError;
    use crate::reporting::CaptureBackend;
    use crate::storage::types::NewAttempt;
    use async_trait::async_trait;
    use std::io;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::{Arc, Mutex};
    use tokio_test::io::Builder;

    const BANNER: &[u8] = b"SSH-2.0-OpenSSH_8.9p1 Ubuntu-3ubuntu0.1\r\n";

    #[derive(Default)]
    struct RecordingBackend {
        submitted: Mutex<Vec<NewAttempt>>,
        fail: bool,
    }

    #[async_trait]
    impl CaptureBackend for RecordingBackend {
        async fn probe(&self) -> Result<(), ReportError> {
            Ok(())
        }

        async fn submit(&self, attempt: &NewAttempt) -> Result<i64, ReportError> {
            self.submitted.lock().unwrap().push(attempt.clone());
            if self.fail {
                Err(ReportError::Transport("connection refused".into()))
            } else {
                Ok(1)
            }
        }
    }

    fn settings() -> HandlerSettings {
        HandlerSettings::from_config(&TrapConfig::default())
    }

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 45)), 12345)
    }

    fn reporter() -> (Reporter, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::default());
        (
            Reporter::new(backend.clone(), Duration::from_secs(10)),
            backend,
        )
    }

    fn payloads(backend: &RecordingBackend) -> Vec<Option<String>> {
        backend
            .submitted
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.data.clone())
            .collect()
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = settings();
        assert_eq!(settings.banner, BANNER);
        assert_eq!(settings.read_timeout, Duration::from_secs(30));
        assert_eq!(settings.read_buffer_size, 4096);
    }

    #[test]
    fn test_banner_terminator_not_doubled() {
        let settings = HandlerSettings::new("SSH-2.0-dropbear\r\n", Duration::from_secs(1), 16);
        assert_eq!(settings.banner, b"SSH-2.0-dropbear\r\n");
    }

    #[tokio::test]
    async fn test_data_is_captured() {
        let mock = Builder::new().write(BANNER).read(b"test123").build();
        let (reporter, backend) = reporter();

        let outcome = handle_connection(mock, peer(), &settings(), &reporter).await;

        assert_eq!(outcome, Outcome::Data("test123".into()));
        assert_eq!(payloads(&backend), vec![Some("test123".to_string())]);
        assert_eq!(backend.submitted.lock().unwrap()[0].ip, "203.0.113.45");
    }

    #[tokio::test]
    async fn test_client_banner_is_trimmed() {
        let mock = Builder::new()
            .write(BANNER)
            .read(b"SSH-2.0-Go\r\n")
            .build();
        let (reporter, backend) = reporter();

        handle_connection(mock, peer(), &settings(), &reporter).await;

        assert_eq!(payloads(&backend), vec![Some("SSH-2.0-Go".to_string())]);
    }

    #[tokio::test]
    async fn test_only_one_buffer_is_read() {
        let settings = HandlerSettings::new("SSH-2.0-test", Duration::from_secs(30), 4);
        let mock = Builder::new()
            .write(b"SSH-2.0-test\r\n")
            .read(b"abcd")
            .build();
        let (reporter, backend) = reporter();

        handle_connection(mock, peer(), &settings, &reporter).await;

        assert_eq!(payloads(&backend), vec![Some("abcd".to_string())]);
    }

    #[tokio::test]
    async fn test_empty_connection() {
        let mock = Builder::new().write(BANNER).build();
        let (reporter, backend) = reporter();

        let outcome = handle_connection(mock, peer(), &settings(), &reporter).await;

        assert_eq!(outcome, Outcome::Empty);
        assert_eq!(payloads(&backend), vec![Some("empty_connection".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_times_out() {
        let mock = Builder::new()
            .write(BANNER)
            .wait(Duration::from_secs(120))
            .build();
        let (reporter, backend) = reporter();

        let started = tokio::time::Instant::now();
        let outcome = handle_connection(mock, peer(), &settings(), &reporter).await;

        assert_eq!(outcome, Outcome::Timeout);
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert!(started.elapsed() < Duration::from_secs(120));
        assert_eq!(
            payloads(&backend),
            vec![Some("connection_timeout".to_string())]
        );
    }

    #[tokio::test]
    async fn test_read_error_is_recorded() {
        let mock = Builder::new()
            .write(BANNER)
            .read_error(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))
            .build();
        let (reporter, backend) = reporter();

        let outcome = handle_connection(mock, peer(), &settings(), &reporter).await;

        assert_eq!(outcome, Outcome::Error("connection reset by peer".into()));
        assert_eq!(
            payloads(&backend),
            vec![Some("connection_error: connection reset by peer".to_string())]
        );
    }

    #[tokio::test]
    async fn test_banner_write_error_is_recorded() {
        let mock = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
            .build();
        let (reporter, backend) = reporter();

        let outcome = handle_connection(mock, peer(), &settings(), &reporter).await;

        assert_eq!(outcome, Outcome::Error("broken pipe".into()));
        assert_eq!(
            payloads(&backend),
            vec![Some("connection_error: broken pipe".to_string())]
        );
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_escape() {
        let backend = Arc::new(RecordingBackend {
            fail: true,
            ..Default::default()
        });
        let reporter = Reporter::new(backend.clone(), Duration::from_secs(10));
        let mock = Builder::new().write(BANNER).read(b"root").build();

        let outcome = handle_connection(mock, peer(), &settings(), &reporter).await;

        assert_eq!(outcome, Outcome::Data("root".into()));
        assert_eq!(backend.submitted.lock().unwrap().len(), 1);
    }
}
