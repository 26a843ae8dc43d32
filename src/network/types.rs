use std::fmt;
use std::io;

/// Payload recorded when the peer closed without sending anything useful.
pub const EMPTY_CONNECTION: &str = "empty_connection";
/// Payload recorded when the peer stayed silent past the read deadline.
pub const CONNECTION_TIMEOUT: &str = "connection_timeout";
/// Prefix of the payload recorded for any other I/O failure.
pub const CONNECTION_ERROR_PREFIX: &str = "connection_error";

const MAX_ERROR_MESSAGE_LEN: usize = 128;

/// Terminal classification of one captured connection.
///
/// Every variant is a valid capture, none of them is a failure of the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The peer sent bytes; holds their lossy UTF-8 decoding, trimmed.
    Data(String),
    /// The peer closed without sending, or sent only whitespace.
    Empty,
    /// The read deadline expired.
    Timeout,
    /// Any other I/O failure, with a short description.
    Error(String),
}

impl Outcome {
    /// Classifies the bytes returned by a single read.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Outcome::Empty
        } else {
            Outcome::Data(trimmed.to_string())
        }
    }

    pub fn from_io_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Outcome::Timeout,
            _ => {
                let message: String = err.to_string().chars().take(MAX_ERROR_MESSAGE_LEN).collect();
                Outcome::Error(message)
            }
        }
    }

    /// Value stored as the attempt's `data`.
    pub fn payload(&self) -> String {
        match self {
            Outcome::Data(text) => text.clone(),
            Outcome::Empty => EMPTY_CONNECTION.to_string(),
            Outcome::Timeout => CONNECTION_TIMEOUT.to_string(),
            Outcome::Error(message) => format!("{}: {}", CONNECTION_ERROR_PREFIX, message),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Data(text) => write!(f, "data ({} chars)", text.chars().count()),
            Outcome::Empty => write!(f, "empty"),
            Outcome::Timeout => write!(f, "timeout"),
            Outcome::Error(message) => write!(f, "error ({})", message),
        }
    }
}
