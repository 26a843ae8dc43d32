use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    EmptyValue(String),
    BadUrl(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::EmptyValue(e) => write!(f, "Missing value: {}", e),
            ConfigError::BadUrl(e) => write!(f, "URL error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum NetworkError {
    SockError(std::io::Error),
    BindFail(std::io::Error),
    BadAddress(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::SockError(e) => write!(f, "Socket error: {}", e),
            NetworkError::BindFail(e) => write!(f, "Bind failed: {}", e),
            NetworkError::BadAddress(e) => write!(f, "Invalid listen address: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

#[derive(Debug)]
pub enum StorageError {
    ConnectionFailed(String),
    WriteFailed(String),
    ReadFailed(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed(e) => write!(f, "Storage connection failed: {}", e),
            StorageError::WriteFailed(e) => write!(f, "Storage write failed: {}", e),
            StorageError::ReadFailed(e) => write!(f, "Storage read failed: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

/// Rejection reasons for an incoming attempt record.
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    EmptyIp,
    IpTooLong(usize),
    InvalidIp(String),
    DataTooLong(usize),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyIp => write!(f, "IP address cannot be empty"),
            ValidationError::IpTooLong(n) => {
                write!(f, "IP address is {} characters long, at most 45 allowed", n)
            }
            ValidationError::InvalidIp(ip) => write!(f, "'{}' is not a valid IP address", ip),
            ValidationError::DataTooLong(n) => {
                write!(f, "data is {} characters long, at most 10000 allowed", n)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failures talking to the capture API from the trap side.
#[derive(Debug)]
pub enum ReportError {
    ClientBuild(String),
    Transport(String),
    Status(u16),
    Timeout,
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::ClientBuild(e) => write!(f, "HTTP client setup failed: {}", e),
            ReportError::Transport(e) => write!(f, "Request failed: {}", e),
            ReportError::Status(code) => write!(f, "API returned status code: {}", code),
            ReportError::Timeout => write!(f, "Request timed out"),
        }
    }
}

impl std::error::Error for ReportError {}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReportError::Timeout
        } else if let Some(status) = err.status() {
            ReportError::Status(status.as_u16())
        } else {
            ReportError::Transport(err.to_string())
        }
    }
}

#[derive(Debug)]
pub enum WebError {
    BindFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    NetworkError(NetworkError),
    StorageError(StorageError),
    ReportError(ReportError),
    WebError(WebError),
    BackendUnavailable(u32),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::NetworkError(e) => write!(f, "Network error: {}", e),
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
            ControllerError::ReportError(e) => write!(f, "Backend client error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web error: {}", e),
            ControllerError::BackendUnavailable(n) => {
                write!(f, "Backend not available after {} attempts", n)
            }
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<NetworkError> for ControllerError {
    fn from(err: NetworkError) -> Self {
        ControllerError::NetworkError(err)
    }
}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        ControllerError::StorageError(err)
    }
}

impl From<ReportError> for ControllerError {
    fn from(err: ReportError) -> Self {
        ControllerError::ReportError(err)
    }
}

impl From<WebError> for ControllerError {
    fn from(err: WebError) -> Self {
        ControllerError::WebError(err)
    }
}
