use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error_handling::types::ValidationError;

/// Longest textual IP address accepted (IPv4-mapped IPv6 in full form).
pub const MAX_IP_LEN: usize = 45;
/// Longest payload accepted, counted in characters.
pub const MAX_DATA_LEN: usize = 10_000;

/// Insert candidate for one captured attempt, as sent by the trap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttempt {
    pub ip: String,
    #[serde(default)]
    pub data: Option<String>,
}

impl NewAttempt {
    pub fn new<I: Into<String>>(ip: I, data: Option<String>) -> Self {
        Self {
            ip: ip.into(),
            data,
        }
    }

    /// Normalizes and checks the candidate before it reaches the database.
    ///
    /// The address is trimmed and must parse as an IPv4 or IPv6 address of at most
    /// [`MAX_IP_LEN`] characters. The payload is trimmed and bounded to [`MAX_DATA_LEN`]
    /// characters; oversized payloads are rejected, never truncated.
    pub fn validate(self) -> Result<NewAttempt, ValidationError> {
        let ip = self.ip.trim();
        if ip.is_empty() {
            return Err(ValidationError::EmptyIp);
        }
        let ip_len = ip.chars().count();
        if ip_len > MAX_IP_LEN {
            return Err(ValidationError::IpTooLong(ip_len));
        }
        if ip.parse::<IpAddr>().is_err() {
            return Err(ValidationError::InvalidIp(ip.to_string()));
        }

        let data = match self.data {
            Some(d) => {
                let d = d.trim();
                let data_len = d.chars().count();
                if data_len > MAX_DATA_LEN {
                    return Err(ValidationError::DataTooLong(data_len));
                }
                Some(d.to_string())
            }
            None => None,
        };

        Ok(NewAttempt {
            ip: ip.to_string(),
            data,
        })
    }
}

/// A persisted attempt. Rows are append-only and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub ip: String,
    pub data: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// All-time aggregate over the stored attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_attempts: u64,
    pub unique_ips: u64,
}
