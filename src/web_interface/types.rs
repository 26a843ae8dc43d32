use serde::{Deserialize, Serialize};

pub const DEFAULT_LIST_LIMIT: u64 = 100;

/// API error payload
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `201 Created` answers to `POST /attempts/`
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct InsertResponse {
    pub status: String,
    pub id: i64,
}

/// Body of the liveness endpoints
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `?skip=&limit=` of `GET /attempts/`
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ListQuery {
    pub skip: u64,
    pub limit: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}
