//! Status envelope returned by command handlers.

use serde::{Deserialize, Serialize};

/// HTTP-style status codes carried by [`DataResponse`].
///
/// Only the codes the command handlers actually produce are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const CONFLICT: StatusCode = StatusCode(409);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Wraps an arbitrary numeric status.
    pub const fn from_u16(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric status.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns true for 2xx codes.
    pub const fn is_success(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Uniform result envelope: success flag, status code, optional data and message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub status_code: StatusCode,
    pub data: Option<T>,
    pub message: String,
}

impl<T> DataResponse<T> {
    /// Builds a successful response carrying `data`.
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code: StatusCode::OK,
            data: Some(data),
            message: message.into(),
        }
    }

    /// Builds a failed response without data.
    pub fn fail(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            data: None,
            message: message.into(),
        }
    }
}
