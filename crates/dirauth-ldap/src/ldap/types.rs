//! Admin-facing response types

use dirauth_core::Error;
use serde::{Deserialize, Serialize};
use std::error::Error as _;

/// Result of an LDAP connection test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    pub success: bool,

    /// Stable error code when the test failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub message: String,
}

impl PingResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: None,
            message: "Connection successful".to_string(),
        }
    }

    /// Failure response; the message includes the chain of underlying causes
    pub fn failed(err: &Error) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        Self {
            success: false,
            code: Some(err.code().to_string()),
            message,
        }
    }
}

impl From<&dirauth_core::Result<()>> for PingResponse {
    fn from(result: &dirauth_core::Result<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(e),
        }
    }
}
