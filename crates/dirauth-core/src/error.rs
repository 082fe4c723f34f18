//! Error types for dirauth

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// LDAP result code for `invalidCredentials`.
pub const RC_INVALID_CREDENTIALS: u32 = 49;

/// Failure reported by the directory client, before any operation context is attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("operation timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("server returned result code {rc}: {message}")]
    Protocol { rc: u32, message: String },

    #[error("{0}")]
    Other(String),
}

impl DirectoryError {
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, DirectoryError::Protocol { rc, .. } if *rc == RC_INVALID_CREDENTIALS)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DirectoryError::Timeout)
    }
}

/// Coarse classification used by callers for diagnostics display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Connectivity,
    Credential,
    Lookup,
    Internal,
}

#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("Empty user id")]
    EmptyPrincipal,

    #[error("Empty search dn")]
    EmptySearchDN,

    #[error("Empty search password and no active configuration to fall back to")]
    EmptySearchPassword,

    #[error("Invalid LDAP URL {url:?}: {reason}")]
    InvalidURL { url: String, reason: String },

    #[error("Invalid LDAP filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Invalid group configuration: {0}")]
    InvalidGroupConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Connectivity Errors
    #[error("Failed to connect to LDAP server {endpoint}")]
    DialFailure {
        endpoint: String,
        #[source]
        source: DirectoryError,
    },

    #[error("LDAP server network timeout connecting to {endpoint}")]
    NetworkTimeout {
        endpoint: String,
        #[source]
        source: DirectoryError,
    },

    // Credential Errors
    #[error("Invalid credential for {dn}")]
    InvalidCredential { dn: String },

    #[error("Failed to bind as {dn}")]
    BindFailure {
        dn: String,
        #[source]
        source: DirectoryError,
    },

    // Lookup Errors
    #[error("Not found an entry for {0:?}")]
    NotFound(String),

    #[error("Found {count} entries for {username:?}, expected exactly one")]
    AmbiguousEntry { username: String, count: usize },

    #[error("Search under {base_dn:?} with filter {filter} failed")]
    SearchFailure {
        base_dn: String,
        filter: String,
        #[source]
        source: DirectoryError,
    },

    // Internal Errors
    #[error("Invalid session state: {0}")]
    InvalidState(&'static str),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::EmptyPrincipal => "EmptyPrincipal",
            Error::EmptySearchDN => "EmptySearchDN",
            Error::EmptySearchPassword => "EmptySearchPassword",
            Error::InvalidURL { .. } => "InvalidURL",
            Error::InvalidFilter { .. } => "InvalidFilter",
            Error::InvalidGroupConfig(_) => "InvalidGroupConfig",
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::DialFailure { .. } => "DialFailure",
            Error::NetworkTimeout { .. } => "NetworkTimeout",
            Error::InvalidCredential { .. } => "InvalidCredential",
            Error::BindFailure { .. } => "BindFailure",
            Error::NotFound(_) => "NotFound",
            Error::AmbiguousEntry { .. } => "AmbiguousEntry",
            Error::SearchFailure { .. } => "SearchFailure",
            Error::InvalidState(_) => "InvalidState",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::EmptyPrincipal
            | Error::EmptySearchDN
            | Error::EmptySearchPassword
            | Error::InvalidURL { .. }
            | Error::InvalidFilter { .. }
            | Error::InvalidGroupConfig(_)
            | Error::InvalidConfig(_) => ErrorCategory::Configuration,

            Error::DialFailure { .. } | Error::NetworkTimeout { .. } => {
                ErrorCategory::Connectivity
            }

            Error::InvalidCredential { .. } | Error::BindFailure { .. } => {
                ErrorCategory::Credential
            }

            Error::NotFound(_) | Error::AmbiguousEntry { .. } | Error::SearchFailure { .. } => {
                ErrorCategory::Lookup
            }

            Error::InvalidState(_) => ErrorCategory::Internal,
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidURL {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_filter(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidFilter {
            filter: filter.into(),
            reason: reason.into(),
        }
    }
}
