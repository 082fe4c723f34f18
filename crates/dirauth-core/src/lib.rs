//! Dirauth Core Library
//!
//! Configuration, error taxonomy and user records shared by the dirauth crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AttributeMapping, DirauthConfig, GroupConfig, LdapConfig, SearchScope, ServerType,
    DEFAULT_CONNECTION_TIMEOUT,
};
pub use error::{DirectoryError, Error, ErrorCategory, Result, RC_INVALID_CREDENTIALS};
pub use types::{Group, User};

/// Dirauth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default port for plain LDAP
pub const LDAP_PORT: u16 = 389;

/// Default port for LDAP over TLS
pub const LDAPS_PORT: u16 = 636;
