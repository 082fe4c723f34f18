//! LDAP/Active Directory authentication module
//!
//! Provides:
//! - Endpoint resolution for `ldap://` and `ldaps://` URLs
//! - Injection-safe search filter composition
//! - Per-operation sessions over an `ldap3` connection
//! - User and group lookup with configurable attribute mapping
//! - End-user authentication and configuration testing

mod auth;
mod client;
mod conn;
mod controller;
mod directory;
mod endpoint;
mod filter;
mod group;
mod search;
mod session;
mod tester;
mod types;

#[cfg(test)]
mod testing;

pub use auth::LdapAuthProvider;
pub use client::LdapClient;
pub use conn::Ldap3Connector;
pub use controller::LdapController;
pub use directory::{ConnectOptions, DirectoryConnection, DirectoryConnector, DirectoryEntry};
pub use endpoint::{Endpoint, Protocol};
pub use filter::{escape, LdapFilter};
pub use group::GroupSearcher;
pub use search::{UserSearcher, DEFAULT_USER_ATTRIBUTES};
pub use session::Session;
pub use tester::test_config;
pub use types::PingResponse;
