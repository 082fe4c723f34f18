//! Directory client abstraction
//!
//! Everything above this layer talks to the directory through these traits.
//! [`super::conn::Ldap3Connector`] is the production implementation.

use crate::ldap::endpoint::Endpoint;
use async_trait::async_trait;
use dirauth_core::{DirectoryError, SearchScope};
use std::time::Duration;

/// Options applied when dialing a directory server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Dial timeout
    pub timeout: Duration,

    /// Verify the server certificate chain for ldaps
    pub verify_cert: bool,
}

/// A raw entry as returned by a search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: Vec<(String, Vec<String>)>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attr<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs
            .push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Values of an attribute, matching the name case-insensitively
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// First value of an attribute, trimmed
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|values| values.first())
            .map(|v| v.trim())
    }
}

/// Opens connections to a directory server
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        options: ConnectOptions,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError>;
}

/// One live directory connection
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Simple bind. A non-success result code is reported as [`DirectoryError::Protocol`].
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    async fn unbind(&mut self) -> Result<(), DirectoryError>;
}
