//! ldap3-backed directory connections
//!
//! Dials plain LDAP or LDAPS through `ldap3` and maps its results and errors
//! onto the directory traits.

use crate::ldap::directory::{
    ConnectOptions, DirectoryConnection, DirectoryConnector, DirectoryEntry,
};
use crate::ldap::endpoint::Endpoint;
use async_trait::async_trait;
use dirauth_core::{DirectoryError, SearchScope};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Scope, SearchEntry};
use tracing::{debug, warn};

/// Connector backed by `ldap3`
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldap3Connector;

impl Ldap3Connector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        options: ConnectOptions,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let mut settings = LdapConnSettings::new().set_conn_timeout(options.timeout);

        if endpoint.is_tls() && !options.verify_cert {
            warn!(
                "TLS certificate verification disabled for {} (ldap_verify_cert = false)",
                endpoint
            );
            settings = settings.set_no_tls_verify(true);
        }

        let url = endpoint.to_string();
        debug!("Connecting to LDAP server: {}", url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(classify)?;

        ldap3::drive!(conn);

        Ok(Box::new(Ldap3Connection { ldap }))
    }
}

struct Ldap3Connection {
    ldap: Ldap,
}

#[async_trait]
impl DirectoryConnection for Ldap3Connection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let result = self
            .ldap
            .simple_bind(dn, password)
            .await
            .map_err(classify)?;
        check(result)
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let (rs, _res) = self
            .ldap
            .search(base_dn, to_ldap3_scope(scope), filter, attrs.to_vec())
            .await
            .map_err(classify)?
            .success()
            .map_err(classify)?;

        Ok(rs
            .into_iter()
            .map(|result| {
                let entry = SearchEntry::construct(result);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs.into_iter().collect(),
                }
            })
            .collect())
    }

    async fn unbind(&mut self) -> Result<(), DirectoryError> {
        self.ldap.unbind().await.map_err(classify)
    }
}

fn to_ldap3_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn check(result: LdapResult) -> Result<(), DirectoryError> {
    if result.rc == 0 {
        Ok(())
    } else {
        Err(DirectoryError::Protocol {
            rc: result.rc,
            message: result.text,
        })
    }
}

/// Map an `ldap3` error onto the directory error kinds
fn classify(err: LdapError) -> DirectoryError {
    match err {
        LdapError::Timeout { .. } => DirectoryError::Timeout,
        LdapError::Io { source, .. } if source.kind() == std::io::ErrorKind::TimedOut => {
            DirectoryError::Timeout
        }
        LdapError::Io { source, .. } if is_tls_failure(&source) => {
            DirectoryError::Tls(source.to_string())
        }
        LdapError::Io { source, .. } => DirectoryError::Network(source.to_string()),
        err @ (LdapError::Rustls { .. } | LdapError::DNSName { .. }) => {
            DirectoryError::Tls(err.to_string())
        }
        LdapError::LdapResult { result, .. } => DirectoryError::Protocol {
            rc: result.rc,
            message: result.text,
        },
        other => DirectoryError::Other(other.to_string()),
    }
}

/// Handshake failures reach us as I/O errors wrapping the rustls error
fn is_tls_failure(err: &std::io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<rustls::Error>())
}
