//! LDAP session lifecycle
//!
//! A session owns at most one connection and moves through
//! Unopened -> Open -> Closed. It is meant for a single operation: open it,
//! do the work, close it. Dropping an open session drops the connection
//! handle, which also stops the connection driver.

use crate::ldap::directory::{
    ConnectOptions, DirectoryConnection, DirectoryConnector, DirectoryEntry,
};
use crate::ldap::endpoint::Endpoint;
use crate::ldap::filter::LdapFilter;
use dirauth_core::{Error, GroupConfig, LdapConfig, Result, SearchScope};
use std::sync::Arc;
use tracing::{debug, warn};

enum State {
    Unopened,
    Open(Box<dyn DirectoryConnection>),
    Closed,
}

pub struct Session {
    ldap: LdapConfig,
    group: GroupConfig,
    connector: Arc<dyn DirectoryConnector>,
    state: State,
}

impl Session {
    pub fn new(
        connector: Arc<dyn DirectoryConnector>,
        ldap: LdapConfig,
        group: GroupConfig,
    ) -> Self {
        Self {
            ldap,
            group,
            connector,
            state: State::Unopened,
        }
    }

    pub fn ldap_config(&self) -> &LdapConfig {
        &self.ldap
    }

    pub fn group_config(&self) -> &GroupConfig {
        &self.group
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Resolve the configured URL and dial it with the configured timeout.
    ///
    /// A session can be opened once; a failed open leaves it closed.
    pub async fn open(&mut self) -> Result<()> {
        if !matches!(self.state, State::Unopened) {
            return Err(Error::InvalidState("session already opened"));
        }
        self.state = State::Closed;

        let endpoint = Endpoint::resolve(&self.ldap.url)?;
        let options = ConnectOptions {
            timeout: self.ldap.dial_timeout(),
            verify_cert: self.ldap.verify_cert,
        };

        debug!(
            "Opening LDAP session to {} (timeout {}s)",
            endpoint,
            options.timeout.as_secs()
        );

        match self.connector.connect(&endpoint, options).await {
            Ok(conn) => {
                self.state = State::Open(conn);
                Ok(())
            }
            Err(source) if source.is_timeout() => Err(Error::NetworkTimeout {
                endpoint: endpoint.to_string(),
                source,
            }),
            Err(source) => Err(Error::DialFailure {
                endpoint: endpoint.to_string(),
                source,
            }),
        }
    }

    /// Simple bind as `dn`.
    ///
    /// An empty password is refused locally: servers treat it as an
    /// unauthenticated bind and report success.
    pub async fn bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let conn = self.connection()?;

        if password.is_empty() {
            warn!("Refusing bind with empty password for {}", dn);
            return Err(Error::InvalidCredential { dn: dn.to_string() });
        }

        debug!("Binding as {}", dn);
        conn.bind(dn, password).await.map_err(|source| {
            if source.is_invalid_credentials() {
                Error::InvalidCredential { dn: dn.to_string() }
            } else {
                Error::BindFailure {
                    dn: dn.to_string(),
                    source,
                }
            }
        })
    }

    /// Bind as the configured search identity, if one is set.
    ///
    /// Any failure here is a service account problem, so it is reported as
    /// [`Error::BindFailure`] even when the server answers invalidCredentials.
    pub async fn bind_search_identity(&mut self) -> Result<()> {
        let dn = self.ldap.search_dn.trim().to_string();
        if dn.is_empty() {
            return Ok(());
        }
        if self.ldap.search_password.is_empty() {
            return Err(Error::EmptySearchPassword);
        }

        let password = self.ldap.search_password.clone();
        let conn = self.connection()?;
        debug!("Binding as search identity {}", dn);
        conn.bind(&dn, &password).await.map_err(|source| {
            warn!("Search identity bind failed for {}: {}", dn, source);
            Error::BindFailure { dn, source }
        })
    }

    pub async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &LdapFilter,
        attrs: &[String],
    ) -> Result<Vec<DirectoryEntry>> {
        let conn = self.connection()?;
        let filter = filter.to_search_string();

        debug!(
            "Searching {:?} (scope {:?}) with filter {}",
            base_dn, scope, filter
        );

        let entries = conn
            .search(base_dn, scope, &filter, attrs)
            .await
            .map_err(|source| Error::SearchFailure {
                base_dn: base_dn.to_string(),
                filter: filter.clone(),
                source,
            })?;

        debug!("Search returned {} entries", entries.len());
        Ok(entries)
    }

    /// Release the connection. Safe to call any number of times.
    pub async fn close(&mut self) {
        if let State::Open(mut conn) = std::mem::replace(&mut self.state, State::Closed) {
            if let Err(e) = conn.unbind().await {
                debug!("LDAP unbind failed: {}", e);
            }
        }
    }

    fn connection(&mut self) -> Result<&mut Box<dyn DirectoryConnection>> {
        match &mut self.state {
            State::Open(conn) => Ok(conn),
            State::Unopened => Err(Error::InvalidState("session not opened")),
            State::Closed => Err(Error::InvalidState("session closed")),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_open() {
            debug!("LDAP session dropped while open; connection released without unbind");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::testing::{Call, MockDirectory};
    use dirauth_core::DirectoryError;
    use std::time::Duration;

    fn config() -> LdapConfig {
        LdapConfig {
            url: "ldap.example.com".to_string(),
            ..Default::default()
        }
    }

    fn session(dir: &MockDirectory, ldap: LdapConfig) -> Session {
        Session::new(dir.connector(), ldap, GroupConfig::default())
    }

    #[tokio::test]
    async fn test_open_threads_timeout_and_verification() {
        let dir = MockDirectory::new();
        let mut s = session(
            &dir,
            LdapConfig {
                url: "ldaps://dc.example.com".to_string(),
                connection_timeout: 12,
                verify_cert: false,
                ..Default::default()
            },
        );

        s.open().await.unwrap();
        assert!(s.is_open());
        assert_eq!(
            dir.calls(),
            vec![Call::Connect {
                url: "ldaps://dc.example.com:636".to_string(),
                options: ConnectOptions {
                    timeout: Duration::from_secs(12),
                    verify_cert: false,
                },
            }]
        );
    }

    #[tokio::test]
    async fn test_zero_timeout_dials_with_default() {
        let dir = MockDirectory::new();
        let mut s = session(
            &dir,
            LdapConfig {
                connection_timeout: 0,
                ..config()
            },
        );

        s.open().await.unwrap();
        let calls = dir.calls();
        let Call::Connect { options, .. } = &calls[0] else {
            panic!("expected connect, got {calls:?}");
        };
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(!options.timeout.is_zero());
    }

    #[tokio::test]
    async fn test_open_rejects_bad_url_without_dialing() {
        let dir = MockDirectory::new();
        let mut s = session(
            &dir,
            LdapConfig {
                url: "http://dc.example.com".to_string(),
                ..Default::default()
            },
        );

        let err = s.open().await.unwrap_err();
        assert_eq!(err.code(), "InvalidURL");
        assert!(dir.calls().is_empty());
    }

    #[tokio::test]
    async fn test_open_classifies_connect_errors() {
        let dir = MockDirectory::new().failing_connect(DirectoryError::Timeout);
        let err = session(&dir, config()).open().await.unwrap_err();
        assert_eq!(err.code(), "NetworkTimeout");

        let dir = MockDirectory::new().failing_connect(DirectoryError::Network("refused".into()));
        let err = session(&dir, config()).open().await.unwrap_err();
        assert_eq!(err.code(), "DialFailure");
    }

    #[tokio::test]
    async fn test_operations_require_open_session() {
        let dir = MockDirectory::new();
        let mut s = session(&dir, config());

        let err = s.bind("cn=admin", "secret").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        let err = s
            .search("dc=example", SearchScope::Subtree, &LdapFilter::empty(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_reopen_is_rejected() {
        let dir = MockDirectory::new();
        let mut s = session(&dir, config());

        s.open().await.unwrap();
        assert!(matches!(s.open().await, Err(Error::InvalidState(_))));

        s.close().await;
        assert!(matches!(s.open().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dir = MockDirectory::new();
        let mut s = session(&dir, config());

        s.close().await;
        assert!(dir.calls().is_empty());

        let mut s = session(&dir, config());
        s.open().await.unwrap();
        s.close().await;
        s.close().await;
        s.close().await;

        assert!(!s.is_open());
        assert_eq!(dir.count(|c| matches!(c, Call::Unbind)), 1);
    }

    #[tokio::test]
    async fn test_bind_distinguishes_credentials_from_transport() {
        let dir = MockDirectory::new().with_password("cn=admin", "secret");
        let mut s = session(&dir, config());
        s.open().await.unwrap();

        assert!(s.bind("cn=admin", "secret").await.is_ok());

        let err = s.bind("cn=admin", "wrong").await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredential { .. }));

        let dir = MockDirectory::new().failing_bind(DirectoryError::Network("reset".into()));
        let mut s = session(&dir, config());
        s.open().await.unwrap();
        let err = s.bind("cn=admin", "secret").await.unwrap_err();
        assert!(matches!(err, Error::BindFailure { .. }));
    }

    #[tokio::test]
    async fn test_empty_password_never_reaches_server() {
        let dir = MockDirectory::new().with_password("cn=admin", "");
        let mut s = session(&dir, config());
        s.open().await.unwrap();

        let err = s.bind("cn=admin", "").await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredential { .. }));
        assert!(dir.binds().is_empty());
    }

    #[tokio::test]
    async fn test_search_identity_failures_are_not_user_credential_errors() {
        let svc = LdapConfig {
            search_dn: "cn=svc,dc=example,dc=com".to_string(),
            search_password: "stale".to_string(),
            ..config()
        };
        let dir = MockDirectory::new().with_password("cn=svc,dc=example,dc=com", "current");
        let mut s = session(&dir, svc.clone());
        s.open().await.unwrap();

        let err = s.bind_search_identity().await.unwrap_err();
        match err {
            Error::BindFailure { dn, source } => {
                assert_eq!(dn, "cn=svc,dc=example,dc=com");
                assert!(source.is_invalid_credentials());
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut s = session(
            &dir,
            LdapConfig {
                search_password: String::new(),
                ..svc
            },
        );
        s.open().await.unwrap();
        let err = s.bind_search_identity().await.unwrap_err();
        assert!(matches!(err, Error::EmptySearchPassword));
        assert_eq!(dir.binds().len(), 1);

        let mut s = session(&dir, config());
        s.open().await.unwrap();
        s.bind_search_identity().await.unwrap();
        assert_eq!(dir.binds().len(), 1);
    }

    #[tokio::test]
    async fn test_search_failure_carries_context() {
        let dir = MockDirectory::new().failing_search(DirectoryError::Protocol {
            rc: 32,
            message: "no such object".into(),
        });
        let mut s = session(&dir, config());
        s.open().await.unwrap();

        let err = s
            .search(
                "ou=missing,dc=example",
                SearchScope::Subtree,
                &LdapFilter::new("uid=jdoe").unwrap(),
                &[],
            )
            .await
            .unwrap_err();

        match err {
            Error::SearchFailure { base_dn, filter, .. } => {
                assert_eq!(base_dn, "ou=missing,dc=example");
                assert_eq!(filter, "(uid=jdoe)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
