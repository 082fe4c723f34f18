//! Administrative connectivity check
//!
//! Validates a candidate configuration: the server must be reachable and the
//! search identity must be able to bind with its credential.

use crate::ldap::directory::DirectoryConnector;
use crate::ldap::session::Session;
use dirauth_core::{Error, GroupConfig, LdapConfig, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub async fn test_config(
    connector: Arc<dyn DirectoryConnector>,
    config: &LdapConfig,
) -> Result<()> {
    let mut session = Session::new(connector, config.clone(), GroupConfig::default());
    let result = check(&mut session, config).await;
    session.close().await;

    match &result {
        Ok(()) => info!("LDAP configuration test succeeded for {}", config.url),
        Err(e) => debug!("LDAP configuration test failed: {} ({})", e, e.code()),
    }
    result
}

async fn check(session: &mut Session, config: &LdapConfig) -> Result<()> {
    session.open().await?;

    if config.search_dn.trim().is_empty() {
        return Err(Error::EmptySearchDN);
    }

    session
        .bind(config.search_dn.trim(), &config.search_password)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::testing::{Call, MockDirectory};
    use dirauth_core::DirectoryError;

    const SVC_DN: &str = "cn=svc,dc=example,dc=com";

    fn config() -> LdapConfig {
        LdapConfig {
            url: "ldaps://dc.example.com".to_string(),
            search_dn: SVC_DN.to_string(),
            search_password: "svc-secret".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_success() {
        let dir = MockDirectory::new().with_password(SVC_DN, "svc-secret");
        test_config(dir.connector(), &config()).await.unwrap();
        assert_eq!(dir.binds(), vec![SVC_DN.to_string()]);
        assert_eq!(dir.count(|c| matches!(c, Call::Unbind)), 1);
    }

    #[tokio::test]
    async fn test_empty_search_dn_after_successful_open() {
        let dir = MockDirectory::new();
        let err = test_config(
            dir.connector(),
            &LdapConfig {
                search_dn: " ".to_string(),
                ..config()
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::EmptySearchDN));
        assert_eq!(dir.count(|c| matches!(c, Call::Connect { .. })), 1);
        assert!(dir.binds().is_empty());
        assert_eq!(dir.count(|c| matches!(c, Call::Unbind)), 1);
    }

    #[tokio::test]
    async fn test_connectivity_classification() {
        let dir = MockDirectory::new().failing_connect(DirectoryError::Timeout);
        let err = test_config(dir.connector(), &config()).await.unwrap_err();
        assert_eq!(err.code(), "NetworkTimeout");

        let dir =
            MockDirectory::new().failing_connect(DirectoryError::Tls("bad certificate".into()));
        let err = test_config(dir.connector(), &config()).await.unwrap_err();
        assert_eq!(err.code(), "DialFailure");

        let dir = MockDirectory::new();
        let err = test_config(
            dir.connector(),
            &LdapConfig {
                url: "foo://dc.example.com".to_string(),
                ..config()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "InvalidURL");
        assert!(dir.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bind_classification() {
        let dir = MockDirectory::new().with_password(SVC_DN, "other");
        let err = test_config(dir.connector(), &config()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredential { .. }));

        let dir = MockDirectory::new().failing_bind(DirectoryError::Protocol {
            rc: 53,
            message: "unwilling to perform".into(),
        });
        let err = test_config(dir.connector(), &config()).await.unwrap_err();
        assert!(matches!(err, Error::BindFailure { .. }));
    }
}
