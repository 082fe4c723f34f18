//! LDAP service entry points
//!
//! [`LdapClient`] holds the shared, read-only parts of the directory
//! integration (the connector and the attribute mapping) and runs each
//! operation on a fresh [`Session`].

use crate::ldap::conn::Ldap3Connector;
use crate::ldap::directory::DirectoryConnector;
use crate::ldap::group::GroupSearcher;
use crate::ldap::search::UserSearcher;
use crate::ldap::session::Session;
use crate::ldap::tester;
use dirauth_core::{AttributeMapping, Group, GroupConfig, LdapConfig, Result, User};
use std::sync::Arc;

pub struct LdapClient {
    connector: Arc<dyn DirectoryConnector>,
    searcher: UserSearcher,
}

impl LdapClient {
    pub fn new(connector: Arc<dyn DirectoryConnector>, mapping: AttributeMapping) -> Self {
        Self {
            connector,
            searcher: UserSearcher::new(mapping),
        }
    }

    /// Client backed by a real directory server
    pub fn with_ldap3(mapping: AttributeMapping) -> Self {
        Self::new(Arc::new(Ldap3Connector::new()), mapping)
    }

    pub fn searcher(&self) -> &UserSearcher {
        &self.searcher
    }

    pub fn mapping(&self) -> &AttributeMapping {
        self.searcher.mapping()
    }

    /// A new unopened session for the given configuration
    pub fn session(&self, ldap: &LdapConfig, group: &GroupConfig) -> Session {
        Session::new(self.connector.clone(), ldap.clone(), group.clone())
    }

    /// Check that the server is reachable and the search identity can bind
    pub async fn ping(&self, ldap: &LdapConfig) -> Result<()> {
        tester::test_config(self.connector.clone(), ldap).await
    }

    /// Users matching `username`; an empty list when nothing matches
    pub async fn search_user(
        &self,
        ldap: &LdapConfig,
        group: &GroupConfig,
        username: &str,
    ) -> Result<Vec<User>> {
        let mut session = self.session(ldap, group);
        let result = match session.open().await {
            Ok(()) => self.searcher.search_users(&mut session, username).await,
            Err(e) => Err(e),
        };
        session.close().await;
        result
    }

    pub async fn search_group_by_name(
        &self,
        ldap: &LdapConfig,
        group: &GroupConfig,
        name: &str,
    ) -> Result<Vec<Group>> {
        let mut session = self.session(ldap, group);
        let result = match session.open().await {
            Ok(()) => GroupSearcher::new().search_by_name(&mut session, name).await,
            Err(e) => Err(e),
        };
        session.close().await;
        result
    }

    pub async fn search_group_by_dn(
        &self,
        ldap: &LdapConfig,
        group: &GroupConfig,
        dn: &str,
    ) -> Result<Group> {
        let mut session = self.session(ldap, group);
        let result = match session.open().await {
            Ok(()) => GroupSearcher::new().search_by_dn(&mut session, dn).await,
            Err(e) => Err(e),
        };
        session.close().await;
        result
    }
}

impl Default for LdapClient {
    fn default() -> Self {
        Self::with_ldap3(AttributeMapping::default())
    }
}
