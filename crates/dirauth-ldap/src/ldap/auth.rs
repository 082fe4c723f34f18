//! End-user authentication against the directory

use crate::ldap::client::LdapClient;
use crate::ldap::group::GroupSearcher;
use crate::ldap::session::Session;
use dirauth_core::{Error, GroupConfig, LdapConfig, Result, User};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// LDAP authentication provider for integration with an identity system
pub struct LdapAuthProvider {
    client: Arc<LdapClient>,
    ldap: LdapConfig,
    group: GroupConfig,
}

impl LdapAuthProvider {
    pub fn new(client: Arc<LdapClient>, ldap: LdapConfig, group: GroupConfig) -> Self {
        Self { client, ldap, group }
    }

    /// Verify `credential` for `principal` and return the directory's view of the user.
    ///
    /// The user is located with a search and then bound by DN. The returned
    /// attributes come from the search result.
    pub async fn authenticate(&self, principal: &str, credential: &str) -> Result<User> {
        let principal = principal.trim();
        if principal.is_empty() {
            return Err(Error::EmptyPrincipal);
        }

        let mut session = self.client.session(&self.ldap, &self.group);
        let result = self.authenticate_in(&mut session, principal, credential).await;
        session.close().await;

        match &result {
            Ok(user) => info!("LDAP authentication succeeded for {} ({})", principal, user.dn),
            Err(e) => warn!("LDAP authentication failed for {}: {}", principal, e),
        }
        result
    }

    async fn authenticate_in(
        &self,
        session: &mut Session,
        principal: &str,
        credential: &str,
    ) -> Result<User> {
        session.open().await?;

        let user = self.client.searcher().search_user(session, principal).await?;

        debug!("Verifying credential for {}", user.dn);
        session.bind(&user.dn, credential).await?;

        Ok(user)
    }

    /// Whether the user belongs to the configured admin group
    pub fn is_group_admin(&self, user: &User) -> bool {
        GroupSearcher::is_group_admin(&self.group, user)
    }

    /// Get underlying client for admin operations
    pub fn client(&self) -> Arc<LdapClient> {
        self.client.clone()
    }
}
