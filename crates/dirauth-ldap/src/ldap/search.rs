//! User lookup
//!
//! Builds the user filter from the configured base filter and the uid
//! attribute, runs the search, and maps entries onto [`User`] records.

use crate::ldap::directory::DirectoryEntry;
use crate::ldap::filter::{escape, LdapFilter};
use crate::ldap::session::Session;
use dirauth_core::{AttributeMapping, Error, GroupConfig, LdapConfig, Result, User};
use tracing::debug;

/// Attributes always requested for a user entry
pub const DEFAULT_USER_ATTRIBUTES: [&str; 4] = ["uid", "cn", "mail", "email"];

#[derive(Debug, Clone, Default)]
pub struct UserSearcher {
    mapping: AttributeMapping,
}

impl UserSearcher {
    pub fn new(mapping: AttributeMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &AttributeMapping {
        &self.mapping
    }

    /// `(&<ldap_filter>(<ldap_uid>=<escaped username>))`.
    ///
    /// An empty username becomes the `*` wildcard, so it matches every entry
    /// carrying the uid attribute rather than none.
    pub fn user_filter(config: &LdapConfig, username: &str) -> Result<LdapFilter> {
        let escaped = escape(username);
        let value = if escaped.is_empty() { "*" } else { escaped.as_ref() };

        let base = LdapFilter::new(&config.filter)?;
        let uid_match = LdapFilter::new(&format!("({}={})", config.uid.trim(), value))?;
        Ok(base.and(uid_match))
    }

    /// Attribute list for user searches, without duplicates
    pub fn requested_attributes(&self, ldap: &LdapConfig, group: &GroupConfig) -> Vec<String> {
        let mut attrs: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            let name = name.trim();
            if !name.is_empty() && !attrs.iter().any(|a| a.eq_ignore_ascii_case(name)) {
                attrs.push(name.to_string());
            }
        };

        for name in DEFAULT_USER_ATTRIBUTES {
            push(name);
        }
        for name in self
            .mapping
            .real_name_attributes
            .iter()
            .chain(&self.mapping.email_attributes)
        {
            push(name);
        }
        push(&ldap.uid);
        push(&group.membership_attribute);

        attrs
    }

    /// All entries matching `username`, mapped to users.
    ///
    /// Binds as the configured search identity first when one is set.
    pub async fn search_users(&self, session: &mut Session, username: &str) -> Result<Vec<User>> {
        let ldap = session.ldap_config().clone();
        let group = session.group_config().clone();

        let filter = Self::user_filter(&ldap, username)?;
        let attrs = self.requested_attributes(&ldap, &group);

        session.bind_search_identity().await?;
        let entries = session
            .search(&ldap.base_dn, ldap.scope, &filter, &attrs)
            .await?;

        Ok(entries
            .iter()
            .map(|entry| self.map_entry(entry, &ldap, &group))
            .collect())
    }

    /// The single entry matching `username`
    pub async fn search_user(&self, session: &mut Session, username: &str) -> Result<User> {
        let mut users = self.search_users(session, username).await?;

        match users.len() {
            0 => Err(Error::NotFound(username.to_string())),
            1 => {
                let user = users.remove(0);
                debug!("Found LDAP user {:?} at {}", user.username, user.dn);
                Ok(user)
            }
            count => Err(Error::AmbiguousEntry {
                username: username.to_string(),
                count,
            }),
        }
    }

    pub fn map_entry(
        &self,
        entry: &DirectoryEntry,
        ldap: &LdapConfig,
        group: &GroupConfig,
    ) -> User {
        let first_of = |names: &[String]| {
            names
                .iter()
                .find_map(|name| entry.first_value(name))
                .unwrap_or_default()
                .to_string()
        };

        let group_dn_list = if group.membership_attribute.trim().is_empty() {
            Vec::new()
        } else {
            entry
                .values(group.membership_attribute.trim())
                .unwrap_or_default()
                .iter()
                .map(|dn| dn.trim().to_string())
                .collect()
        };

        User {
            username: entry
                .first_value(ldap.uid.trim())
                .unwrap_or_default()
                .to_string(),
            realname: first_of(&self.mapping.real_name_attributes),
            email: first_of(&self.mapping.email_attributes),
            dn: entry.dn.clone(),
            group_dn_list,
        }
    }
}
