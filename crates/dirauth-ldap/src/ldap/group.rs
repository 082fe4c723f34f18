//! Group lookup

use crate::ldap::directory::DirectoryEntry;
use crate::ldap::filter::{escape, LdapFilter};
use crate::ldap::session::Session;
use dirauth_core::{Error, Group, GroupConfig, Result, SearchScope, User};

#[derive(Debug, Clone, Copy, Default)]
pub struct GroupSearcher;

impl GroupSearcher {
    pub fn new() -> Self {
        Self
    }

    /// Groups under the group base DN whose name attribute matches `name`
    pub async fn search_by_name(&self, session: &mut Session, name: &str) -> Result<Vec<Group>> {
        let group = session.group_config().clone();
        let (base_dn, name_attr) = required(&group)?;

        let escaped = escape(name.trim());
        let value = if escaped.is_empty() { "*" } else { escaped.as_ref() };
        let filter = LdapFilter::new(&group.filter)?
            .and(LdapFilter::new(&format!("({}={})", name_attr, value))?);

        session.bind_search_identity().await?;
        let entries = session
            .search(base_dn, group.search_scope, &filter, &[name_attr.to_string()])
            .await?;

        Ok(entries
            .iter()
            .map(|entry| to_group(entry, name_attr))
            .collect())
    }

    /// The group entry at `dn`
    pub async fn search_by_dn(&self, session: &mut Session, dn: &str) -> Result<Group> {
        let group = session.group_config().clone();
        let name_attr = group.name_attribute.trim();
        if name_attr.is_empty() {
            return Err(Error::InvalidGroupConfig(
                "ldap_group_name_attribute is required".into(),
            ));
        }

        let filter = LdapFilter::new(&group.filter)?;

        session.bind_search_identity().await?;
        let mut entries = session
            .search(dn, SearchScope::Base, &filter, &[name_attr.to_string()])
            .await?;

        match entries.len() {
            0 => Err(Error::NotFound(dn.to_string())),
            1 => Ok(to_group(&entries.remove(0), name_attr)),
            count => Err(Error::AmbiguousEntry {
                username: dn.to_string(),
                count,
            }),
        }
    }

    /// Whether the user's membership list contains the configured admin group
    pub fn is_group_admin(config: &GroupConfig, user: &User) -> bool {
        user.is_member_of(&config.admin_dn)
    }
}

fn required(group: &GroupConfig) -> Result<(&str, &str)> {
    let base_dn = group.base_dn.trim();
    if base_dn.is_empty() {
        return Err(Error::InvalidGroupConfig(
            "ldap_group_base_dn is required".into(),
        ));
    }
    let name_attr = group.name_attribute.trim();
    if name_attr.is_empty() {
        return Err(Error::InvalidGroupConfig(
            "ldap_group_name_attribute is required".into(),
        ));
    }
    Ok((base_dn, name_attr))
}

fn to_group(entry: &DirectoryEntry, name_attr: &str) -> Group {
    Group {
        dn: entry.dn.clone(),
        name: entry.first_value(name_attr).unwrap_or_default().to_string(),
    }
}
