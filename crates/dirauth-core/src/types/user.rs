//! Resolved directory user and group records

use serde::{Deserialize, Serialize};

/// A user resolved from the directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub realname: String,
    pub email: String,

    /// Distinguished Name of the matched entry
    pub dn: String,

    /// Values of the membership attribute, in directory response order
    #[serde(default)]
    pub group_dn_list: Vec<String>,
}

impl User {
    /// Check membership against a group DN; DNs compare case-insensitively.
    pub fn is_member_of(&self, group_dn: &str) -> bool {
        let group_dn = group_dn.trim();
        !group_dn.is_empty()
            && self
                .group_dn_list
                .iter()
                .any(|dn| dn.eq_ignore_ascii_case(group_dn))
    }
}

/// A group resolved from the directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub dn: String,
    pub name: String,
}
