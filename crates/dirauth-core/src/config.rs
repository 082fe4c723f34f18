//! Configuration for dirauth
//!
//! The `ldap_*` field names are the persistence contract shared with the
//! enclosing identity system and must not be renamed.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Search Scope
// ============================================================================

/// Search depth. Serialized as 0 (base), 1 (one level) or 2 (subtree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SearchScope {
    Base,
    OneLevel,
    #[default]
    Subtree,
}

impl TryFrom<u8> for SearchScope {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SearchScope::Base),
            1 => Ok(SearchScope::OneLevel),
            2 => Ok(SearchScope::Subtree),
            other => Err(format!("invalid search scope {}, expected 0, 1 or 2", other)),
        }
    }
}

impl From<SearchScope> for u8 {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => 0,
            SearchScope::OneLevel => 1,
            SearchScope::Subtree => 2,
        }
    }
}

impl std::str::FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "base" => Ok(SearchScope::Base),
            "1" | "one" | "onelevel" | "one_level" => Ok(SearchScope::OneLevel),
            "2" | "sub" | "subtree" => Ok(SearchScope::Subtree),
            other => Err(format!("unknown search scope: {}", other)),
        }
    }
}

// ============================================================================
// LDAP Configuration
// ============================================================================

/// Directory connection and user search settings
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LdapConfig {
    /// Server URL, e.g. "ldaps://dc.example.com", "ldap.example.com:389" or a bare host
    #[serde(rename = "ldap_url", default)]
    pub url: String,

    /// Service account used for searches, e.g. "cn=admin,dc=example,dc=com"
    #[serde(rename = "ldap_search_dn", default)]
    pub search_dn: String,

    #[serde(rename = "ldap_search_password", default)]
    pub search_password: String,

    /// Base DN for user searches
    #[serde(rename = "ldap_base_dn", default)]
    pub base_dn: String,

    /// Extra filter ANDed with the uid match, possibly empty
    #[serde(rename = "ldap_filter", default)]
    pub filter: String,

    /// Attribute holding the login name ("uid" on OpenLDAP, "sAMAccountName" on AD)
    #[serde(rename = "ldap_uid", default = "default_uid")]
    pub uid: String,

    #[serde(rename = "ldap_scope", default)]
    pub scope: SearchScope,

    /// Dial timeout in seconds
    #[serde(rename = "ldap_connection_timeout", default = "default_timeout")]
    pub connection_timeout: u64,

    /// Verify the server certificate chain for ldaps.
    /// Turning this off accepts any certificate and should only be used against test servers.
    #[serde(rename = "ldap_verify_cert", default = "default_true")]
    pub verify_cert: bool,
}

fn default_uid() -> String {
    "uid".to_string()
}

/// Dial timeout used when none is configured
pub const DEFAULT_CONNECTION_TIMEOUT: u64 = 5;

fn default_timeout() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT
}

fn default_true() -> bool {
    true
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            search_dn: String::new(),
            search_password: String::new(),
            base_dn: String::new(),
            filter: String::new(),
            uid: default_uid(),
            scope: SearchScope::default(),
            connection_timeout: default_timeout(),
            verify_cert: true,
        }
    }
}

impl fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConfig")
            .field("url", &self.url)
            .field("search_dn", &self.search_dn)
            .field("search_password", &redact(&self.search_password))
            .field("base_dn", &self.base_dn)
            .field("filter", &self.filter)
            .field("uid", &self.uid)
            .field("scope", &self.scope)
            .field("connection_timeout", &self.connection_timeout)
            .field("verify_cert", &self.verify_cert)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "***"
    }
}

impl LdapConfig {
    /// Dial timeout to apply; an unset (zero) value falls back to the default
    pub fn dial_timeout(&self) -> std::time::Duration {
        let secs = match self.connection_timeout {
            0 => DEFAULT_CONNECTION_TIMEOUT,
            secs => secs,
        };
        std::time::Duration::from_secs(secs)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.url.trim().is_empty() {
            return Err(crate::Error::InvalidConfig("ldap_url is required".into()));
        }
        if self.uid.trim().is_empty() {
            return Err(crate::Error::InvalidConfig("ldap_uid is required".into()));
        }
        if self.connection_timeout == 0 {
            return Err(crate::Error::InvalidConfig(
                "ldap_connection_timeout must be at least one second".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Group Configuration
// ============================================================================

/// Group lookup settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupConfig {
    #[serde(rename = "ldap_group_base_dn", default, skip_serializing_if = "String::is_empty")]
    pub base_dn: String,

    #[serde(rename = "ldap_group_filter", default, skip_serializing_if = "String::is_empty")]
    pub filter: String,

    /// Attribute holding the group name, usually "cn"
    #[serde(
        rename = "ldap_group_name_attribute",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub name_attribute: String,

    #[serde(rename = "ldap_group_search_scope", default)]
    pub search_scope: SearchScope,

    /// DN of the group whose members are directory administrators
    #[serde(rename = "ldap_group_admin_dn", default, skip_serializing_if = "String::is_empty")]
    pub admin_dn: String,

    /// User attribute listing group DNs, e.g. "memberof". Empty disables membership lookup.
    #[serde(
        rename = "ldap_group_membership_attribute",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub membership_attribute: String,
}

// ============================================================================
// Attribute Mapping
// ============================================================================

/// Ordered attribute precedence for the user record.
///
/// For each field the first listed attribute present on the entry wins. The
/// default puts `cn` ahead of `uid` for the real name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeMapping {
    #[serde(default = "default_real_name_attributes")]
    pub real_name_attributes: Vec<String>,

    #[serde(default = "default_email_attributes")]
    pub email_attributes: Vec<String>,
}

fn default_real_name_attributes() -> Vec<String> {
    vec!["cn".to_string(), "uid".to_string()]
}

fn default_email_attributes() -> Vec<String> {
    vec!["email".to_string(), "mail".to_string()]
}

impl Default for AttributeMapping {
    fn default() -> Self {
        Self {
            real_name_attributes: default_real_name_attributes(),
            email_attributes: default_email_attributes(),
        }
    }
}

impl AttributeMapping {
    /// Active Directory mapping, preferring displayName for the real name
    pub fn active_directory() -> Self {
        Self {
            real_name_attributes: vec![
                "displayName".to_string(),
                "cn".to_string(),
                "uid".to_string(),
            ],
            email_attributes: default_email_attributes(),
        }
    }
}

/// Directory server flavor, used to pick sensible defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerType {
    #[default]
    OpenLdap,
    ActiveDirectory,
}

impl ServerType {
    pub fn default_uid_attribute(&self) -> &'static str {
        match self {
            ServerType::ActiveDirectory => "sAMAccountName",
            ServerType::OpenLdap => "uid",
        }
    }

    pub fn default_membership_attribute(&self) -> &'static str {
        match self {
            ServerType::ActiveDirectory => "memberOf",
            ServerType::OpenLdap => "memberof",
        }
    }

    pub fn attribute_mapping(&self) -> AttributeMapping {
        match self {
            ServerType::ActiveDirectory => AttributeMapping::active_directory(),
            ServerType::OpenLdap => AttributeMapping::default(),
        }
    }
}

impl std::str::FromStr for ServerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openldap" | "open_ldap" | "ldap" => Ok(ServerType::OpenLdap),
            "ad" | "active_directory" | "activedirectory" => Ok(ServerType::ActiveDirectory),
            other => Err(format!("unknown server type: {}", other)),
        }
    }
}

// ============================================================================
// Application Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirauthConfig {
    #[serde(default)]
    pub ldap: LdapConfig,

    #[serde(default)]
    pub group: GroupConfig,

    #[serde(default)]
    pub mapping: AttributeMapping,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DirauthConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(kind) = std::env::var("DIRAUTH_SERVER_TYPE") {
            match kind.parse::<ServerType>() {
                Ok(server_type) => config = Self::for_server_type(server_type),
                Err(e) => tracing::warn!("Ignoring DIRAUTH_SERVER_TYPE: {}", e),
            }
        }

        if let Ok(url) = std::env::var("DIRAUTH_LDAP_URL") {
            config.ldap.url = url;
        }
        if let Ok(dn) = std::env::var("DIRAUTH_LDAP_SEARCH_DN") {
            config.ldap.search_dn = dn;
        }
        if let Ok(password) = std::env::var("DIRAUTH_LDAP_SEARCH_PASSWORD") {
            config.ldap.search_password = password;
        }
        if let Ok(base) = std::env::var("DIRAUTH_LDAP_BASE_DN") {
            config.ldap.base_dn = base;
        }
        if let Ok(filter) = std::env::var("DIRAUTH_LDAP_FILTER") {
            config.ldap.filter = filter;
        }
        if let Ok(uid) = std::env::var("DIRAUTH_LDAP_UID") {
            config.ldap.uid = uid;
        }
        if let Ok(scope) = std::env::var("DIRAUTH_LDAP_SCOPE") {
            match scope.parse() {
                Ok(s) => config.ldap.scope = s,
                Err(e) => tracing::warn!("Ignoring DIRAUTH_LDAP_SCOPE: {}", e),
            }
        }
        if let Ok(timeout) = std::env::var("DIRAUTH_LDAP_CONNECTION_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                config.ldap.connection_timeout = t;
            }
        }
        if let Ok(verify) = std::env::var("DIRAUTH_LDAP_VERIFY_CERT") {
            config.ldap.verify_cert = !matches!(verify.as_str(), "false" | "0" | "no");
        }
        if let Ok(base) = std::env::var("DIRAUTH_LDAP_GROUP_BASE_DN") {
            config.group.base_dn = base;
        }
        if let Ok(attr) = std::env::var("DIRAUTH_LDAP_GROUP_MEMBERSHIP_ATTRIBUTE") {
            config.group.membership_attribute = attr;
        }
        if let Ok(level) = std::env::var("DIRAUTH_LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }

    /// Create configuration with defaults for the given server flavor
    pub fn for_server_type(server_type: ServerType) -> Self {
        let mut config = Self::default();
        config.ldap.uid = server_type.default_uid_attribute().to_string();
        config.group.membership_attribute =
            server_type.default_membership_attribute().to_string();
        config.group.name_attribute = "cn".to_string();
        config.mapping = server_type.attribute_mapping();
        config
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.ldap.validate()?;
        if self.mapping.real_name_attributes.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "mapping.real_name_attributes must not be empty".into(),
            ));
        }
        Ok(())
    }
}
