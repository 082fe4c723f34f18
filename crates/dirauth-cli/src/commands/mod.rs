//! CLI command implementations

pub mod auth;
pub mod group;
pub mod ping;
pub mod search;

use crate::OutputFormat;
use anyhow::Result;
use dirauth_core::DirauthConfig;
use dirauth_ldap::LdapClient;
use serde::Serialize;
use std::sync::Arc;

/// Context passed to all commands
pub struct CommandContext {
    pub config: DirauthConfig,
    pub client: Arc<LdapClient>,
    pub output_format: OutputFormat,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Pretty JSON of `value`, or `text(value)` in text mode
    pub fn render<T: Serialize>(
        &self,
        value: &T,
        text: impl FnOnce(&T) -> String,
    ) -> Result<String> {
        if self.is_json() {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(text(value))
        }
    }

    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
        println!("{}", self.render(value, text)?);
        Ok(())
    }
}

/// Effective configuration with the search password masked
pub fn render_config(ctx: &CommandContext) -> Result<String> {
    let mut config = ctx.config.clone();
    if !config.ldap.search_password.is_empty() {
        config.ldap.search_password = "********".to_string();
    }
    ctx.render(&config, |config| format!("{:#?}", config))
}

pub fn show_config(ctx: &CommandContext) -> Result<()> {
    println!("{}", render_config(ctx)?);
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_context(output_format: OutputFormat) -> CommandContext {
    let mut config = DirauthConfig::default();
    config.ldap.url = "ldaps://dc.example.com".to_string();
    config.ldap.search_dn = "cn=svc,dc=example,dc=com".to_string();
    config.ldap.search_password = "hunter2".to_string();
    CommandContext {
        client: Arc::new(LdapClient::with_ldap3(config.mapping.clone())),
        config,
        output_format,
    }
}
