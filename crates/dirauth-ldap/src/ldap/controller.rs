//! Admin operations on LDAP configuration

use crate::ldap::client::LdapClient;
use crate::ldap::types::PingResponse;
use dirauth_core::{Error, LdapConfig};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Tests candidate configurations against the one currently in effect
pub struct LdapController {
    client: Arc<LdapClient>,
    active: Arc<RwLock<Option<LdapConfig>>>,
}

impl LdapController {
    pub fn new(client: Arc<LdapClient>) -> Self {
        Self {
            client,
            active: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_active(client: Arc<LdapClient>, active: LdapConfig) -> Self {
        Self {
            client,
            active: Arc::new(RwLock::new(Some(active))),
        }
    }

    pub async fn set_active(&self, config: Option<LdapConfig>) {
        *self.active.write().await = config;
        info!("Active LDAP configuration updated");
    }

    pub async fn active(&self) -> Option<LdapConfig> {
        self.active.read().await.clone()
    }

    /// Test a candidate configuration.
    ///
    /// A candidate submitted without a search password reuses the password of
    /// the active configuration, so an admin form never has to echo it back.
    pub async fn ping(&self, mut config: LdapConfig) -> PingResponse {
        if config.search_password.is_empty() {
            match self.active.read().await.as_ref() {
                Some(active) if !active.search_password.is_empty() => {
                    debug!("Using search password of the active LDAP configuration");
                    config.search_password = active.search_password.clone();
                }
                _ => return PingResponse::failed(&Error::EmptySearchPassword),
            }
        }

        let result = self.client.ping(&config).await;
        PingResponse::from(&result)
    }
}
