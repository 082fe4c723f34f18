//! ping command - test the configured connection and search identity

use super::CommandContext;
use anyhow::{bail, Result};
use dirauth_ldap::{LdapController, PingResponse};

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let controller = LdapController::new(ctx.client.clone());
    let resp = controller.ping(ctx.config.ldap.clone()).await;

    ctx.emit(&resp, |resp| format_ping(&ctx.config.ldap.url, resp))?;

    if !resp.success {
        bail!("connection test failed");
    }
    Ok(())
}

fn format_ping(url: &str, resp: &PingResponse) -> String {
    if resp.success {
        format!("{}: {}", url, resp.message)
    } else {
        format!(
            "{}: [{}] {}",
            url,
            resp.code.as_deref().unwrap_or("Error"),
            resp.message
        )
    }
}
