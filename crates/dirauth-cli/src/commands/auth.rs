//! auth command - verify a user's credential

use super::CommandContext;
use anyhow::{Context, Result};
use dirauth_core::User;
use dirauth_ldap::LdapAuthProvider;
use serde::Serialize;

#[derive(Serialize)]
struct AuthResult<'a> {
    user: &'a User,
    is_admin: bool,
}

pub async fn execute(ctx: &CommandContext, username: &str, password: &str) -> Result<()> {
    let provider = LdapAuthProvider::new(
        ctx.client.clone(),
        ctx.config.ldap.clone(),
        ctx.config.group.clone(),
    );

    let user = provider
        .authenticate(username, password)
        .await
        .with_context(|| format!("authentication failed for {:?}", username))?;
    let is_admin = provider.is_group_admin(&user);

    ctx.emit(
        &AuthResult {
            user: &user,
            is_admin,
        },
        format_auth,
    )
}

fn format_auth(result: &AuthResult<'_>) -> String {
    let user = result.user;
    let mut lines = vec![format!("Authenticated {} as {}", user.username, user.dn)];
    if !user.realname.is_empty() {
        lines.push(format!("  realname: {}", user.realname));
    }
    if !user.email.is_empty() {
        lines.push(format!("  email:    {}", user.email));
    }
    if result.is_admin {
        lines.push("  member of admin group".to_string());
    }
    lines.join("\n")
}
