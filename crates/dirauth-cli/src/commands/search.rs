//! search command - list users matching a name

use super::CommandContext;
use anyhow::{Context, Result};
use dirauth_core::User;

pub async fn execute(ctx: &CommandContext, username: &str) -> Result<()> {
    let users = ctx
        .client
        .search_user(&ctx.config.ldap, &ctx.config.group, username)
        .await
        .with_context(|| format!("search for {:?} failed", username))?;

    ctx.emit(&users, |users| format_users(users))
}

fn format_users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found".to_string();
    }

    let mut lines = Vec::new();
    for user in users {
        lines.push(user.dn.clone());
        lines.push(format!("  username: {}", user.username));
        lines.push(format!("  realname: {}", user.realname));
        lines.push(format!("  email:    {}", user.email));
        for group in &user.group_dn_list {
            lines.push(format!("  group:    {}", group));
        }
    }
    lines.push(format!("{} user(s)", users.len()));
    lines.join("\n")
}
