//! group command - look up directory groups

use super::CommandContext;
use anyhow::{Context, Result};
use dirauth_core::Group;

pub async fn execute(ctx: &CommandContext, name: &str, by_dn: bool) -> Result<()> {
    let groups = if by_dn {
        vec![ctx
            .client
            .search_group_by_dn(&ctx.config.ldap, &ctx.config.group, name)
            .await
            .with_context(|| format!("group lookup for {:?} failed", name))?]
    } else {
        ctx.client
            .search_group_by_name(&ctx.config.ldap, &ctx.config.group, name)
            .await
            .with_context(|| format!("group search for {:?} failed", name))?
    };

    ctx.emit(&groups, |groups| format_groups(groups))
}

fn format_groups(groups: &[Group]) -> String {
    if groups.is_empty() {
        return "No groups found".to_string();
    }
    groups
        .iter()
        .map(|group| format!("{}\t{}", group.name, group.dn))
        .collect::<Vec<_>>()
        .join("\n")
}
