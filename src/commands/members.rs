use tabled::Tabled;

use crate::config::Config;
use crate::error::Result;
use crate::output::{self, format_date_only};
use crate::types::{Membership, Role};

use super::Workspace;

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Joined")]
    joined: String,
}

pub async fn list(ws: &Workspace, config: &Config, org: Option<&str>) -> Result<()> {
    let organization = ws.resolve_org(config, org)?;
    let memberships: Vec<Membership> = ws
        .store()
        .members_of(&organization.id)
        .into_iter()
        .cloned()
        .collect();

    output::print_table(&memberships, |m| {
        let user = ws.store().user(&m.user_id);
        MemberRow {
            name: user.map(|u| u.name.clone()).unwrap_or_default(),
            email: user.map(|u| u.email.clone()).unwrap_or_default(),
            role: m.role.to_string(),
            joined: format_date_only(&m.created_at.to_rfc3339()),
        }
    });
    Ok(())
}

pub async fn invite(
    ws: &mut Workspace,
    config: &Config,
    email: &str,
    role: Role,
    org: Option<&str>,
) -> Result<()> {
    let organization = ws.resolve_org(config, org)?;
    let membership = ws
        .engine
        .invite_member(&ws.caller, &organization.id, email, role)
        .await?;
    ws.save()?;

    output::print_item(&membership, |m| {
        println!(
            "Added {} to {} as {}",
            email, organization.name, m.role
        );
    });
    Ok(())
}

pub async fn role(
    ws: &mut Workspace,
    config: &Config,
    email: &str,
    role: Role,
    org: Option<&str>,
) -> Result<()> {
    let organization = ws.resolve_org(config, org)?;
    let membership = ws
        .engine
        .change_role(&ws.caller, &organization.id, email, role)
        .await?;
    ws.save()?;

    output::print_item(&membership, |m| {
        println!("{} is now {}", email, m.role);
    });
    Ok(())
}

pub async fn remove(
    ws: &mut Workspace,
    config: &Config,
    email: &str,
    org: Option<&str>,
) -> Result<()> {
    let organization = ws.resolve_org(config, org)?;
    ws.engine
        .remove_member(&ws.caller, &organization.id, email)
        .await?;
    ws.save()?;

    output::print_message(&format!("Removed {} from {}", email, organization.name));
    Ok(())
}
