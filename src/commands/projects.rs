use tabled::Tabled;

use crate::config::Config;
use crate::error::Result;
use crate::output::{self, format_date_only};
use crate::types::Project;

use super::Workspace;

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Lead")]
    lead: String,
    #[tabled(rename = "Issues")]
    issues: usize,
    #[tabled(rename = "Created")]
    created: String,
}

pub async fn list(ws: &Workspace, config: &Config, org: Option<&str>) -> Result<()> {
    let organization = ws.resolve_org(config, org)?;
    let projects: Vec<Project> = ws
        .store()
        .projects
        .iter()
        .filter(|p| p.organization_id == organization.id)
        .cloned()
        .collect();

    output::print_table(&projects, |project| ProjectRow {
        key: project.key.clone(),
        name: project.name.clone(),
        lead: project
            .lead_id
            .as_deref()
            .map(|id| ws.actor_name(id))
            .unwrap_or_default(),
        issues: ws.store().issues_for_project(&project.id).len(),
        created: format_date_only(&project.created_at.to_rfc3339()),
    });
    Ok(())
}

pub async fn create(
    ws: &mut Workspace,
    config: &Config,
    name: &str,
    key: &str,
    org: Option<&str>,
) -> Result<()> {
    let organization = ws.resolve_org(config, org)?;
    let project = ws
        .engine
        .create_project(&ws.caller, &organization.id, name, key)
        .await?;
    ws.save()?;

    output::print_item(&project, |project| {
        println!("Created project {} ({})", project.name, project.key);
    });
    Ok(())
}
