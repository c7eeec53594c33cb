use std::io::{self, Write};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, TaskverseError};
use crate::session::CallerContext;
use crate::store::Store;

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Bootstrap a workspace: config file, store, first user, organization and
/// project. Existing stores are reused, so init can also add a new user to
/// an existing workspace.
pub async fn run() -> Result<()> {
    let config_path = Config::config_path()?;

    if config_path.exists() {
        let answer = prompt(&format!(
            "Config file already exists at {}. Overwrite? [y/N] ",
            config_path.display()
        ))?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("TaskVerse CLI Configuration");
    println!("===========================\n");

    let name = prompt("Your name: ")?;
    let email = prompt("Your email: ")?;
    if name.is_empty() || email.is_empty() {
        return Err(TaskverseError::Validation(
            "a name and an email are required".into(),
        ));
    }

    let org_name = prompt("Organization name (e.g., Acme Inc): ")?;
    let org_slug = prompt("Organization slug (e.g., acme-inc): ")?;
    let project_name = prompt("First project name (e.g., Platform): ")?;
    let project_key = prompt("Project key (e.g., PLAT): ")?;

    let store_path = Store::default_path()?;
    let store = if store_path.exists() {
        Store::load(&store_path)?
    } else {
        Store::default()
    };

    let mut engine = Engine::new(store);
    let user = engine.register_user(&name, &email).await?;
    let caller = CallerContext::resolve(engine.store(), Some(&user.email))?;
    let organization = engine
        .create_organization(&caller, &org_name, &org_slug)
        .await?;
    let project = engine
        .create_project(&caller, &organization.id, &project_name, &project_key)
        .await?;

    let store = engine.into_store();
    store.save(&store_path)?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| TaskverseError::ConfigWrite {
            path: config_path.clone(),
            source: e,
        })?;
    }

    let config_content = format!(
        "user = \"{}\"\ndefault_org = \"{}\"\ndefault_project = \"{}\"\n",
        user.email, organization.slug, project.key
    );
    std::fs::write(&config_path, config_content).map_err(|e| TaskverseError::ConfigWrite {
        path: config_path.clone(),
        source: e,
    })?;

    println!("\nConfig saved to {}", config_path.display());
    println!("Store saved to {}", store_path.display());
    println!(
        "Created {} with project {} ({})",
        organization.name, project.name, project.key
    );
    println!("You can now use 'taskverse' commands!");

    Ok(())
}
