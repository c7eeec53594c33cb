mod activity;
mod auth;
mod cli;
mod commands;
mod config;
mod engine;
mod error;
mod keys;
mod mentions;
mod output;
mod reconcile;
mod session;
mod store;
mod types;

use std::error::Error;
use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;

use cli::{BoardCommands, Cli, Commands, IssueCommands, MemberCommands, ProjectCommands};
use commands::Workspace;
use config::Config;
use error::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");

        // Show error chain if verbose flag was passed
        if std::env::args().any(|arg| arg == "--verbose" || arg == "-v") {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = Error::source(cause);
            }
        }

        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    output::set_json_output(cli.json);

    match cli.command {
        // Commands that don't need a workspace
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "taskverse", &mut io::stdout());
        }
        Commands::Init => {
            commands::init::run().await?;
        }
        command => {
            let config = Config::load()?;
            let mut ws = Workspace::open(&config, cli.as_user.as_deref())?;

            if cli.verbose && !cli.json {
                eprintln!("Acting as {} <{}>", ws.caller.name, ws.caller.email);
            }

            match command {
                Commands::Issues(args) => {
                    commands::issues::list(&ws, &config, args).await?;
                }
                Commands::Issue { action } => match action {
                    IssueCommands::List(args) => {
                        commands::issues::list(&ws, &config, args).await?;
                    }
                    IssueCommands::Show { key } => {
                        commands::issues::show(&ws, &key).await?;
                    }
                    IssueCommands::Create(args) => {
                        commands::issues::create(&mut ws, &config, args).await?;
                    }
                    IssueCommands::Update(args) => {
                        commands::issues::update(&mut ws, args).await?;
                    }
                    IssueCommands::Comment(args) => {
                        commands::issues::comment(&mut ws, &args.key, &args.body).await?;
                    }
                    IssueCommands::Activity { key } => {
                        commands::issues::activity(&ws, &key).await?;
                    }
                },
                Commands::Board(args) => match args.action {
                    Some(BoardCommands::Move { key, status }) => {
                        commands::board::move_issue(&mut ws, &config, &key, &status).await?;
                    }
                    None => {
                        commands::board::show(&ws, &config, args.project.as_deref()).await?;
                    }
                },
                Commands::Projects { org } => {
                    commands::projects::list(&ws, &config, org.as_deref()).await?;
                }
                Commands::Project { action } => match action {
                    ProjectCommands::Create { name, key, org } => {
                        commands::projects::create(&mut ws, &config, &name, &key, org.as_deref())
                            .await?;
                    }
                },
                Commands::Members { org } => {
                    commands::members::list(&ws, &config, org.as_deref()).await?;
                }
                Commands::Member { action } => match action {
                    MemberCommands::Invite { email, role, org } => {
                        commands::members::invite(
                            &mut ws,
                            &config,
                            &email,
                            role.into(),
                            org.as_deref(),
                        )
                        .await?;
                    }
                    MemberCommands::Role { email, role, org } => {
                        commands::members::role(
                            &mut ws,
                            &config,
                            &email,
                            role.into(),
                            org.as_deref(),
                        )
                        .await?;
                    }
                    MemberCommands::Remove { email, org } => {
                        commands::members::remove(&mut ws, &config, &email, org.as_deref()).await?;
                    }
                },
                Commands::Notifications { read, clear } => {
                    if read {
                        commands::notifications::mark_read(&mut ws).await?;
                    } else if clear {
                        commands::notifications::clear(&mut ws).await?;
                    } else {
                        commands::notifications::list(&ws).await?;
                    }
                }
                Commands::Completions { .. } | Commands::Init => {
                    // Already handled above
                }
            }
        }
    }

    Ok(())
}
