mod cli;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;
use radar_portal::config::loader;
use radar_portal::{ManagementPortalClient, observability};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env is fine
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    let cfg = loader::load_config(cli.config.as_deref())?;
    observability::init_tracing_with_level(cli.log_level.as_deref().unwrap_or(cfg.logging.level.as_str()));

    tracing::debug!(url = %cfg.portal.url, "Configuration loaded");
    let client = ManagementPortalClient::new(&cfg.portal)?;

    match &cli.command {
        Commands::Subjects { project } => {
            let subjects = match project {
                Some(name) => client.subjects_in_project(name).await?,
                None => {
                    let mut all: Vec<_> = client.subjects().await?.values().cloned().collect();
                    all.sort_by(|a, b| a.login.cmp(&b.login));
                    all
                }
            };
            output::print_subjects(&subjects, format)?;
        }
        Commands::Subject { login } => {
            output::print_json(&client.subject(login).await?)?;
        }
        Commands::Projects => {
            let mut projects: Vec<_> = client.projects().await?.values().cloned().collect();
            projects.sort_by(|a, b| a.project_name.cmp(&b.project_name));
            output::print_projects(&projects, format)?;
        }
        Commands::Project { name } => {
            output::print_json(&client.project(name).await?)?;
        }
        Commands::SourceTypes => {
            let mut types: Vec<_> = client.source_types().await?.values().cloned().collect();
            types.sort_by_key(|t| t.identifier());
            output::print_source_types(&types, format)?;
        }
        Commands::SourceType {
            producer,
            model,
            catalog_version,
        } => {
            let found = client.source_type(producer, model, catalog_version).await?;
            output::print_json(&found)?;
        }
        Commands::Check { project, login } => {
            client.check_subject_in_project(project, login).await?;
            output::print_success(&format!("Subject {login} is enrolled in {project}"));
        }
        Commands::Stats => {
            // Errors are reflected in the statistics
            let _ = client.subjects().await;
            let _ = client.projects().await;
            let _ = client.source_types().await;
            output::print_stats(&client.cache_stats(), format)?;
        }
    }

    Ok(())
}
