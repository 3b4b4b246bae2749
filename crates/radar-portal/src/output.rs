use colored::Colorize;
use radar_cache::CacheStats;
use radar_portal::{Project, SourceType, Subject};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_subjects(subjects: &[Subject], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(subjects),
        OutputFormat::Table => {
            if subjects.is_empty() {
                println!("No subjects found.");
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["Login", "Project", "Status", "Sources"]);
            for s in subjects {
                builder.push_record([
                    s.login.clone(),
                    s.project_name().unwrap_or("-").to_string(),
                    s.status.clone().unwrap_or_else(|| "-".into()),
                    s.sources.len().to_string(),
                ]);
            }
            print_table(builder);
            Ok(())
        }
    }
}

pub fn print_projects(projects: &[Project], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(projects),
        OutputFormat::Table => {
            if projects.is_empty() {
                println!("No projects found.");
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["Project", "Name", "Organization", "Status"]);
            for p in projects {
                builder.push_record([
                    p.project_name.clone(),
                    p.human_readable_project_name.clone().unwrap_or_else(|| "-".into()),
                    p.organization.clone().unwrap_or_else(|| "-".into()),
                    p.project_status.clone().unwrap_or_else(|| "-".into()),
                ]);
            }
            print_table(builder);
            Ok(())
        }
    }
}

pub fn print_source_types(types: &[SourceType], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(types),
        OutputFormat::Table => {
            if types.is_empty() {
                println!("No source types found.");
                return Ok(());
            }
            let mut builder = Builder::default();
            builder.push_record(["Producer", "Model", "Version", "Scope", "Data"]);
            for t in types {
                builder.push_record([
                    t.producer.clone(),
                    t.model.clone(),
                    t.catalog_version.clone(),
                    t.source_type_scope.clone().unwrap_or_else(|| "-".into()),
                    t.source_data.len().to_string(),
                ]);
            }
            print_table(builder);
            Ok(())
        }
    }
}

pub fn print_stats(stats: &[CacheStats], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let value: Vec<_> = stats
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "entries": s.entries,
                        "version": s.version,
                        "attempts": s.attempts,
                        "consecutiveFailures": s.consecutive_failures,
                        "lastRefresh": s.last_refresh.map(|t| t.to_string()),
                        "lastFailure": s.last_failure.map(|t| t.to_string()),
                        "stale": s.stale,
                    })
                })
                .collect();
            print_json(&value)
        }
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["Cache", "Entries", "Version", "Failures", "Stale"]);
            for s in stats {
                builder.push_record([
                    s.name.clone(),
                    s.entries.to_string(),
                    s.version.to_string(),
                    s.consecutive_failures.to_string(),
                    s.stale.to_string(),
                ]);
            }
            print_table(builder);
            Ok(())
        }
    }
}

fn print_table(builder: Builder) {
    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}
