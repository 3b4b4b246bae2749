use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "radar-portal")]
#[command(about = "Query the RADAR Management Portal through the directory cache")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to radar.toml if present)
    #[arg(short, long, global = true, env = "RADAR_CONFIG")]
    pub config: Option<String>,

    /// Log level (overrides logging.level from the configuration)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List subjects, optionally only those of one project
    Subjects {
        /// Only list subjects enrolled in this project
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Show a single subject
    Subject {
        /// Subject login
        login: String,
    },
    /// List projects
    Projects,
    /// Show a single project
    Project {
        /// Project name
        name: String,
    },
    /// List the source-type catalog
    SourceTypes,
    /// Show a single source type
    SourceType {
        producer: String,
        model: String,
        catalog_version: String,
    },
    /// Check that a subject is enrolled in a project
    Check {
        /// Project name
        project: String,
        /// Subject login
        login: String,
    },
    /// Fetch every list once and show cache statistics
    Stats,
}
