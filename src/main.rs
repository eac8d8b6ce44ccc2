//! goblin-init command line.
//!
//! # Architecture Overview
//!
//! ```text
//!     mediagoblin.toml
//!          │
//!          ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │    config    │──▶│      db      │──▶│  templates   │
//!   │ load+validate│   │ models+check │   │ user/theme/  │
//!   └──────────────┘   └──────────────┘   │   builtin    │
//!                                         └──────┬───────┘
//!   ┌──────────────┐   ┌──────────────┐   ┌──────▼───────┐
//!   │    cache     │◀──│  workbench   │◀──│ staticdirect │
//!   │ beaker.cache │   │   manager    │   │   storage    │
//!   └──────┬───────┘   └──────────────┘   └──────────────┘
//!          ▼
//!     AppContext (frozen, installed once)
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use goblin_init::config::read_config;
use goblin_init::context;
use goblin_init::db::{self, run_migrations, setup_connection_and_db_from_config};
use goblin_init::observability::logging::init_tracing;
use goblin_init::Error;

#[derive(Parser)]
#[command(name = "goblin-init")]
#[command(about = "Bootstrap and check a media-hosting deployment", long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = "mediagoblin.toml")]
    config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the config file and print every problem found
    Check,
    /// Apply pending database migrations
    Dbupdate,
    /// Run the full startup sequence
    Startup,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Check => {
            let (_, report) = read_config(&cli.config)?;
            if !report.is_empty() {
                return Err(Error::ImproperlyConfigured(report.to_string()).into());
            }
            println!("{}: OK", cli.config.display());
        }
        Commands::Dbupdate => {
            let app_config = goblin_init::config::load_config(&cli.config)?.app_config()?;
            let models = db::load_models(&app_config)?;
            let (_, database) = setup_connection_and_db_from_config(&app_config, models).await?;

            let applied = run_migrations(&database).await?;
            if applied.is_empty() {
                println!("Database is up to date");
            }
            for step in applied {
                match step.from {
                    Some(from) => println!("{}: migrated {} -> {}", step.set, from, step.to),
                    None => println!("{}: created at version {}", step.set, step.to),
                }
            }
        }
        Commands::Startup => {
            let ctx = context::install(goblin_init::bootstrap(&cli.config).await?)?;
            let app_config = ctx.app_config();
            tracing::info!(
                html_title = %app_config.html_title,
                db_uri = %app_config.db_uri,
                media_types = ?app_config.media_types,
                public_store = %ctx.public_store().class_name(),
                queue_store = %ctx.queue_store().class_name(),
                workbench = %ctx.workbench_manager().base_dir().display(),
                templates = %ctx.templates().search_path().join(", "),
                "Application context ready"
            );
        }
    }

    Ok(())
}
