mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "catsync")]
#[command(about = "Reconcile the Printful catalog into Directus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print run statistics as JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a sync against the configured catalog and store
    Sync {
        /// Restrict the run to one phase
        #[arg(long, value_enum, default_value_t = Phase::All)]
        phase: Phase,
    },
    /// Delete duplicate categories, keeping the oldest row per printful id
    CleanupCategories,
    /// Verify connectivity to both upstreams without writing anything
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Phase {
    All,
    Categories,
    Products,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = catsync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(?config, "configuration loaded");

    let ctx = commands::Context::from_app_config(&config)?;
    match cli.command {
        Commands::Sync { phase } => commands::run_sync(&ctx, phase, cli.json).await,
        Commands::CleanupCategories => commands::run_cleanup(&ctx, cli.json).await,
        Commands::Check => commands::run_check(&ctx).await,
    }
}
