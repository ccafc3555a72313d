mod import;
mod queue;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use queue::QueueCommands;

#[derive(Debug, Parser)]
#[command(name = "campdb-cli")]
#[command(about = "CampDB command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run pending database migrations
    Migrate,
    /// Parse a campaign schedule workbook and print the validation report
    Import {
        /// Path to the .xlsx/.xls workbook
        #[arg(long)]
        file: std::path::PathBuf,
        /// Public id of the campaign whose roster rows are matched against
        #[arg(long)]
        campaign: Uuid,
        /// Insert the valid rows instead of only reporting
        #[arg(long)]
        commit: bool,
    },
    /// Inspect the background job queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = campdb_core::load_app_config()?;
    let pool_config = campdb_db::PoolConfig::from_app_config(&config);
    let pool = campdb_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Migrate => {
            let applied = campdb_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Import {
            file,
            campaign,
            commit,
        } => import::run_import(&pool, &file, campaign, commit).await?,
        Commands::Queue { command } => queue::run_queue(&pool, command).await?,
    }

    Ok(())
}
