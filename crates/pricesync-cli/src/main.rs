mod discover;
mod offers;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use discover::DiscoverCommands;
use offers::OffersCommands;

#[derive(Debug, Parser)]
#[command(name = "pricesync-cli")]
#[command(about = "Supplier product and offer discovery")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Crawl supplier sites and manage the review queue
    Discover {
        #[command(subcommand)]
        command: DiscoverCommands,
    },
    /// Promotional offers found on supplier sites
    Offers {
        #[command(subcommand)]
        command: OffersCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Verify the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config =
        pricesync_core::load_app_config_from_env().context("failed to load configuration")?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("pricesync-cli: no command given; run with --help for usage");
        return Ok(());
    };

    // A dry run never touches the database.
    if let Commands::Discover {
        command: DiscoverCommands::Run {
            site,
            dry_run: true,
        },
    } = &command
    {
        return discover::run_discover_dry(&config, site.as_deref()).await;
    }

    let pool = pricesync_db::connect_pool(
        &config.database_url,
        pricesync_db::PoolConfig::from_app_config(&config),
    )
    .await
    .context("failed to connect to database")?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                pricesync_db::health_check(&pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                let applied = pricesync_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
        },
        Commands::Discover { command } => discover::dispatch(&pool, &config, command).await?,
        Commands::Offers { command } => match command {
            OffersCommands::List { limit } => offers::run_offers_list(&pool, limit).await?,
        },
    }

    Ok(())
}
