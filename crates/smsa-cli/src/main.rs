mod pipeline;
mod query;

use clap::{Parser, Subcommand};
use smsa_core::{Platform, SentimentLabel};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "smsa")]
#[command(about = "Social media sentiment pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run collection cycles on the configured interval until interrupted
    Run,
    /// Run a single collection cycle and print its statistics
    Once {
        /// Score and print without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Show label counts and percentages for recent results
    Summary {
        #[arg(long)]
        platform: Option<Platform>,
        /// Look-back window in hours
        #[arg(long, default_value = "24")]
        hours: i64,
    },
    /// Show hourly label counts for recent results
    Trend {
        #[arg(long)]
        platform: Option<Platform>,
        /// Look-back window in hours
        #[arg(long, default_value = "168")]
        hours: i64,
    },
    /// List recently collected raw posts
    Recent {
        #[arg(long)]
        platform: Option<Platform>,
        /// Look-back window in hours
        #[arg(long, default_value = "24")]
        hours: i64,
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// List the most confident results for a label
    Top {
        #[arg(long)]
        label: SentimentLabel,
        #[arg(long)]
        platform: Option<Platform>,
        #[arg(long, default_value = "10")]
        limit: i64,
    },
    /// Delete posts and results older than the retention window
    Cleanup {
        /// Retention in days; defaults to SMSA_RETENTION_DAYS
        #[arg(long)]
        days: Option<u32>,
    },
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("smsa: no command given; see `smsa --help`");
        return Ok(());
    };

    let config = smsa_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Run => pipeline::run_scheduled(&config).await,
        Commands::Once { dry_run } => pipeline::run_single_cycle(&config, dry_run).await,
        Commands::Summary { platform, hours } => {
            let pool = connect(&config).await?;
            query::run_summary(&pool, platform, hours).await
        }
        Commands::Trend { platform, hours } => {
            let pool = connect(&config).await?;
            query::run_trend(&pool, platform, hours).await
        }
        Commands::Recent {
            platform,
            hours,
            limit,
        } => {
            let pool = connect(&config).await?;
            query::run_recent(&pool, platform, hours, limit).await
        }
        Commands::Top {
            label,
            platform,
            limit,
        } => {
            let pool = connect(&config).await?;
            query::run_top(&pool, label, platform, limit).await
        }
        Commands::Cleanup { days } => {
            let pool = connect(&config).await?;
            query::run_cleanup(&pool, days.unwrap_or(config.retention_days)).await
        }
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    smsa_db::ping(&pool).await?;
                    println!("database reachable");
                }
                DbCommands::Migrate => {
                    let applied = smsa_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
            Ok(())
        }
    }
}

async fn connect(config: &smsa_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = smsa_db::PoolConfig::from_app_config(config);
    let pool = smsa_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests;
