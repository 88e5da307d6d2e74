//! `rusty-automation-tool` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server.
//! - `worker`   — start a queue worker.
//! - `migrate`  — run pending database migrations.
//! - `validate` — validate a workflow JSON file.

mod config;
mod worker;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use config::Config;
use queue::{Broker, RedisBroker};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "rusty-automation-tool",
    about = "High-performance workflow automation engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: String,
    },
    /// Start a background worker that processes queued messages.
    Worker,
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => {
            let config = Config::load();
            info!("Starting API server on {bind}");

            let pool = db::pool::create_pool(&config.database_url, config.database_max_connections)
                .await
                .expect("failed to connect to database");
            let store = Arc::new(db::PgStore::new(pool.clone()));
            let broker: Arc<dyn Broker> = Arc::new(
                RedisBroker::connect(&config.redis_url, config.retry_policy)
                    .await
                    .expect("failed to connect to redis"),
            );

            let state = api::AppState { pool, store, broker };
            api::serve(&bind, state).await.expect("server error");
        }
        Command::Worker => {
            let config = Config::load();
            info!("Starting background worker");

            let pool = db::pool::create_pool(&config.database_url, config.database_max_connections)
                .await
                .expect("failed to connect to database");
            let broker: Arc<dyn Broker> = Arc::new(
                RedisBroker::connect(&config.redis_url, config.retry_policy)
                    .await
                    .expect("failed to connect to redis"),
            );

            worker::run(config, pool, broker).await;
        }
        Command::Migrate { database_url } => {
            info!("Running migrations against {database_url}");
            let pool = db::pool::create_pool(&database_url, 2)
                .await
                .expect("failed to connect to database");
            db::pool::run_migrations(&pool)
                .await
                .expect("migration failed");
            info!("Migrations applied successfully");
        }
        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));

            let workflow: engine::Workflow = serde_json::from_str(&content)
                .unwrap_or_else(|e| panic!("invalid JSON: {e}"));

            match engine::build_plan(&workflow) {
                Ok(plan) => {
                    println!("workflow is valid. execution order: {:?}", plan.order);
                }
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
