//! `spotted` -- command-line front end for the vehicle spotting collection.
//!
//! # Environment variables
//!
//! | Variable                 | Required        | Default | Description                      |
//! |--------------------------|-----------------|---------|----------------------------------|
//! | `SPOTTED_DATA_DIR`       | no              | `.spotted` | Snapshot directory            |
//! | `PLATE_RECOGNIZER_URL`   | no              | public endpoint | Plate-reader API URL     |
//! | `PLATE_RECOGNIZER_TOKEN` | for `spot` only | --      | Plate-reader API token           |
//! | `CARCHECK_BASE_URL`      | no              | public check page | Attribute lookup prefix |
//! | `REQUEST_TIMEOUT_SECS`   | no              | `30`    | HTTP timeout                     |

mod commands;
mod config;
mod output;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Cli;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotted=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    tracing::debug!(data_dir = %config.data_dir.display(), "Configuration loaded");

    commands::run(cli, config).await
}
