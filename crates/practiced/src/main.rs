//! Practice Daemon - subtraction practice HTTP service
//!
//! Serves registration, login, practice and inventory over a JSON API.

use anyhow::Result;
use clap::Parser;
use practice_common::PracticeConfig;
use practiced::server::{self, AppState};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "practiced")]
#[command(about = "Subtraction practice service", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/practice/config.toml, then /etc/practice/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8501
    #[arg(long)]
    bind: Option<String>,

    /// SQLite database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Reward catalog CSV with Title and URL columns
    #[arg(long)]
    catalog: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut PracticeConfig) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(db) = self.db {
            config.storage.db_path = Some(db);
        }
        if let Some(catalog) = self.catalog {
            config.rewards.catalog_path = Some(catalog);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let mut config = PracticeConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    info!("Practice Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let state = AppState::open(&config).await?;
    server::run(state, &config).await
}
