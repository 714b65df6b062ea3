//! artarchive command line entry point.
//!
//! Talks to the slide database directly. Logs go to stderr; command output is
//! JSON on stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use artarchive_core::{AppConfig, Cursor, SlideDb};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod ingest;

#[derive(Parser)]
#[command(name = "artarchive")]
#[command(about = "Archive of art slides found on the web", long_about = None)]
struct Cli {
    /// Slide database path; overrides ARTARCHIVE_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert or merge slides from JSON lines ("-" reads stdin)
    Ingest {
        input: String,
    },

    /// Print one slide by GUID hash
    Get {
        guid_hash: String,
    },

    /// Print a page of slides in write order
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Cursor printed by a previous list
        #[arg(long)]
        cursor: Option<String>,
    },

    /// Print the distinct source sites
    Sites,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let db = SlideDb::open(&config.db_path).await?;

    match cli.command {
        Commands::Ingest { input } => ingest::execute(db, config.pipeline_config(), &input).await?,
        Commands::Get { guid_hash } => {
            let slide = db
                .get_slide(&guid_hash)
                .await?
                .with_context(|| format!("no slide with guid_hash {guid_hash}"))?;
            println!("{}", serde_json::to_string_pretty(&slide)?);
        }
        Commands::List { limit, cursor } => {
            let cursor = cursor.map(|c| c.parse::<Cursor>()).transpose()?;
            let page = db.list_slides(cursor, limit).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Commands::Sites => {
            for site in db.list_sites().await? {
                println!("{}", serde_json::to_string(&site)?);
            }
        }
    }

    Ok(())
}
