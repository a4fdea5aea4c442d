//! scribe-kit: schema tool for the Scribe database.
//!
//! Prints the declared schema, writes it out as a migration file, or applies
//! it to the database named by `TURSO_DATABASE_URL`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use scribe_db::config::{Config, Credentials, Target};
use scribe_db::remote::RemoteClient;
use scribe_db::{Database, migrations, schema};

#[derive(Parser)]
#[command(name = "scribe-kit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration descriptor
    #[arg(short, long, env = "SCRIBE_CONFIG", default_value = "scribe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the schema DDL to stdout
    Print,
    /// Write the schema as a migration file into the output directory
    Generate,
    /// Apply the schema to the configured database
    Push,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scribe=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Print => println!("{}", schema::render(schema::SCHEMA)),
        Commands::Generate => {
            let path = migrations::generate(&config.out, &config.schema)?;
            println!("{}", path.display());
        }
        Commands::Push => {
            let credentials = Credentials::from_env()?;
            push(&credentials).await?;
        }
    }

    Ok(())
}

async fn push(credentials: &Credentials) -> Result<()> {
    match credentials.target()? {
        Target::Memory => {
            // Nothing outlives the process; still proves the schema applies.
            Database::open_in_memory()?;
            info!("Schema applied to in-memory database");
        }
        Target::File(path) => push_file(&path)?,
        Target::Remote(_) => {
            let client = RemoteClient::new(credentials)?;
            client
                .execute_batch(&migrations::statements())
                .await
                .with_context(|| format!("pushing schema to {}", client.endpoint()))?;
            info!("Schema pushed to {}", client.endpoint());
        }
    }
    Ok(())
}

fn push_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Database::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(())
}
