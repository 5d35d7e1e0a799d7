//! Stowage CLI: upload or delete a file through the configured storage backend.
//!
//! Backend and thumbnail settings come from the environment (see `Config::from_env`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use stowage_cli::{content_hash, extension_of, guess_mime};
use stowage_core::{Config, FileRecord};
use stowage_infra::{init_telemetry, LogFormat};
use stowage_provider::StorageProvider;

#[derive(Parser)]
#[command(name = "stowage", about = "Store files and their thumbnails")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file, plus a thumbnail when its type is eligible
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
        /// Content hash; SHA-256 of the file when omitted
        #[arg(long)]
        hash: Option<String>,
    },
    /// Delete a stored file and its thumbnail
    Delete {
        #[arg(long)]
        hash: String,
        /// Extension including the dot, e.g. `.png`
        #[arg(long)]
        ext: String,
        #[arg(long)]
        mime: String,
    },
}

#[derive(Serialize)]
struct UploadReport {
    file: FileRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<FileRecord>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", s);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_telemetry(LogFormat::from_json_flag(config.json_logs()))
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let cli = Cli::parse();
    let provider = StorageProvider::from_config(&config)
        .await
        .context("Failed to initialize storage provider")?;

    match cli.command {
        Commands::Upload { file, mime, hash } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let ext = extension_of(&file);
            let mime = mime.unwrap_or_else(|| guess_mime(&ext).to_string());
            let hash = hash.unwrap_or_else(|| content_hash(&data));

            let mut record = FileRecord::new(hash, ext, mime, data);
            let outcome = provider.upload(&mut record).await?;

            tracing::info!(hash = %record.hash, url = ?record.url, "Upload complete");
            print_json(&UploadReport {
                file: record,
                thumbnail: outcome.thumbnail,
            })?;
        }
        Commands::Delete { hash, ext, mime } => {
            let record = FileRecord::new(hash, ext, mime, Vec::new());
            provider.delete(&record).await?;
            print_json(&serde_json::json!({ "deleted": record.hash }))?;
        }
    }

    Ok(())
}
