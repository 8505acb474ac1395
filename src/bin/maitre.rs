//! maitre: cache and tool-routing CLI.
//!
//! Exercises the cache manager and semantic router from the shell:
//! match utterances against a tools file, embed text, load records, and
//! run disk cleanup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maitre::cli::{self, Config};

/// Maitre CLI
#[derive(Parser)]
#[command(name = "maitre")]
#[command(version = maitre::PKG_VERSION)]
#[command(about = "Cached lookups and semantic tool routing")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "MAITRE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match an utterance to a tool
    Match {
        /// User utterance
        utterance: String,
        /// Tools file (JSON array of tool definitions)
        #[arg(short, long)]
        tools: PathBuf,
        /// Caller role, part of the filtered-view key
        #[arg(short, long, default_value = "customer")]
        role: String,
        /// Agent allow-list (comma separated)
        #[arg(long, value_delimiter = ',')]
        allow: Vec<String>,
        /// Role permission list (comma separated)
        #[arg(long, value_delimiter = ',')]
        permissions: Option<Vec<String>>,
        /// Ask the completion model when similarity finds nothing
        #[arg(long)]
        suggest: bool,
    },

    /// Embed text and print the vector
    Embed {
        /// Text to embed
        text: String,
    },

    /// Load a records file through the cache
    Records {
        /// Logical file name, e.g. menu_items.json
        file: PathBuf,
        /// Candidate directories, tried in order
        #[arg(short, long = "dir", required = true)]
        dirs: Vec<PathBuf>,
    },

    /// Enforce the disk quota and print cache statistics
    Clean,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("maitre=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let (cache, router) = cli::build(&config, &Config::api_key()?)?;

    match args.command {
        Command::Match {
            utterance,
            tools,
            role,
            allow,
            permissions,
            suggest,
        } => {
            let allow: Vec<&str> = allow.iter().map(String::as_str).collect();
            let permissions: Option<Vec<&str>> = permissions
                .as_ref()
                .map(|p| p.iter().map(String::as_str).collect());
            let candidates = cache.filtered_tools(&tools, &role, &allow, permissions.as_deref());
            if candidates.is_empty() {
                return Err(format!("no tools available in {}", tools.display()).into());
            }
            let summary = router.rebuild(cache.tools(&tools)).await?;
            info!(?summary, "tools registered");

            let output = match router.match_utterance(&utterance, &candidates).await {
                Some(m) => json!({
                    "tool": m.tool.name,
                    "confidence": m.confidence,
                    "parameters": m.parameter_skeleton(),
                    "source": "similarity",
                }),
                None if suggest => match router.match_by_suggestion(&utterance, &candidates).await {
                    Some(name) => json!({ "tool": name, "source": "suggestion" }),
                    None => json!({ "tool": null }),
                },
                None => json!({ "tool": null }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Embed { text } => {
            let values = cache.embedding(&text).await;
            println!(
                "{}",
                serde_json::to_string(&json!({ "dimensions": values.len(), "values": values }))?
            );
        }

        Command::Records { file, dirs } => {
            let records = cache.records(&file, dirs.as_slice());
            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        Command::Clean => {
            let removed = cache.enforce_disk_quota();
            let stats = cache.stats();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "removed": removed,
                    "ram": {
                        "records": stats.records,
                        "tools": stats.tools,
                        "embeddings": stats.embeddings,
                        "filtered_views": stats.filtered_views,
                    },
                }))?
            );
        }
    }

    Ok(())
}
