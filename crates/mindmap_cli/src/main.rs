//! Operator CLI over the document store.
//!
//! # Responsibility
//! - Inspect and delete stored documents from a shell.
//! - Print machine-readable JSON on stdout; diagnostics go to the log files.

use clap::{Parser, Subcommand};
use log::info;
use mindmap_core::{
    compute_file_hash, default_log_level, init_logging, restore_mind_map, DocumentStore,
    NodeStore, StoreConfig,
};
use serde::Serialize;
use serde_json::json;
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "mindmap")]
#[command(about = "Inspect the content-addressed mind-map document store", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Documents root (overrides MINDMAP_DOCUMENTS_DIR)
    #[arg(long, global = true)]
    documents_dir: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the content hash of a file
    Fingerprint {
        file: PathBuf,
    },
    /// List stored documents, newest first
    List,
    /// Print a stored mind map down to a depth
    Show {
        content_hash: String,
        #[arg(long, default_value_t = 1)]
        depth: u32,
    },
    /// Print the audit journal of a document, newest first
    Audit {
        content_hash: String,
    },
    /// Delete a stored document folder
    Delete {
        content_hash: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    if let Commands::Fingerprint { file } = &cli.command {
        let hash = compute_file_hash(file)?;
        return print_json(&json!({ "file": file, "content_hash": hash.as_str() }));
    }

    let mut config = StoreConfig::from_env()?;
    if let Some(documents_dir) = cli.documents_dir {
        config.documents_dir = documents_dir;
    }
    let store = DocumentStore::open(&config.documents_dir)?;

    match cli.command {
        Commands::Fingerprint { .. } => Ok(()),
        Commands::List => print_json(&store.list()?),
        Commands::Show {
            content_hash,
            depth,
        } => {
            let Some(mind_map) = store.load(&content_hash)? else {
                return Err(format!("no mind map stored for {content_hash}").into());
            };
            let nodes = NodeStore::new();
            let restored = restore_mind_map(&nodes, &mind_map)?;
            print_json(&json!({
                "content_hash": content_hash,
                "document_id": restored.document_id,
                "original_filename": mind_map.original_filename,
                "page_count": mind_map.page_count,
                "root_node_id": restored.root_id,
                "nodes": nodes.collect_to_depth(restored.document_id, depth),
            }))
        }
        Commands::Audit { content_hash } => print_json(&store.audit_log(&content_hash)?),
        Commands::Delete { content_hash } => {
            let deleted = store.delete(&content_hash)?;
            info!(
                "event=cli_delete module=cli status={} content_hash={}",
                if deleted { "ok" } else { "skip" },
                content_hash
            );
            print_json(&json!({ "content_hash": content_hash, "deleted": deleted }))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    let text = serde_json::to_string_pretty(value)?;
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}
