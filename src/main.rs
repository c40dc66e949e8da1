//! Jumplinks command-line front end.
//!
//! ```text
//! jumplinks [--config jumplinks.toml] resolve <PATH> [--referrer R] [--user-agent UA] [--diagnose]
//! jumplinks [--config jumplinks.toml] compile <SOURCE>
//! jumplinks [--config jumplinks.toml] hits
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use jumplinks::config::{load_config, JumplinksConfig};
use jumplinks::observability::logging;
use jumplinks::store::{HitLedger, NotFoundLog, RuleTable};
use jumplinks::wildcard::compiler::{compile, strip_sentinel};
use jumplinks::{IncomingRequest, Resolver};

#[derive(Parser)]
#[command(name = "jumplinks")]
#[command(about = "Resolve requests against a jumplinks redirect table", long_about = None)]
struct Cli {
    /// Configuration file. Defaults apply when it does not exist.
    #[arg(short, long, default_value = "jumplinks.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one request path
    Resolve {
        path: String,

        #[arg(long)]
        referrer: Option<String>,

        #[arg(long)]
        user_agent: Option<String>,

        /// Resolve without side effects and print the per-rule trace
        #[arg(long)]
        diagnose: bool,
    },
    /// Show every compilation stage of a source pattern
    Compile { source: String },
    /// Print the hit ledger
    Hits,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = read_config(&cli.config)?;
    logging::init(&config.observability.log_level);

    match cli.command {
        Commands::Resolve {
            path,
            referrer,
            user_agent,
            diagnose,
        } => {
            let mut request = IncomingRequest::new(path);
            request.referrer = referrer;
            request.user_agent = user_agent;
            resolve(&config, &request, diagnose).await?;
        }
        Commands::Compile { source } => {
            let pattern = compile(&source);
            let captures: Vec<_> = pattern
                .captures
                .iter()
                .map(|c| json!({ "name": c.name, "type": c.kind, "raw": c.raw }))
                .collect();
            print_json(&json!({
                "source": source,
                "escaped": strip_sentinel(&pattern.escaped),
                "expanded": strip_sentinel(&pattern.expanded),
                "expression": strip_sentinel(&pattern.expression),
                "captures": captures,
            }))?;
        }
        Commands::Hits => {
            let ledger = HitLedger::load_from_file(&config.storage.hits_path)?;
            let hits: Vec<_> = ledger
                .snapshot()
                .into_iter()
                .map(|(id, record)| json!({ "id": id, "hits": record.hits, "last_hit": record.last_hit }))
                .collect();
            print_json(&json!(hits))?;
        }
    }

    Ok(())
}

fn read_config(path: &Path) -> Result<JumplinksConfig, Box<dyn std::error::Error>> {
    if path.exists() {
        Ok(load_config(path)?)
    } else {
        Ok(JumplinksConfig::default())
    }
}

async fn resolve(
    config: &JumplinksConfig,
    request: &IncomingRequest,
    diagnose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = RuleTable::load(&config.storage.table_path)?;
    let pages = Arc::new(table.static_pages());

    let resolver = Resolver::from_config(config)?
        .with_pages(pages.clone())
        .with_selectors(pages)
        .with_hits(Arc::new(open_ledger(&config.storage.hits_path)))
        .with_misses(Arc::new(NotFoundLog::new(&config.storage.not_found_path)));

    tracing::debug!(
        table = %config.storage.table_path.display(),
        jumplinks = table.jumplinks.len(),
        diagnostic = diagnose || resolver.is_diagnostic(),
        "Resolver ready"
    );

    if diagnose {
        let diagnosis = resolver
            .diagnose(request, &table.jumplinks, &table.collections)
            .await;
        return print_json(&diagnosis);
    }

    let decision = resolver.resolve_from(&table, request).await?;
    print_json(&json!({ "status": decision.status_code(), "decision": decision }))
}

/// Open the hit ledger, starting an empty one when the file cannot be read.
/// Resolution never fails on bookkeeping.
fn open_ledger(path: &Path) -> HitLedger {
    HitLedger::load_from_file(path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Hit ledger unreadable, starting empty");
        HitLedger::new(Some(path.to_path_buf()))
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
