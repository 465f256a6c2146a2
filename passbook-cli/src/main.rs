use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use passbook_ingest::{
    DialectRegistry, Segment, SourceLayout, period_from_file_name, segment_from_csv,
};
use passbook_ledger::{Assembly, DialectSelection, assemble};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod config;
mod render;
mod state;

use config::{Config, OutputFormat, config_path, init_config, load_config};

#[derive(Parser, Debug)]
#[command(
    name = "passbook",
    version,
    about = "Turn extracted bank-statement text into a reconciled ledger"
)]
struct Cli {
    /// Log level for passbook crates when RUST_LOG is not set
    #[arg(long, global = true, default_value_t = LevelFilter::WARN)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble one statement from its extracted text and/or tables
    Parse {
        /// Extracted statement text, pages separated by form feeds
        #[arg(long)]
        text: Option<PathBuf>,

        /// Extracted table as CSV, one file per page (repeatable, in page order)
        #[arg(long = "table")]
        tables: Vec<PathBuf>,

        /// Dialect id, or `auto` (default: [assemble] default_dialect)
        #[arg(long)]
        dialect: Option<String>,

        /// Print the assembly as JSON
        #[arg(long)]
        json: bool,

        /// Also write the transactions to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Fail when no transaction rows were found
        #[arg(long)]
        strict: bool,
    },

    /// Assemble several text statements concurrently
    Batch {
        /// Extracted statement text files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Dialect id, or `auto` (default: [assemble] default_dialect)
        #[arg(long)]
        dialect: Option<String>,

        /// Print the assemblies as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered dialects in selection order
    Dialects,

    /// Manage ~/.passbook/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.log_level);
    debug!("Log level set to {}", cli.log_level.to_string().to_lowercase());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Parse {
            text,
            tables,
            dialect,
            json,
            export,
            strict,
        } => {
            let cfg = load_config()?;
            let registry = cfg.registry()?;
            let selection = selection(&cfg, dialect.as_deref());
            let json = json || cfg.output.format == OutputFormat::Json;
            parse(
                &cfg, &registry, &selection, text, tables, json, export, strict,
            )?;
        }

        Command::Batch {
            files,
            dialect,
            json,
        } => {
            let cfg = load_config()?;
            let registry = Arc::new(cfg.registry()?);
            let selection = selection(&cfg, dialect.as_deref());
            let json = json || cfg.output.format == OutputFormat::Json;
            batch(&cfg, registry, selection, files, json).await?;
        }

        Command::Dialects => {
            let cfg = load_config()?;
            let registry = cfg.registry()?;
            for dialect in registry.iter() {
                let spec = dialect.spec();
                let source = match spec.source {
                    SourceLayout::Text { .. } => "text",
                    SourceLayout::Table { .. } => "table",
                };
                println!(
                    "{:<24} {:<6} {:<18} {}",
                    spec.id,
                    source,
                    spec.columns.name(),
                    spec.description
                );
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => init_config()?,
            ConfigCommand::Path => println!("{}", config_path()?.display()),
        },
    }
    Ok(())
}

fn selection(cfg: &Config, flag: Option<&str>) -> DialectSelection {
    match flag {
        Some(id) => id.parse().unwrap_or_default(),
        None => cfg.default_selection(),
    }
}

fn file_period(path: &Path) -> Option<(NaiveDate, NaiveDate)> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(period_from_file_name)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn read_table(path: &Path) -> Result<Segment> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    segment_from_csv(file).with_context(|| format!("parse {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
fn parse(
    cfg: &Config,
    registry: &DialectRegistry,
    selection: &DialectSelection,
    text: Option<PathBuf>,
    tables: Vec<PathBuf>,
    json: bool,
    export: Option<PathBuf>,
    strict: bool,
) -> Result<()> {
    if text.is_none() && tables.is_empty() {
        bail!("nothing to parse (pass --text <file> and/or --table <csv>)");
    }

    let raw_text = match &text {
        Some(p) => read_text(p)?,
        None => String::new(),
    };
    let segments = tables
        .iter()
        .map(|p| read_table(p))
        .collect::<Result<Vec<_>>>()?;

    let assembly = assemble(registry, &raw_text, &segments, selection)?;
    let period_hint = text.iter().chain(tables.iter()).find_map(|p| file_period(p));
    print_assembly(cfg, &assembly, period_hint, json)?;

    if let Some(path) = export {
        let file = fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
        render::export_csv(file, &assembly.ledger)
            .with_context(|| format!("write {}", path.display()))?;
        eprintln!(
            "Wrote {} transactions to {}",
            assembly.ledger.transactions().len(),
            path.display()
        );
    }

    if strict && assembly.warnings.iter().any(|w| w.is_severe()) {
        bail!("no transaction rows found with dialect {}", assembly.dialect);
    }
    Ok(())
}

fn print_assembly(
    cfg: &Config,
    assembly: &Assembly,
    period_hint: Option<(NaiveDate, NaiveDate)>,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(assembly)?);
    } else {
        print!(
            "{}",
            render::render_text(assembly, &cfg.output.currency_symbol, period_hint)?
        );
    }
    Ok(())
}

async fn batch(
    cfg: &Config,
    registry: Arc<DialectRegistry>,
    selection: DialectSelection,
    files: Vec<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let registry = Arc::clone(&registry);
        let selection = selection.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let result = read_text(&path).and_then(|text| {
                assemble(&registry, &text, &[], &selection)
                    .with_context(|| format!("assemble {}", path.display()))
            });
            (path, result)
        }));
    }

    let total = handles.len();
    let mut failed = 0;
    let mut json_out = Vec::new();
    for handle in handles {
        let (path, result) = handle.await.context("batch worker panicked")?;
        match result {
            Ok(assembly) => {
                if json {
                    json_out.push(serde_json::json!({
                        "file": path.display().to_string(),
                        "assembly": assembly,
                    }));
                } else {
                    println!("== {} ==", path.display());
                    print_assembly(cfg, &assembly, file_period(&path), false)?;
                    println!();
                }
            }
            Err(e) => {
                failed += 1;
                warn!("{e:#}");
                if json {
                    json_out.push(serde_json::json!({
                        "file": path.display().to_string(),
                        "error": format!("{e:#}"),
                    }));
                } else {
                    println!("== {} ==\nerror: {e:#}\n", path.display());
                }
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&json_out)?);
    }
    if failed > 0 {
        bail!("{failed} of {total} files failed");
    }
    Ok(())
}

/// Initializes the tracing subscriber.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => {
            // Only the passbook crates log at the chosen level.
            EnvFilter::new(
                [
                    env!("CARGO_CRATE_NAME"),
                    "passbook_core",
                    "passbook_ingest",
                    "passbook_ledger",
                ]
                .iter()
                .map(|krate| format!("{krate}={level}"))
                .collect::<Vec<_>>()
                .join(","),
            )
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
