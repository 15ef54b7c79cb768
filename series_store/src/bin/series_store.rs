use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use series_store::config::{BackendConfig, load_config_path};
use series_store::import::{ImportFormat, SOURCE_KEY, import_metadata, read_path};
use series_store::{Store, StoreConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Versioned OHLCV series store CLI")]
struct Cli {
    /// Store config (TOML). Falls back to SERIES_STORE_CONFIG / SERIES_STORE_ROOT.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Merge bars from a CSV file into a symbol as a new version.
    Import(ImportArgs),
    /// Print a symbol's bars as CSV.
    Show {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        version: Option<u64>,
        #[arg(long, requires = "end")]
        start: Option<i64>,
        #[arg(long, requires = "start")]
        end: Option<i64>,
    },
    /// Print row count, time span and version bookkeeping as JSON.
    Info {
        #[arg(long)]
        symbol: String,
    },
    /// List addressable versions of a symbol as JSON.
    Versions {
        #[arg(long)]
        symbol: String,
    },
    /// List every stored symbol.
    List,
    /// Drop every version except the head.
    Prune {
        #[arg(long)]
        symbol: String,
    },
    /// Remove a symbol and its history.
    Delete {
        #[arg(long)]
        symbol: String,
    },
}

#[derive(Args)]
struct ImportArgs {
    #[arg(long)]
    symbol: String,
    /// CSV with header `timestamp,open,high,low,close,volume,adjusted_close`,
    /// or a JSON array of objects with those keys.
    #[arg(long, value_name = "FILE")]
    file: PathBuf,
    /// Input format; inferred from the file extension when omitted.
    #[arg(long, value_enum)]
    format: Option<FileFormat>,
    /// Keep earlier versions instead of pruning them.
    #[arg(long)]
    keep_history: bool,
    /// Value stored under the `source` metadata key.
    #[arg(long)]
    source: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FileFormat {
    Csv,
    Json,
}

impl From<FileFormat> for ImportFormat {
    fn from(f: FileFormat) -> Self {
        match f {
            FileFormat::Csv => ImportFormat::Csv,
            FileFormat::Json => ImportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_path(path)?,
        None => StoreConfig::from_env()?,
    };
    if config.backend == BackendConfig::Memory {
        tracing::warn!("using the in-memory backend; nothing will outlive this process");
    }
    let store = Store::open(&config).context("open store")?;

    match cli.cmd {
        Cmd::Import(args) => import(&store, args)?,
        Cmd::Show {
            symbol,
            version,
            start,
            end,
        } => {
            let item = match (start, end) {
                (Some(s), Some(e)) => store.read_range(&symbol, version, s, e)?,
                _ => store.read(&symbol, version)?,
            };
            tracing::info!(
                symbol = %symbol,
                version = item.version_number,
                rows = item.series.len(),
                source = item.metadata.get_text(SOURCE_KEY).unwrap_or("unknown"),
                "showing version"
            );
            let mut out = csv::Writer::from_writer(std::io::stdout().lock());
            for record in item.records() {
                out.serialize(record)?;
            }
            out.flush()?;
        }
        Cmd::Info { symbol } => {
            println!("{}", serde_json::to_string_pretty(&store.symbol_info(&symbol)?)?);
        }
        Cmd::Versions { symbol } => {
            println!("{}", serde_json::to_string_pretty(&store.list_versions(&symbol)?)?);
        }
        Cmd::List => {
            for symbol in store.list_symbols() {
                println!("{symbol}");
            }
        }
        Cmd::Prune { symbol } => {
            let dropped = store.prune_previous_versions(&symbol)?;
            println!("pruned {} version(s) of {symbol}", dropped.len());
        }
        Cmd::Delete { symbol } => {
            if !store.delete_symbol(&symbol)? {
                bail!("symbol not found: {symbol}");
            }
            println!("deleted {symbol}");
        }
    }

    store.close()?;
    Ok(())
}

fn import(store: &Store, args: ImportArgs) -> Result<()> {
    let records = read_path(&args.file, args.format.map(ImportFormat::from))
        .with_context(|| format!("read {}", args.file.display()))?;

    let source = args
        .source
        .unwrap_or_else(|| format!("file:{}", args.file.display()));
    let metadata = import_metadata(source, Utc::now());

    let version = store.write(&args.symbol, &records, metadata, !args.keep_history)?;
    println!(
        "{}: imported {} bar(s) as version {version}",
        args.symbol,
        records.len()
    );
    Ok(())
}
