//! Command-line front end for flatdb.
//!
//! ```bash
//! # Create a table
//! flatdb --create People --columns Name:string,Age:int
//!
//! # Run a single query
//! flatdb -c "ADD [Foo Bar, 46] IN People"
//!
//! # Run a batch from a file, or from stdin
//! flatdb -f queries.txt
//! echo "GET WHERE Age IS 46 IN People" | flatdb
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flatdb::{ColumnHeader, Database, Envelope, Schema, StorageType, StoreConfig};

/// Query a directory of flat-file tables
#[derive(Parser, Debug)]
#[command(name = "flatdb", version, about)]
struct Args {
    /// Directory holding the table files
    #[arg(short = 'd', long, default_value = "./data", env = "FLATDB_DATA_DIR")]
    data_dir: PathBuf,

    /// Extension of table files
    #[arg(long, default_value = flatdb::config::DEFAULT_EXTENSION)]
    extension: String,

    /// Skip fsync after writes
    #[arg(long)]
    no_sync: bool,

    /// Create a table with this name before running any query
    #[arg(long, value_name = "TABLE", requires = "columns")]
    create: Option<String>,

    /// Columns of the created table, as name:type pairs (types: int, dec, str)
    #[arg(long, value_name = "COLUMNS", requires = "create")]
    columns: Option<String>,

    /// Run a query (or several separated by `;`) and exit
    #[arg(short = 'c', long, conflicts_with = "file")]
    command: Option<String>,

    /// Run the queries in a file and exit
    #[arg(short = 'f', long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Print the result wrapped in a response envelope
    #[arg(long)]
    envelope: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = StoreConfig::new(&args.data_dir)
        .with_extension(args.extension.as_str())
        .with_sync_writes(!args.no_sync);
    let mut db = Database::open(config)
        .with_context(|| format!("opening data directory {:?}", args.data_dir))?;

    if let (Some(name), Some(columns)) = (&args.create, &args.columns) {
        let schema = parse_columns(columns)?;
        db.create_table(name, schema)?;
        info!(table = %name, "table created");
        if args.command.is_none() && args.file.is_none() {
            return Ok(());
        }
    }

    let text = read_queries(&args)?;
    let result = db.execute(&text);

    if args.envelope {
        let response = Envelope::from(result);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let entries = result?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flatdb=warn")),
        1 => EnvFilter::new("flatdb=info"),
        _ => EnvFilter::new("flatdb=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn read_queries(args: &Args) -> Result<String> {
    if let Some(command) = &args.command {
        return Ok(command.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path).with_context(|| format!("reading {path:?}"));
    }
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("reading queries from stdin")?;
    Ok(text)
}

/// Parses `Name:string,Age:int` into a schema.
fn parse_columns(text: &str) -> Result<Schema> {
    let mut columns = vec![];
    for pair in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, ty) = pair
            .split_once(':')
            .ok_or_else(|| anyhow!("column {pair:?} is not name:type"))?;
        let storage_type: StorageType = ty.trim().parse().map_err(|e: String| anyhow!(e))?;
        columns.push(ColumnHeader::new(name.trim(), storage_type));
    }
    if columns.is_empty() {
        bail!("--columns needs at least one name:type pair");
    }
    Ok(Schema::new(columns))
}
