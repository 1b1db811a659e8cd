//! `bpidx` - command-line tool for building and inspecting B+Tree index
//! files produced by `bpindex-engine`.
//!
//! Useful for manual testing of the index outside of the (out-of-scope) SQL
//! front end: create a fresh index file, batch-insert keys from a CSV, look
//! up a single key, or dump a full ascending scan.

use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bpindex_engine::{FilePageFile, Index, LocateOutcome, OpenMode, RecordLocator, DEFAULT_PAGE_SIZE};

#[derive(Parser, Debug)]
#[command(name = "bpidx")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML config file overriding the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new, empty index file.
    Create {
        file: PathBuf,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Insert a single (key, page, slot) entry.
    Insert {
        file: PathBuf,
        key: i32,
        page: i16,
        slot: i16,
    },
    /// Batch-insert entries from a CSV of `key,page,slot` lines (or stdin
    /// with `-`).
    Load { file: PathBuf, csv: PathBuf },
    /// Look up a single key.
    Get { file: PathBuf, key: i32 },
    /// Dump a full ascending scan of the index.
    Scan { file: PathBuf },
}

/// Layered configuration: a TOML file supplies defaults, CLI flags
/// override them.
#[derive(Debug, Deserialize, Default)]
struct Config {
    page_size: Option<usize>,
    log_level: Option<String>,
}

impl Config {
    fn load(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading config file {}", p.display()))?;
                toml::from_str(&text).with_context(|| format!("parsing config file {}", p.display()))
            }
            None => Ok(Config::default()),
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => bail!("unrecognized log level: {other}"),
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn open_index(file: &PathBuf, page_size: usize, mode: OpenMode) -> Result<Index<FilePageFile>> {
    let pf = FilePageFile::open(file, mode, page_size)
        .with_context(|| format!("opening page file {}", file.display()))?;
    Ok(Index::open(pf)?)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_ref())?;

    let log_level = args
        .log_level
        .or(config.log_level)
        .unwrap_or_else(|| "info".to_string());
    init_logging(&log_level)?;

    let page_size = config.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    match args.command {
        Command::Create { file, page_size: override_size } => {
            let page_size = override_size.unwrap_or(page_size);
            let pf = FilePageFile::open(&file, OpenMode::Write, page_size)?;
            let index = Index::open(pf)?;
            index.close()?;
            info!(path = %file.display(), page_size, "created index file");
        }
        Command::Insert { file, key, page, slot } => {
            let mut index = open_index(&file, page_size, OpenMode::Write)?;
            index.insert(key, RecordLocator::new(page, slot))?;
            index.close()?;
            println!("inserted {key} -> ({page}, {slot})");
        }
        Command::Load { file, csv } => {
            let mut index = open_index(&file, page_size, OpenMode::Write)?;
            let reader: Box<dyn BufRead> = if csv.to_str() == Some("-") {
                Box::new(io::BufReader::new(io::stdin()))
            } else {
                Box::new(io::BufReader::new(
                    fs::File::open(&csv).with_context(|| format!("opening {}", csv.display()))?,
                ))
            };
            let mut count = 0usize;
            for line in reader.lines() {
                let line = line?;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let mut parts = line.split(',');
                let key: i32 = parts
                    .next()
                    .context("missing key field")?
                    .trim()
                    .parse()
                    .context("parsing key")?;
                let page: i16 = parts
                    .next()
                    .context("missing page field")?
                    .trim()
                    .parse()
                    .context("parsing page")?;
                let slot: i16 = parts
                    .next()
                    .context("missing slot field")?
                    .trim()
                    .parse()
                    .context("parsing slot")?;
                index.insert(key, RecordLocator::new(page, slot))?;
                count += 1;
            }
            index.close()?;
            println!("loaded {count} entries");
        }
        Command::Get { file, key } => {
            let mut index = open_index(&file, page_size, OpenMode::Read)?;
            match index.locate(key) {
                Ok(LocateOutcome::Found(mut cursor)) => {
                    let (k, rid) = index.read_forward(&mut cursor)?;
                    println!("{k} -> ({}, {})", rid.page, rid.slot);
                }
                Ok(LocateOutcome::NotFound(_)) | Err(bpindex_engine::IndexError::NoSuchRecord) => {
                    println!("key {key} not found");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Scan { file } => {
            let mut index = open_index(&file, page_size, OpenMode::Read)?;
            for entry in index.scan()? {
                let (key, rid) = entry?;
                println!("{key} -> ({}, {})", rid.page, rid.slot);
            }
        }
    }

    Ok(())
}
