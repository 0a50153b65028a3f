use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use wcon_canon::data::export;
use wcon_canon::data::filter::{select, TableSelection};
use wcon_canon::model::{Attribute, SubjectId};
use wcon_canon::{load_file, LoadOptions, Loaded};

#[derive(Parser)]
#[command(name = "wcon-canon")]
#[command(about = "Load WCON worm-tracking files into a canonical table", version)]
struct Cli {
    /// Path to a JSON file with load options
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Load only the named file, ignoring `files` chunk links
    #[arg(long, global = true)]
    no_chunks: bool,

    /// Fail when the "tracker-commons" marker is missing
    #[arg(long, global = true)]
    require_marker: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a WCON file: subjects, rows, columns, units
    Inspect {
        input: PathBuf,
        /// Also print the table
        #[arg(long)]
        table: bool,
    },

    /// Write the canonical WCON form of a file
    Canon {
        input: PathBuf,
        /// Output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the canonical table
    Export {
        input: PathBuf,
        output: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Keep only these subject ids
        #[arg(long = "id")]
        ids: Vec<String>,
        /// Keep only these keys (x, y, ox, oy, head, ventral)
        #[arg(long = "key")]
        keys: Vec<String>,
        /// Earliest timestamp to keep
        #[arg(long)]
        from: Option<f64>,
        /// Latest timestamp to keep
        #[arg(long)]
        to: Option<f64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Parquet,
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    if let Err(e) = run(cli) {
        log::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut options = match &cli.config {
        Some(path) => LoadOptions::from_json_file(path)?,
        None => LoadOptions::default(),
    };
    if cli.no_chunks {
        options.load_prev_chunks = false;
        options.load_next_chunks = false;
    }
    if cli.require_marker {
        options.require_marker = true;
    }

    match cli.command {
        Commands::Inspect { input, table } => {
            let loaded = load(&input, &options)?;
            print_summary(&loaded);
            if let (true, Some(t)) = (table, loaded.worm.table()) {
                println!("{}", export::pretty(t)?);
            }
        }
        Commands::Canon { input, output } => {
            let loaded = load(&input, &options)?;
            let text = loaded.worm.to_canonical_string()?;
            match output {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{text}"),
            }
        }
        Commands::Export {
            input,
            output,
            format,
            ids,
            keys,
            from,
            to,
        } => {
            let loaded = load(&input, &options)?;
            let Some(table) = loaded.worm.table() else {
                bail!("{} holds no time-series data to export", input.display());
            };
            let selection = TableSelection {
                ids: ids.iter().map(String::as_str).map(parse_id).collect(),
                keys: keys
                    .iter()
                    .map(|k| Attribute::from_key(k).with_context(|| format!("unknown key {k:?}")))
                    .collect::<Result<BTreeSet<_>>>()?,
                time_range: match (from, to) {
                    (None, None) => None,
                    (lo, hi) => Some((
                        lo.unwrap_or(f64::NEG_INFINITY),
                        hi.unwrap_or(f64::INFINITY),
                    )),
                },
            };
            let selected = select(table, &selection);
            match format {
                Format::Csv => export::write_csv(&selected, &output)?,
                Format::Parquet => export::write_parquet(&selected, &output)?,
            }
            log::info!(
                "Exported {} row(s) x {} column(s) to {}",
                selected.num_rows(),
                selected.num_columns(),
                output.display()
            );
        }
    }
    Ok(())
}

fn load(input: &Path, options: &LoadOptions) -> Result<Loaded> {
    let loaded =
        load_file(input, options).with_context(|| format!("loading {}", input.display()))?;
    for diagnostic in &loaded.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    Ok(loaded)
}

/// Ids given on the command line: numbers when they parse, text otherwise.
fn parse_id(s: &str) -> SubjectId {
    match s.parse::<f64>() {
        Ok(n) => SubjectId::Number(n),
        Err(_) => SubjectId::Text(s.to_string()),
    }
}

fn print_summary(loaded: &Loaded) {
    let worm = &loaded.worm;
    match worm.table() {
        Some(table) => {
            let ids: Vec<String> = table.ids().iter().map(|id| id.to_string()).collect();
            println!("subjects: {}", ids.join(", "));
            println!("rows:     {}", table.num_rows());
            println!("columns:  {}", table.num_columns());
            println!("present:  {}", table.present_count());
            if let (Some(first), Some(last)) = (table.rows().first(), table.rows().last()) {
                println!("time:     {first} .. {last}");
            }
        }
        None => println!("no time-series data"),
    }
    let units: Vec<String> = worm.units().iter().map(|(k, u)| format!("{k}={u}")).collect();
    println!("units:    {}", units.join(", "));
    println!("metadata: {}", if worm.metadata().is_some() { "yes" } else { "no" });
    if !worm.special_root().is_empty() {
        let keys: Vec<&str> = worm.special_root().keys().map(String::as_str).collect();
        println!("extra:    {}", keys.join(", "));
    }
}
