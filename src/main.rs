mod config;
mod error;
mod records;
mod store;
mod table;
mod time;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::StoreError;
use records::RouteNumber;
use store::RouteStore;
use time::TimeOfDay;

/// Keep a personal list of transit routes in a JSON file.
#[derive(Parser)]
#[command(name = "routes", version)]
struct Cli {
    /// TOML configuration file [default: ./config/routes.toml if present]
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a new route
    Add(AddArgs),
    /// Display all routes
    Display(FileArgs),
    /// Display routes departing after a given time
    Select(SelectArgs),
}

#[derive(Args)]
struct FileArgs {
    /// The data file name
    filename: PathBuf,
}

#[derive(Args)]
struct AddArgs {
    /// The data file name
    filename: PathBuf,
    /// The route's destination
    #[clap(short, long)]
    destination: String,
    /// The route's number
    #[clap(short, long)]
    number: Option<RouteNumber>,
    /// Departure time (HH:MM)
    #[clap(short, long)]
    time: String,
}

#[derive(Args)]
struct SelectArgs {
    /// The data file name
    filename: PathBuf,
    /// Show routes departing strictly after this time (HH:MM)
    #[clap(short, long)]
    time: String,
}

/// A command whose arguments have been checked, ready to apply to a store.
enum Operation {
    Add {
        destination: String,
        number: Option<RouteNumber>,
        time: TimeOfDay,
    },
    Display,
    Select {
        cutoff: TimeOfDay,
    },
}

impl Command {
    /// Splits off the data file and validates user-supplied times, so a bad time
    /// is reported before the file is touched.
    fn into_operation(self) -> Result<(PathBuf, Operation), StoreError> {
        Ok(match self {
            Command::Add(args) => (
                args.filename,
                Operation::Add {
                    destination: args.destination,
                    number: args.number,
                    time: parse_time_arg(&args.time)?,
                },
            ),
            Command::Display(args) => (args.filename, Operation::Display),
            Command::Select(args) => (
                args.filename,
                Operation::Select {
                    cutoff: parse_time_arg(&args.time)?,
                },
            ),
        })
    }
}

fn parse_time_arg(value: &str) -> Result<TimeOfDay, StoreError> {
    TimeOfDay::parse_hhmm(value).map_err(|e| StoreError::invalid_time(value, e))
}

/// What a handler did to the store it was given. A modified store is saved
/// before its confirmation message is printed.
enum Outcome {
    Unchanged,
    Modified {
        store: RouteStore,
        message: &'static str,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;
    run(cli.command, &config, &mut std::io::stdout().lock())
}

fn run<W: Write>(command: Command, config: &Config, out: &mut W) -> Result<()> {
    let (path, operation) = command.into_operation()?;
    let store = RouteStore::load(&path)?;

    let outcome = match operation {
        Operation::Add {
            destination,
            number,
            time,
        } => add(store, destination, number, time),
        Operation::Display => display(&store, config, out)?,
        Operation::Select { cutoff } => select(&store, cutoff, config, out)?,
    };

    if let Outcome::Modified { store, message } = outcome {
        store
            .save(&path, &config.store)
            .with_context(|| format!("changes were not saved to {}", path.display()))?;
        writeln!(out, "{message}")?;
    }
    Ok(())
}

fn add(
    store: RouteStore,
    destination: String,
    number: Option<RouteNumber>,
    time: TimeOfDay,
) -> Outcome {
    Outcome::Modified {
        store: store.append(destination, number, time),
        message: "Route added",
    }
}

fn display<W: Write>(store: &RouteStore, config: &Config, out: &mut W) -> Result<Outcome> {
    table::write_routes(out, store.routes(), &config.display.not_found_message)?;
    Ok(Outcome::Unchanged)
}

fn select<W: Write>(
    store: &RouteStore,
    cutoff: TimeOfDay,
    config: &Config,
    out: &mut W,
) -> Result<Outcome> {
    let selected = store.select(cutoff)?;
    table::write_routes(out, selected.routes(), &config.display.not_found_message)?;
    Ok(Outcome::Unchanged)
}
