mod activity;
mod aggregator;
mod error;
mod expander;
mod formatter;
mod parser;
mod report;
mod session;
mod stats;
mod tokenizer;

use clap::Parser;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the slow query log file(s)
    #[arg(long = "files", num_args = 1..)]
    files: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Output file path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of queries listed per file in the report
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// How the "# Query_time:" line is read
    #[arg(long, value_enum, default_value_t = parser::StatsLayout::Labeled)]
    stats_layout: parser::StatsLayout,

    /// List statements as logged, without keyword formatting
    #[arg(long)]
    no_format_sql: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Table,
    Html,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("rs_slowquery_timeline={level}").parse().unwrap_or_else(|_| LevelFilter::from_level(level).into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut session = session::Session::new(args.stats_layout);

    if args.files.is_empty() {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        session.ingest("<stdin>", &text);
    } else {
        for path in &args.files {
            match std::fs::read(path) {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    session.ingest(&path.display().to_string(), &text);
                }
                Err(e) => {
                    tracing::warn!("Could not read file {:?}: {}", path, e);
                }
            }
        }
    }

    report::print_report(&session, args.format, args.output.as_ref(), args.limit, !args.no_format_sql)?;

    Ok(())
}
