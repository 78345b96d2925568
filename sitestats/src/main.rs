use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use accesslog::{LogFormat, LogReader};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use ingest::{ScanOptions, ScanReport};
use stats_sqlite::Db;
use time::OffsetDateTime;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

const DEFAULT_DB_PATH: &str = "sitestats.sqlite";

#[derive(Debug, Parser)]
#[command(name = "sitestats", version, about = "Access-log ingestion and per-URL view statistics")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./sitestats.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Load new log statements and add new entries to the database
    Ingest {
        /// Input log file
        input: PathBuf,
        /// Path to the SQLite store
        #[arg(long, value_name = "FILE")]
        database_path: Option<PathBuf>,
        /// Input format
        #[arg(long, value_parser = ["json", "combined"])]
        format: Option<String>,
        /// Own domain, excluded from referrer tracking
        #[arg(long)]
        domain: Option<String>,
    },
    /// Load new log statements and show a summary
    Scan {
        /// Input log file
        input: PathBuf,
        /// Input format
        #[arg(long, value_parser = ["json", "combined"])]
        format: Option<String>,
        /// Set the date range to today-only
        #[arg(long, default_value_t = false)]
        today: bool,
        /// Hide 404 URLs
        #[arg(long, default_value_t = false)]
        hide_404: bool,
        /// Show only specific content types
        #[arg(long)]
        content_type: Option<String>,
        /// Show only the top n pages
        #[arg(long)]
        top: Option<usize>,
        /// Own domain, excluded from referrer tracking
        #[arg(long)]
        domain: Option<String>,
        /// Output file (overwrites)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Write the top pages as CSV when --out is provided
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
    /// Query the database
    Query {
        /// Metric to query
        #[arg(value_parser = ["top", "referrers"])]
        metric: String,
        /// Path to the SQLite store
        #[arg(long, value_name = "FILE")]
        database_path: Option<PathBuf>,
        /// Date to be queried (YYYY-MM-DD, default: today UTC)
        #[arg(long)]
        date: Option<String>,
        /// Show only the top n pages
        #[arg(long)]
        top: Option<usize>,
    },
}

fn main() {
    init_logging();
    if let Err(err) = run() {
        error!(error = %err, "execution failed");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref()).unwrap_or_default();
    match cli.command {
        Commands::Version => {
            println!("sitestats {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Ingest { input, database_path, format, domain } => {
            let section = cfg.ingest.clone().unwrap_or_default();
            let database_path = database_path
                .or(section.database_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
            let format = parse_format(format.or(section.format).as_deref())?;
            let domain = domain.or(section.domain).or(cfg.domain).unwrap_or_default();

            let fp = File::open(&input)?;
            let mut reader = LogReader::new(format, BufReader::new(fp));
            let mut db = Db::open_or_create(&database_path)?;

            // One unit of work: the watermark read, the aggregates, and the
            // new watermark all commit together or not at all.
            let tx = db.conn.transaction()?;
            let watermark = stats_sqlite::last_watermark(&tx)?;
            let (entries, next_watermark) = ingest::collect_new_entries(&mut reader, watermark)?;
            let deltas = ingest::fold(&entries, &domain, next_watermark);
            stats_sqlite::apply_deltas(&tx, &deltas)?;
            tx.commit()?;

            info!(count = entries.len(), watermark = next_watermark, "ingested new log lines");
            println!("Inserting {} new lines", entries.len());
        }
        Commands::Scan { input, format, today, hide_404, content_type, top, domain, out, csv } => {
            let section = cfg.scan.clone().unwrap_or_default();
            let format = parse_format(format.or(section.format).as_deref())?;
            let top = top.or(section.top).unwrap_or(10);
            let content_type = content_type.or(section.content_type);
            let domain = domain.or(section.domain).or(cfg.domain).unwrap_or_default();

            let fp = File::open(&input)?;
            let mut reader = LogReader::new(format, BufReader::new(fp));
            let opts = ScanOptions { today_only: today, content_type };
            let report = ingest::scan(&mut reader, &opts, &domain)?;

            if let Some(path) = out {
                if csv {
                    let mut wtr = csv::Writer::from_writer(File::create(&path)?);
                    wtr.write_record(["uri", "count"])?;
                    for v in report.top(top) {
                        wtr.write_record([v.uri, v.count.to_string()])?;
                    }
                    wtr.flush()?;
                } else {
                    let mut w = std::io::BufWriter::new(File::create(&path)?);
                    render_report(&mut w, &report, top, hide_404)?;
                }
            } else {
                let stdout = std::io::stdout();
                render_report(&mut stdout.lock(), &report, top, hide_404)?;
            }
        }
        Commands::Query { metric, database_path, date, top } => {
            let section = cfg.query.clone().unwrap_or_default();
            let database_path = database_path
                .or(section.database_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
            let top = top.or(section.top).unwrap_or(10);
            let date = match date {
                Some(d) => d,
                None => today_utc()?,
            };

            let db = Db::open_read_only(&database_path)?;
            match metric.as_str() {
                "top" => {
                    for page in db.top_pages(&date, top as i64)? {
                        println!("{:5} {}", page.count, page.url);
                    }
                }
                "referrers" => {
                    for edge in db.referrer_edges()? {
                        println!("{} <- {}", edge.target, edge.source);
                    }
                }
                other => return Err(anyhow!("unknown metric: {}", other)),
            }
        }
    }
    Ok(())
}

fn parse_format(name: Option<&str>) -> Result<LogFormat> {
    match name.unwrap_or("json") {
        "json" => Ok(LogFormat::Json),
        "combined" => Ok(LogFormat::Combined),
        other => Err(anyhow!("unknown log format: {}", other)),
    }
}

fn today_utc() -> Result<String> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Ok(OffsetDateTime::now_utc().format(format)?)
}

fn render_report(w: &mut impl Write, report: &ScanReport, top: usize, hide_404: bool) -> Result<()> {
    let fmt_time = |t: Option<OffsetDateTime>| match t {
        Some(t) => t.to_string(),
        None => "-".to_string(),
    };
    writeln!(
        w,
        "Date range: {} - {}\n",
        fmt_time(report.range_start),
        fmt_time(report.range_end)
    )?;

    writeln!(w, "Top posts:\n----------")?;
    for v in report.top(top) {
        writeln!(w, "{:5} {}", v.count, v.uri)?;
    }

    if !hide_404 {
        writeln!(w, "\n404 URLs:\n---------")?;
        for uri in report.not_found.keys() {
            writeln!(w, "{}", uri)?;
        }
    }

    writeln!(w, "\nReferrers:\n----------")?;
    for (uri, refs) in &report.referrers {
        writeln!(w, "\n {}", uri)?;
        for r in refs {
            writeln!(w, "    {}", r)?;
        }
    }
    Ok(())
}
