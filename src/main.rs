use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde_json::Value;
use tracing::info;

use n8n_cleaner::parser::clean_record_traced;
use n8n_cleaner::records::{decode_records, read_records, write_records};
use n8n_cleaner::{
    check_record, normalize_record, Check, NormalizeOptions, RandomIds, ScrapeInput, ScrapeResult,
    Settings, SystemClock,
};

#[derive(Parser)]
#[command(
    name = "n8n_cleaner",
    about = "Extract and normalize n8n workflow templates from scraped pages"
)]
struct Cli {
    /// Settings file (defaults to ./n8n_cleaner.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Indent the JSON written to stdout
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Raw scrape records -> details, description and demo payload
    Clean {
        /// JSON array or JSON Lines file (default: stdin)
        input: Option<PathBuf>,
    },
    /// Cleaned records carrying a demo -> n8n-compliant workflows
    Normalize {
        input: Option<PathBuf>,
    },
    /// Clean and normalize in one pass
    Run {
        input: Option<PathBuf>,
    },
    /// Report structural validity of each record's demo
    Check {
        input: Option<PathBuf>,
    },
}

fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    init_tracing(&settings.log_level);

    if let Some(threads) = settings.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let t0 = Instant::now();
    let opts = settings.normalize_options();
    let stdout = io::stdout().lock();

    match &cli.command {
        Commands::Clean { input } => {
            let inputs: Vec<ScrapeInput> = decode_records(load(input.as_deref())?)?;
            let (results, counts) = clean_batch(&inputs, settings.chunk_size)?;
            counts.log();
            write_records(stdout, &results, cli.pretty)?;
        }
        Commands::Normalize { input } => {
            let records = load(input.as_deref())?;
            let total = records.len();
            let out = normalize_batch(records, &opts, settings.chunk_size)?;
            info!(records = total, "normalized");
            write_records(stdout, &out, cli.pretty)?;
        }
        Commands::Run { input } => {
            let inputs: Vec<ScrapeInput> = decode_records(load(input.as_deref())?)?;
            let (results, counts) = clean_batch(&inputs, settings.chunk_size)?;
            counts.log();
            let records = results
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            let out = normalize_batch(records, &opts, settings.chunk_size)?;
            write_records(stdout, &out, cli.pretty)?;
        }
        Commands::Check { input } => {
            let records = load(input.as_deref())?;
            let checks: Vec<Check> = records.par_iter().map(check_record).collect();
            let valid = checks.iter().filter(|c| c.valid).count();
            info!(records = checks.len(), valid, "checked");
            write_records(stdout, &checks, cli.pretty)?;
        }
    }

    info!(elapsed = %format_duration(t0.elapsed()), "done");
    Ok(())
}

fn load(path: Option<&Path>) -> Result<Vec<Value>> {
    let records = match path {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("Failed to open {}", p.display()))?;
            read_records(BufReader::new(file))
        }
        None => read_records(io::stdin().lock()),
    };
    records.context("Failed to read input records")
}

#[derive(Default)]
struct CleanCounts {
    records: usize,
    by_strategy: BTreeMap<&'static str, usize>,
    unparsed_demos: usize,
}

impl CleanCounts {
    fn add(&mut self, result: &ScrapeResult, strategy: Option<&'static str>) {
        self.records += 1;
        if let Some(s) = strategy {
            *self.by_strategy.entry(s).or_default() += 1;
        }
        if result.has_demo == Some(true) {
            self.unparsed_demos += 1;
        }
    }

    fn log(&self) {
        let found: usize = self.by_strategy.values().sum();
        info!(
            records = self.records,
            demos = found,
            unparsed_demos = self.unparsed_demos,
            by_strategy = ?self.by_strategy,
            "cleaned"
        );
    }
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn clean_batch(inputs: &[ScrapeInput], chunk_size: usize) -> Result<(Vec<ScrapeResult>, CleanCounts)> {
    let pb = progress_bar(inputs.len())?;
    let mut counts = CleanCounts::default();
    let mut out = Vec::with_capacity(inputs.len());

    for chunk in inputs.chunks(chunk_size) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|item| clean_record_traced(item, &SystemClock))
            .collect();
        for (result, strategy) in results {
            counts.add(&result, strategy);
            out.push(result);
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok((out, counts))
}

fn normalize_batch(records: Vec<Value>, opts: &NormalizeOptions, chunk_size: usize) -> Result<Vec<Value>> {
    let pb = progress_bar(records.len())?;
    let mut out = Vec::with_capacity(records.len());
    let mut records = records.into_iter().peekable();

    while records.peek().is_some() {
        let chunk: Vec<Value> = records.by_ref().take(chunk_size).collect();
        let n = chunk.len();
        out.par_extend(
            chunk
                .into_par_iter()
                .map(|record| normalize_record(record, &RandomIds, opts)),
        );
        pb.inc(n as u64);
    }

    pb.finish_and_clear();
    Ok(out)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
