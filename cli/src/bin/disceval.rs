use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use disceval::{evaluate_files, load_parameters, Profile};
use either::Either;
use serde_jsonlines::write_json_lines;
use std::fs::File;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Scores discontinuous constituency trees in export format, bracket by bracket.
///
/// Without a parameter file or a profile, only the topmost node of each tree is excluded.
#[derive(Debug, Parser)]
#[command(name = "disceval", version, about)]
struct Args {
    /// Gold corpus
    #[arg(short, long)]
    key: PathBuf,

    /// Candidate corpus
    #[arg(short, long)]
    answer: PathBuf,

    /// EVALB parameter file
    #[arg(short, long, conflicts_with = "profile")]
    params: Option<PathBuf>,

    /// Built-in parameters (minimal, punctuation)
    #[arg(long)]
    profile: Option<Profile>,

    /// Output the report as JSON
    #[arg(long)]
    json: bool,

    /// Write the per-sentence scores to this file, as JSON lines
    #[arg(long)]
    sentences: Option<PathBuf>,

    /// Write the report to this file instead of the standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log more (-v: info, -vv: debug). RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let source = match (&args.params, args.profile) {
        (Some(path), _) => Some(Either::Left(path.as_path())),
        (None, Some(profile)) => Some(Either::Right(profile)),
        (None, None) => None,
    };
    let params = load_parameters(source)?;
    info!("parameters:\n{params}");

    let report = evaluate_files(&args.key, &args.answer, &params)?;

    if let Some(path) = &args.sentences {
        write_json_lines(path, &report.sentences)
            .with_context(|| format!("cannot write {}", path.display()))?;
    }

    let mut out: Either<File, Stdout> = match &args.output {
        Some(path) => Either::Left(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Either::Right(io::stdout()),
    };
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        write!(out, "{report}")?;
    }
    out.flush()?;
    Ok(())
}
