//! Accord contract matcher CLI
//!
//! Compares expected interactions from a contract with actual ones and reports every mismatch.
//!
//! Usage:
//!   accord-match request --expected expected.json --actual actual.json
//!   accord-match select --interactions contract.json --actual actual.json

use accord_matching::{
    interactions_from_json, match_interaction_with_config, match_message_with_config,
    match_request_with_config, match_response_with_config, HttpRequest, HttpResponse, LogFormat,
    MatchingConfig, Message, Mismatch, RequestMatch,
};
use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Accord contract matcher
#[derive(Parser, Debug)]
#[command(name = "accord-match")]
#[command(author, version, about = "Compare actual interactions against contract expectations")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Matching configuration file (YAML)
    #[arg(short, long, global = true, env = "ACCORD_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare an actual request with an expected request
    Request(PairArgs),
    /// Compare an actual response with an expected response
    Response(PairArgs),
    /// Compare an actual message with an expected message
    Message(PairArgs),
    /// Pick the interaction that best matches an actual request
    Select(SelectArgs),
}

#[derive(ClapArgs, Debug)]
struct PairArgs {
    /// Expected document (JSON or YAML)
    #[arg(short, long)]
    expected: PathBuf,

    /// Actual document (JSON or YAML)
    #[arg(short, long)]
    actual: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct SelectArgs {
    /// Interactions, as a list or as `{"interactions": [...]}` (JSON or YAML)
    #[arg(short, long)]
    interactions: PathBuf,

    /// Actual request (JSON or YAML)
    #[arg(short, long)]
    actual: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(matched) => std::process::exit(if matched { 0 } else { 1 }),
        Err(e) => {
            eprintln!("{RED}{BOLD}error:{RESET} {e:#}");
            std::process::exit(2);
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    let config = match &cli.config {
        Some(path) => MatchingConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MatchingConfig::default(),
    };
    init_logging(&config, cli.log_level.as_deref());

    match &cli.command {
        Command::Request(args) => {
            let expected = HttpRequest::from_json(&load_document(&args.expected)?)?;
            let actual = HttpRequest::from_json(&load_document(&args.actual)?)?;
            let result = match_request_with_config(&expected, &actual, &config)?;
            Ok(report_mismatches(cli.output, "request", &result.mismatches()))
        }
        Command::Response(args) => {
            let expected = HttpResponse::from_json(&load_document(&args.expected)?)?;
            let actual = HttpResponse::from_json(&load_document(&args.actual)?)?;
            let mismatches = match_response_with_config(&expected, &actual, &config)?;
            Ok(report_mismatches(cli.output, "response", &mismatches))
        }
        Command::Message(args) => {
            let expected = Message::from_json(&load_document(&args.expected)?)?;
            let actual = Message::from_json(&load_document(&args.actual)?)?;
            let mismatches = match_message_with_config(&expected, &actual, &config)?;
            Ok(report_mismatches(cli.output, "message", &mismatches))
        }
        Command::Select(args) => {
            let interactions = interactions_from_json(&load_document(&args.interactions)?)?;
            let actual = HttpRequest::from_json(&load_document(&args.actual)?)?;
            let verdict = match_interaction_with_config(&interactions, &actual, &config)?;
            Ok(report_selection(cli.output, &verdict))
        }
    }
}

/// RUST_LOG wins, then `--log-level`, then the configured level.
fn init_logging(config: &MatchingConfig, log_level: Option<&str>) {
    let level = log_level.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn load_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let is_yaml = path
        .extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml");
    if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
    }
}

fn report_mismatches(output: OutputFormat, subject: &str, mismatches: &[Mismatch]) -> bool {
    match output {
        OutputFormat::Json => {
            let report = json!({
                "subject": subject,
                "matched": mismatches.is_empty(),
                "mismatches": mismatches,
            });
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_else(|_| report.to_string()));
        }
        OutputFormat::Text => {
            if mismatches.is_empty() {
                println!("{GREEN}{BOLD}✓{RESET} {subject} matched");
            } else {
                println!(
                    "{RED}{BOLD}✗{RESET} {subject} did not match ({} mismatch(es))",
                    mismatches.len()
                );
                print_mismatches(mismatches);
            }
        }
    }
    mismatches.is_empty()
}

fn print_mismatches(mismatches: &[Mismatch]) {
    for (index, mismatch) in mismatches.iter().enumerate() {
        let location = match mismatch {
            Mismatch::Body(body) => format!(" {DIM}at{RESET} {CYAN}{}{RESET}", body.path),
            Mismatch::Query(query) => format!(" {DIM}at{RESET} {CYAN}{}{RESET}", query.path),
            Mismatch::Header(header) => format!(" {DIM}header{RESET} {CYAN}{}{RESET}", header.key),
            Mismatch::Metadata(metadata) => format!(" {DIM}metadata{RESET} {CYAN}{}{RESET}", metadata.key),
            _ => String::new(),
        };
        println!(
            "  {}. {YELLOW}{}{RESET}{location}\n     {}",
            index + 1,
            mismatch.kind(),
            mismatch.description()
        );
        if let Mismatch::Body(body) = mismatch {
            if let Some(diff) = &body.diff {
                for line in diff.lines() {
                    println!("     {DIM}{line}{RESET}");
                }
            }
        }
    }
}

fn report_selection(output: OutputFormat, verdict: &RequestMatch<'_>) -> bool {
    let (kind, selected) = match verdict {
        RequestMatch::Full(candidate) => ("full", Some(candidate)),
        RequestMatch::Partial(candidate) => ("partial", Some(candidate)),
        RequestMatch::NoMatch(_) => ("none", None),
    };

    match output {
        OutputFormat::Json => {
            let report = json!({
                "match": kind,
                "interaction": selected.map(|c| c.interaction.description.clone()),
                "score": selected.map(|c| c.score),
                "mismatches": selected.map(|c| c.result.mismatches()).unwrap_or_default(),
            });
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_else(|_| report.to_string()));
        }
        OutputFormat::Text => match verdict {
            RequestMatch::Full(candidate) => println!(
                "{GREEN}{BOLD}✓{RESET} Full match: {BOLD}{}{RESET} {DIM}(score {}){RESET}",
                candidate.interaction.description, candidate.score
            ),
            RequestMatch::Partial(candidate) => {
                println!(
                    "{YELLOW}{BOLD}~{RESET} Partial match: {BOLD}{}{RESET} {DIM}(score {}){RESET}",
                    candidate.interaction.description, candidate.score
                );
                print_mismatches(&candidate.result.mismatches());
            }
            RequestMatch::NoMatch(candidates) => {
                println!("{RED}{BOLD}✗{RESET} No interaction matched method and path");
                for candidate in candidates {
                    println!(
                        "  {DIM}-{RESET} {} {DIM}(score {}){RESET}",
                        candidate.interaction.description, candidate.score
                    );
                }
            }
        },
    }
    verdict.is_full()
}
