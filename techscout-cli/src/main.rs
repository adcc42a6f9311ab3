//! TechScout CLI - discover and evaluate emerging technologies.

mod commands;
mod summary;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "techscout", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Model to use (overrides config)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Directory for results (overrides config)
    #[arg(short, long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Workspace directory (looked up for techscout.toml)
    #[arg(short, long, default_value = ".", global = true)]
    pub workspace: PathBuf,

    /// Configuration file path (TOML, or JSON by extension)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover technologies, then evaluate them
    Scout(ScoutArgs),
    /// Evaluate technologies from a saved scouting result
    Evaluate(EvaluateArgs),
    /// Generate search queries only
    Queries(QueriesArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Default)]
pub struct ScoutArgs {
    /// Technology domain to scout
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Focus area (repeatable)
    #[arg(short, long = "focus")]
    pub focus: Vec<String>,

    /// Search query to use instead of generated ones (repeatable)
    #[arg(long = "query")]
    pub query: Vec<String>,

    /// Number of refinement rounds
    #[arg(short, long)]
    pub reflections: Option<u32>,

    /// Years of papers and patents to search
    #[arg(long)]
    pub year_lookback: Option<u32>,

    /// Reuse scouting_results.json from the output directory
    #[arg(long)]
    pub skip_collection: bool,

    /// Stop after discovery
    #[arg(long)]
    pub skip_evaluation: bool,

    /// Only evaluate the N most strategically relevant technologies
    #[arg(long)]
    pub evaluate_top: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct EvaluateArgs {
    /// Scouting result to read (default: <output_dir>/scouting_results.json)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Technology name to evaluate (repeatable, default: all)
    #[arg(short, long = "technology")]
    pub technology: Vec<String>,

    /// Only evaluate the N most strategically relevant technologies
    #[arg(long)]
    pub top: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct QueriesArgs {
    /// Technology domain
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Focus area (repeatable)
    #[arg(short, long = "focus")]
    pub focus: Vec<String>,

    /// Number of queries to ask for
    #[arg(short = 'n', long)]
    pub count: Option<usize>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a default techscout.toml into the workspace
    Init,
    /// Print the effective configuration
    Show,
}

/// Configuration overrides implied by the command line, as (dotted key, value).
pub fn build_overrides(cli: &Cli) -> Vec<(String, Value)> {
    let mut overrides = Vec::new();
    if let Some(model) = &cli.model {
        overrides.push(("llm.model".to_string(), Value::from(model.as_str())));
    }
    if let Some(dir) = &cli.output_dir {
        overrides.push((
            "output_dir".to_string(),
            Value::from(dir.to_string_lossy().into_owned()),
        ));
    }

    match &cli.command {
        Commands::Scout(args) => {
            push_domain(&mut overrides, &args.domain, &args.focus);
            if !args.query.is_empty() {
                overrides.push(("scouting.search_queries".to_string(), Value::from(args.query.clone())));
            }
            if let Some(n) = args.reflections {
                overrides.push(("scouting.num_reflections".to_string(), Value::from(n)));
            }
            if let Some(years) = args.year_lookback {
                overrides.push(("scouting.year_lookback".to_string(), Value::from(years)));
            }
            if args.skip_collection {
                overrides.push(("scouting.skip_collection".to_string(), Value::Bool(true)));
            }
            if args.skip_evaluation {
                overrides.push(("evaluation.skip".to_string(), Value::Bool(true)));
            }
        }
        Commands::Queries(args) => {
            push_domain(&mut overrides, &args.domain, &args.focus);
            if let Some(count) = args.count {
                overrides.push(("scouting.num_generated_queries".to_string(), Value::from(count)));
            }
        }
        Commands::Evaluate(_) | Commands::Config { .. } => {}
    }
    overrides
}

fn push_domain(overrides: &mut Vec<(String, Value)>, domain: &Option<String>, focus: &[String]) {
    if let Some(domain) = domain {
        overrides.push(("scouting.domain".to_string(), Value::from(domain.as_str())));
    }
    if !focus.is_empty() {
        overrides.push(("scouting.focus_areas".to_string(), Value::from(focus.to_vec())));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // Keep the appender guard alive so buffered lines are flushed on exit.
    let (file_layer, _guard) = match techscout_core::config::data_dir() {
        Some(dir) => {
            let log_dir = dir.join("logs");
            std::fs::create_dir_all(&log_dir)?;
            let appender = tracing_appender::rolling::daily(&log_dir, "techscout.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| cli.workspace.clone());
    let overrides = build_overrides(&cli);

    commands::handle_command(cli, &workspace, &overrides).await
}
