//! CLI subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tracing::{info, warn};

use crate::{Cli, Commands, ConfigAction, EvaluateArgs, ScoutArgs};
use techscout_core::config::OrganizationContext;
use techscout_core::persistence::SCOUTING_RESULTS_FILE;
use techscout_core::providers::create_provider;
use techscout_core::{
    Brain, DiscoveryEngine, EvaluationEngine, OutputDir, RetryPolicy, ScoutConfig,
    ScoutingRequest, ScoutingResult, Technology,
};

/// Handle a CLI subcommand.
pub async fn handle_command(
    cli: Cli,
    workspace: &Path,
    overrides: &[(String, Value)],
) -> anyhow::Result<()> {
    let quiet = cli.quiet;
    let config = load(workspace, cli.config.as_deref(), overrides)?;

    match cli.command {
        Commands::Config { action } => handle_config(action, workspace, &config),
        Commands::Queries(_) => handle_queries(&config, workspace).await,
        Commands::Scout(args) => handle_scout(args, &config, workspace, quiet).await,
        Commands::Evaluate(args) => handle_evaluate(args, &config, workspace).await,
    }
}

fn load(
    workspace: &Path,
    config_file: Option<&Path>,
    overrides: &[(String, Value)],
) -> anyhow::Result<ScoutConfig> {
    techscout_core::load_config(Some(workspace), config_file, overrides)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
}

/// Output directory from config; relative paths are taken from the workspace.
fn output_dir(config: &ScoutConfig, workspace: &Path) -> OutputDir {
    if config.output_dir.is_absolute() {
        OutputDir::new(&config.output_dir)
    } else {
        OutputDir::new(workspace.join(&config.output_dir))
    }
}

fn build_brain(config: &ScoutConfig) -> anyhow::Result<Arc<Brain>> {
    let provider = create_provider(&config.llm)
        .map_err(|e| anyhow::anyhow!("Failed to initialize LLM provider: {}", e))?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "LLM client ready");
    Ok(Arc::new(
        Brain::new(provider)
            .with_retry(RetryPolicy::from(&config.llm.retry))
            .with_temperature(config.llm.temperature)
            .with_max_tokens(config.llm.max_tokens),
    ))
}

fn report_problems(config: &ScoutConfig) {
    for problem in config.validate() {
        warn!("{}", problem);
    }
}

/// Organization context from `organization_context.json` when present,
/// otherwise from configuration.
fn organization(config: &ScoutConfig, output: &OutputDir) -> OrganizationContext {
    match output.load_organization_context() {
        Ok(Some(context)) => {
            info!("Using organization context from output directory");
            context
        }
        Ok(None) => config.evaluation.organization.clone(),
        Err(e) => {
            warn!(error = %e, "Could not read organization context, using configuration");
            config.evaluation.organization.clone()
        }
    }
}

fn evaluation_engine(
    brain: Arc<Brain>,
    config: &ScoutConfig,
    output: &OutputDir,
) -> EvaluationEngine {
    EvaluationEngine::new(brain)
        .with_organization(organization(config, output))
        .with_criteria(config.evaluation.criteria.clone())
        .with_output_dir(output.clone())
}

fn handle_config(action: ConfigAction, workspace: &Path, config: &ScoutConfig) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace.join("techscout.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            let toml_str = toml::to_string_pretty(&ScoutConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&redacted(config))?;
            println!("{}", toml_str);
            for problem in config.validate() {
                println!("# warning: {}", problem);
            }
            Ok(())
        }
    }
}

/// Copy of `config` with every secret replaced by a marker.
fn redacted(config: &ScoutConfig) -> ScoutConfig {
    let mask = |key: &Option<String>| key.as_ref().map(|_| "********".to_string());
    let mut config = config.clone();
    config.llm.api_key = mask(&config.llm.api_key);
    config.sources.semantic_scholar_api_key = mask(&config.sources.semantic_scholar_api_key);
    config.sources.serpapi_key = mask(&config.sources.serpapi_key);
    config.sources.newsapi_key = mask(&config.sources.newsapi_key);
    config
}

async fn handle_queries(config: &ScoutConfig, workspace: &Path) -> anyhow::Result<()> {
    report_problems(config);
    let output = output_dir(config, workspace);
    let brain = build_brain(config)?;
    let aggregator = techscout_sources::build_aggregator(&config.sources)
        .map_err(|e| anyhow::anyhow!("Failed to set up sources: {}", e))?;

    let engine = DiscoveryEngine::new(brain, aggregator).with_output_dir(output.clone());
    let queries = engine
        .generate_queries(
            &config.scouting.domain,
            &config.effective_focus_areas(),
            config.scouting.num_generated_queries,
        )
        .await
        .context("Query generation failed")?;

    for (i, query) in queries.iter().enumerate() {
        println!("{:>2}. {}", i + 1, query);
    }
    println!("\nSaved to {}", output.root().display());
    Ok(())
}

async fn handle_scout(
    args: ScoutArgs,
    config: &ScoutConfig,
    workspace: &Path,
    quiet: bool,
) -> anyhow::Result<()> {
    report_problems(config);
    let output = output_dir(config, workspace);
    let brain = build_brain(config)?;
    let aggregator = techscout_sources::build_aggregator(&config.sources)
        .map_err(|e| anyhow::anyhow!("Failed to set up sources: {}", e))?;

    let mut request = ScoutingRequest::from_config(config);
    if request.existing_technologies.is_empty() {
        match output.load_existing_technologies() {
            Ok(existing) => request.existing_technologies = existing,
            Err(e) => warn!(error = %e, "Could not read existing technologies"),
        }
    }

    let mut engine = DiscoveryEngine::new(brain.clone(), aggregator)
        .with_caps(config.evidence)
        .with_output_dir(output.clone());
    if let Some(prompt) = &config.scouting.system_prompt {
        engine = engine.with_system_prompt(prompt.clone());
    }
    if !quiet {
        engine = engine.with_callback(Arc::new(crate::summary::ProgressReporter));
    }

    println!(
        "Scouting {} ({})",
        request.domain,
        request.focus_areas.join(", ")
    );
    let result = engine
        .run(&request)
        .await
        .context("Technology discovery failed")?;
    crate::summary::print_discovery(&result, output.root());

    if config.evaluation.skip || result.technologies.is_empty() {
        return Ok(());
    }

    let selected = select(&result, &[], args.evaluate_top);
    let evaluator = evaluation_engine(brain.clone(), config, &output);
    let batch = evaluator
        .batch_evaluate(&selected)
        .await
        .context("Technology evaluation failed")?;
    crate::summary::print_evaluations(&batch);
    crate::summary::print_usage(&brain);
    Ok(())
}

async fn handle_evaluate(
    args: EvaluateArgs,
    config: &ScoutConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    report_problems(config);
    let output = output_dir(config, workspace);
    let input: PathBuf = args
        .input
        .clone()
        .unwrap_or_else(|| output.path(SCOUTING_RESULTS_FILE));
    let result: ScoutingResult = techscout_core::persistence::load_json(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?
        .with_context(|| format!("No scouting result at {}", input.display()))?;

    let selected = select(&result, &args.technology, args.top);
    if selected.is_empty() {
        anyhow::bail!("No matching technologies in {}", input.display());
    }

    let brain = build_brain(config)?;
    let evaluator = evaluation_engine(brain.clone(), config, &output);
    let batch = evaluator
        .batch_evaluate(&selected)
        .await
        .context("Technology evaluation failed")?;
    crate::summary::print_evaluations(&batch);
    crate::summary::print_usage(&brain);
    Ok(())
}

/// Technologies to evaluate: those named (case-insensitive), or all of
/// them, optionally cut to the `top` most strategically relevant.
pub fn select(result: &ScoutingResult, names: &[String], top: Option<usize>) -> Vec<Technology> {
    let named: Vec<&Technology> = if names.is_empty() {
        result.technologies.iter().collect()
    } else {
        result
            .technologies
            .iter()
            .filter(|t| names.iter().any(|n| n.eq_ignore_ascii_case(&t.name)))
            .collect()
    };

    match top {
        Some(n) => result
            .top_technologies(result.technologies.len())
            .into_iter()
            .filter(|t| named.iter().any(|s| std::ptr::eq(*s, *t)))
            .take(n)
            .cloned()
            .collect(),
        None => named.into_iter().cloned().collect(),
    }
}
