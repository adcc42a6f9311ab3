//! Terminal output for scouting runs.

use std::path::Path;

use techscout_core::discovery::{DiscoveryCallback, DiscoveryPhase};
use techscout_core::{Brain, EvaluationBatch, ScoutingResult};

/// Prints phase changes and refinement rounds to stderr.
pub struct ProgressReporter;

impl DiscoveryCallback for ProgressReporter {
    fn on_phase_change(&self, phase: DiscoveryPhase, progress: f64) {
        eprintln!("[{:>3.0}%] {}", progress * 100.0, phase);
    }

    fn on_refinement(&self, round: u32, total: u32, technologies: usize, replaced: bool) {
        let note = if replaced { "" } else { " (kept previous set)" };
        eprintln!("  round {}/{}: {} technologies{}", round, total, technologies, note);
    }
}

pub fn print_discovery(result: &ScoutingResult, output: &Path) {
    println!("\n{}", "=".repeat(60));
    println!("SCOUTING COMPLETE");
    println!("{}", "=".repeat(60));
    println!("Results saved to: {}", output.display());
    println!(
        "Evidence: {} papers, {} patents, {} news",
        result.data_sources.papers_count,
        result.data_sources.patents_count,
        result.data_sources.news_count
    );
    println!("Technologies discovered: {}", result.technologies.len());

    let top = result.top_technologies(5);
    if !top.is_empty() {
        println!("\nTop 5 Technologies by Strategic Relevance:");
        for (i, tech) in top.iter().enumerate() {
            let label = if tech.title.is_empty() { &tech.name } else { &tech.title };
            println!(
                "  {}. {} (Relevance: {}/10, {})",
                i + 1,
                label,
                tech.strategic_relevance,
                tech.maturity_estimate
            );
        }
    }
}

pub fn print_evaluations(batch: &EvaluationBatch) {
    println!("\nEvaluated {} technologies:", batch.technologies_evaluated);
    let mut evaluations: Vec<_> = batch.individual_evaluations.iter().collect();
    evaluations.sort_by(|a, b| {
        b.recommendation
            .overall_score
            .total_cmp(&a.recommendation.overall_score)
    });
    for evaluation in evaluations {
        let rec = &evaluation.recommendation;
        println!(
            "  {:>5.2}  {:<20} {:<8} {}",
            rec.overall_score,
            rec.recommended_action.to_string(),
            rec.priority.to_string(),
            evaluation.technology.name
        );
    }
    if batch.comparison.is_empty() {
        println!("  (no comparison available)");
    }
}

pub fn print_usage(brain: &Brain) {
    let usage = brain.total_usage();
    println!(
        "\nLLM calls: {} ({} input / {} output tokens)",
        brain.call_count(),
        usage.input_tokens,
        usage.output_tokens
    );
}
