//! Evaluation records.
//!
//! Sub-assessments come straight from LLM output, so every field is optional
//! or defaulted and unknown keys are kept in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::EvaluationCriterion;
use crate::lenient;
use crate::technology::Technology;

/// Technology Readiness Level assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaturityAssessment {
    #[serde(default, deserialize_with = "lenient::opt_trl")]
    pub trl_level: Option<u8>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub trl_description: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub maturity_stage: String,
    /// Strength of the supporting evidence, 1-10.
    #[serde(default, deserialize_with = "lenient::opt_score")]
    pub evidence_strength: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub key_milestones_achieved: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub remaining_challenges: Vec<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub estimated_years_to_market: f64,
    #[serde(default, deserialize_with = "lenient::opt_score")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub rationale: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Fit of a technology with the organization's strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategicFit {
    #[serde(default, deserialize_with = "lenient::opt_score")]
    pub overall_fit_score: Option<f64>,
    /// Priority name to score.
    #[serde(default, deserialize_with = "lenient::map")]
    pub alignment_with_priorities: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub capability_gaps: Vec<String>,
    /// build_internal, partner, acquire, license, or avoid.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub build_vs_buy_recommendation: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub investment_type: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub recommended_investment_level: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub key_risks: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub key_opportunities: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_score")]
    pub competitive_advantage_potential: Option<f64>,
    /// urgent, important, can_wait, or not_time_sensitive.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub time_sensitivity: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub recommended_actions: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Competitive landscape. Only the scored fields are typed; the lists of
/// companies and institutions vary too much in shape and stay in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveLandscape {
    /// How crowded the field is, 1-10. Higher is worse for a newcomer.
    #[serde(default, deserialize_with = "lenient::opt_score")]
    pub competitive_intensity: Option<f64>,
    /// early, growth, mature, or declining.
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub market_timing: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ip_landscape: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub barriers_to_entry: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    PursueActively,
    MonitorAndPilot,
    Watch,
    Deprioritize,
}

impl std::fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendedAction::PursueActively => write!(f, "pursue_actively"),
            RecommendedAction::MonitorAndPilot => write!(f, "monitor_and_pilot"),
            RecommendedAction::Watch => write!(f, "watch"),
            RecommendedAction::Deprioritize => write!(f, "deprioritize"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
    None,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
            Priority::None => write!(f, "none"),
        }
    }
}

/// Combined verdict for one technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Weighted score, rounded to two decimals.
    pub overall_score: f64,
    pub recommended_action: RecommendedAction,
    pub priority: Priority,
    pub investment_recommendation: String,
    pub time_sensitivity: String,
}

/// All assessments for one technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub technology: Technology,
    pub evaluation_date: String,
    /// `None` when the model's reply could not be parsed.
    pub maturity_assessment: Option<MaturityAssessment>,
    pub strategic_fit: Option<StrategicFit>,
    pub competitive_landscape: Option<CompetitiveLandscape>,
    #[serde(rename = "overall_recommendation", alias = "recommendation")]
    pub recommendation: Recommendation,
}

/// One entry of the comparison ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    /// Weighted score on 1-100.
    #[serde(default, deserialize_with = "lenient::opt_number")]
    pub overall_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::map")]
    pub scores_by_criteria: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub key_strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub key_weaknesses: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Cross-technology comparison. A default value serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(
        default,
        deserialize_with = "lenient::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub rankings: Vec<Ranking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_portfolio: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prioritization_rationale: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_allocation_suggestion: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Comparison {
    pub fn is_empty(&self) -> bool {
        self == &Comparison::default()
    }
}

/// Result of evaluating a set of technologies, persisted as
/// `batch_evaluation_results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationBatch {
    pub evaluation_date: String,
    pub technologies_evaluated: usize,
    pub evaluation_criteria: Vec<EvaluationCriterion>,
    pub individual_evaluations: Vec<Evaluation>,
    pub comparison: Comparison,
}
