//! Technology discovery pipeline.
//!
//! Query generation -> evidence collection -> initial analysis -> refinement
//! rounds -> trend analysis. See [`DiscoveryEngine`].

pub mod engine;
pub mod prompts;
pub mod session;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::ScoutConfig;
use crate::records::{EvidenceBundle, SourceCounts};
use crate::technology::{Technology, TrendInsights};

pub use engine::DiscoveryEngine;
pub use session::{DiscoveryCallback, DiscoveryPhase, DiscoverySession, NoOpDiscoveryCallback};

/// Inputs for one discovery run.
#[derive(Debug, Clone)]
pub struct ScoutingRequest {
    pub domain: String,
    pub focus_areas: Vec<String>,
    /// Empty means the queries are generated by the LLM.
    pub search_queries: Vec<String>,
    pub num_reflections: u32,
    pub year_lookback: u32,
    pub news_days_back: u32,
    pub num_generated_queries: usize,
    /// Advisory list shown to the model so it does not rediscover them.
    pub existing_technologies: Vec<String>,
    /// Return the cached result from the output directory when present.
    pub skip_collection: bool,
    /// Day the time window ends on. Defaults to today.
    pub reference_date: Option<NaiveDate>,
}

impl ScoutingRequest {
    pub fn new(domain: impl Into<String>) -> Self {
        let defaults = crate::config::ScoutingConfig::default();
        Self {
            domain: domain.into(),
            focus_areas: Vec::new(),
            search_queries: Vec::new(),
            num_reflections: defaults.num_reflections,
            year_lookback: defaults.year_lookback,
            news_days_back: defaults.news_days_back,
            num_generated_queries: defaults.num_generated_queries,
            existing_technologies: Vec::new(),
            skip_collection: false,
            reference_date: None,
        }
    }

    pub fn from_config(config: &ScoutConfig) -> Self {
        let s = &config.scouting;
        Self {
            domain: s.domain.clone(),
            focus_areas: config.effective_focus_areas(),
            search_queries: s.search_queries.clone(),
            num_reflections: s.num_reflections,
            year_lookback: s.year_lookback,
            news_days_back: s.news_days_back,
            num_generated_queries: s.num_generated_queries,
            existing_technologies: config.evaluation.existing_technologies.clone(),
            skip_collection: s.skip_collection,
            reference_date: None,
        }
    }
}

/// Output of a discovery run, persisted as `scouting_results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutingResult {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub scouting_date: String,
    #[serde(default)]
    pub data_sources: SourceCounts,
    #[serde(default)]
    pub technologies: Vec<Technology>,
    #[serde(default)]
    pub trend_insights: TrendInsights,
    #[serde(default)]
    pub raw_data: EvidenceBundle,
    /// Keys written by other tools are carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ScoutingResult {
    /// Technologies ordered by strategic relevance, highest first.
    pub fn top_technologies(&self, n: usize) -> Vec<&Technology> {
        let mut ranked: Vec<&Technology> = self.technologies.iter().collect();
        ranked.sort_by(|a, b| {
            b.strategic_relevance
                .cmp(&a.strategic_relevance)
                .then(b.potential_impact.cmp(&a.potential_impact))
        });
        ranked.truncate(n);
        ranked
    }
}
