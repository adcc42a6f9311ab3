//! Discovery engine. Drives a scouting run through its phases.

use std::sync::Arc;
use tracing::{info, warn};

use super::prompts::{self, COMPLETION_MARKER, DEFAULT_SYSTEM_PROMPT, QUERY_SYSTEM_PROMPT};
use super::session::{DiscoveryCallback, DiscoveryPhase, DiscoverySession};
use super::{ScoutingRequest, ScoutingResult};
use crate::brain::Brain;
use crate::config::EvidenceCaps;
use crate::error::{LlmError, ScoutError};
use crate::evidence::EvidenceAggregator;
use crate::parser;
use crate::persistence::{OutputDir, SCOUTING_RESULTS_FILE, SEARCH_QUERIES_FILE};
use crate::records::TimeWindow;
use crate::technology::{Technology, TrendInsights};

/// Orchestrates evidence collection and the LLM analysis loop.
///
/// Only LLM failures end a run early. Source outages shrink the evidence,
/// and unparseable replies keep the previous state.
pub struct DiscoveryEngine {
    brain: Arc<Brain>,
    aggregator: EvidenceAggregator,
    caps: EvidenceCaps,
    system_prompt: String,
    output: Option<OutputDir>,
    callback: Option<Arc<dyn DiscoveryCallback>>,
}

impl DiscoveryEngine {
    pub fn new(brain: Arc<Brain>, aggregator: EvidenceAggregator) -> Self {
        Self {
            brain,
            aggregator,
            caps: EvidenceCaps::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            output: None,
            callback: None,
        }
    }

    pub fn with_caps(mut self, caps: EvidenceCaps) -> Self {
        self.caps = caps;
        self
    }

    /// Replace the analyst system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Persist queries and results into `dir`, and read the cache from it.
    pub fn with_output_dir(mut self, dir: OutputDir) -> Self {
        self.output = Some(dir);
        self
    }

    pub fn with_callback(mut self, callback: Arc<dyn DiscoveryCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    fn enter(&self, session: &mut DiscoverySession, phase: DiscoveryPhase) {
        session.transition(phase);
        info!(phase = %phase, progress = session.progress, "Discovery phase");
        if let Some(cb) = &self.callback {
            cb.on_phase_change(phase, session.progress);
        }
    }

    /// Ask the model for search queries.
    ///
    /// An unparseable reply falls back to the domain followed by the focus
    /// areas, so there is always something to search for.
    pub async fn generate_queries(
        &self,
        domain: &str,
        focus_areas: &[String],
        count: usize,
    ) -> Result<Vec<String>, LlmError> {
        let prompt = prompts::query_generation(domain, focus_areas, count);
        let (text, _) = self.brain.respond(&prompt, QUERY_SYSTEM_PROMPT, &[]).await?;

        let queries = match parser::parse_queries(&text) {
            Some(queries) => queries,
            None => {
                warn!(domain, "Could not parse generated queries, using domain and focus areas");
                fallback_queries(domain, focus_areas)
            }
        };
        info!(count = queries.len(), "Search queries ready");

        if let Some(out) = &self.output
            && let Err(e) = out.save(SEARCH_QUERIES_FILE, &queries)
        {
            warn!(error = %e, "Failed to save search queries");
        }
        Ok(queries)
    }

    /// Load a previous result from the output directory, if any.
    pub fn load_cached(&self) -> Result<Option<ScoutingResult>, ScoutError> {
        match &self.output {
            Some(out) => Ok(out.load(SCOUTING_RESULTS_FILE)?),
            None => Ok(None),
        }
    }

    /// Run discovery end to end.
    pub async fn run(&self, request: &ScoutingRequest) -> Result<ScoutingResult, LlmError> {
        let mut session = DiscoverySession::new(request.num_reflections);
        self.run_session(request, &mut session).await
    }

    /// Run discovery, recording progress in `session`.
    pub async fn run_session(
        &self,
        request: &ScoutingRequest,
        session: &mut DiscoverySession,
    ) -> Result<ScoutingResult, LlmError> {
        if request.skip_collection {
            match self.load_cached() {
                Ok(Some(cached)) => {
                    info!(
                        technologies = cached.technologies.len(),
                        "Using cached scouting results"
                    );
                    self.enter(session, DiscoveryPhase::Done);
                    return Ok(cached);
                }
                Ok(None) => info!("No cached scouting results, running full discovery"),
                Err(e) => warn!(error = %e, "Cached scouting results unreadable, running full discovery"),
            }
        }

        match self.discover(request, session).await {
            Ok(result) => {
                self.enter(session, DiscoveryPhase::Done);
                if let Some(out) = &self.output {
                    match out.save(SCOUTING_RESULTS_FILE, &result) {
                        Ok(path) => info!(path = %path.display(), "Scouting results saved"),
                        Err(e) => warn!(error = %e, "Failed to save scouting results"),
                    }
                }
                Ok(result)
            }
            Err(e) => {
                warn!(phase = %session.phase, error = %e, "Discovery failed");
                session.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn discover(
        &self,
        request: &ScoutingRequest,
        session: &mut DiscoverySession,
    ) -> Result<ScoutingResult, LlmError> {
        let queries = if request.search_queries.is_empty() {
            self.enter(session, DiscoveryPhase::QueryGeneration);
            self.generate_queries(
                &request.domain,
                &request.focus_areas,
                request.num_generated_queries,
            )
            .await?
        } else {
            request.search_queries.clone()
        };

        self.enter(session, DiscoveryPhase::EvidenceCollection);
        let window = match request.reference_date {
            Some(date) => {
                TimeWindow::ending_at(date, request.year_lookback, request.news_days_back)
            }
            None => TimeWindow::ending_today(request.year_lookback, request.news_days_back),
        };
        let evidence = self.aggregator.collect(&queries, &window).await;

        self.enter(session, DiscoveryPhase::InitialAnalysis);
        let prompt = prompts::initial_analysis(
            &request.domain,
            &request.focus_areas,
            &evidence.capped(&self.caps),
            &request.existing_technologies,
        );
        let (text, history) = self.brain.respond(&prompt, &self.system_prompt, &[]).await?;
        session.history = history;
        session.technologies = parser::parse_technologies(&text).unwrap_or_else(|| {
            warn!("No technologies could be parsed from the initial analysis");
            Vec::new()
        });
        info!(count = session.technologies.len(), "Initial technology set");

        self.refine(session).await?;

        self.enter(session, DiscoveryPhase::TrendAnalysis);
        let trend_insights = self
            .analyze_trends(&request.domain, &session.technologies)
            .await?;

        let data_sources = evidence.counts();
        Ok(ScoutingResult {
            domain: request.domain.clone(),
            focus_areas: request.focus_areas.clone(),
            search_queries: queries,
            scouting_date: chrono::Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            data_sources,
            technologies: session.technologies.clone(),
            trend_insights,
            raw_data: evidence,
            extra: Default::default(),
        })
    }

    /// Refinement rounds 2..=num_reflections over the shared conversation.
    async fn refine(&self, session: &mut DiscoverySession) -> Result<(), LlmError> {
        let total = session.num_reflections;
        for round in 2..=total {
            self.enter(session, DiscoveryPhase::Refinement(round));
            let prompt = prompts::refinement(round, total);
            let (text, history) = self
                .brain
                .respond(&prompt, &self.system_prompt, &session.history)
                .await?;
            session.history = history;

            let replaced = session.apply_refinement(parser::parse_technologies(&text));
            if replaced {
                info!(round, count = session.technologies.len(), "Technology set refined");
            } else {
                warn!(round, "Refinement reply unusable, keeping previous technology set");
            }
            if let Some(cb) = &self.callback {
                cb.on_refinement(round, total, session.technologies.len(), replaced);
            }

            if text.contains(COMPLETION_MARKER) {
                info!(round, total, "Analysis converged");
                session.converged_at = Some(round);
                break;
            }
        }
        Ok(())
    }

    /// Stateless trend summary. Unparseable replies give empty insights.
    async fn analyze_trends(
        &self,
        domain: &str,
        technologies: &[Technology],
    ) -> Result<TrendInsights, LlmError> {
        let prompt = prompts::trend_analysis(domain, technologies);
        let (text, _) = self.brain.respond(&prompt, &self.system_prompt, &[]).await?;
        Ok(parser::parse_as::<TrendInsights>(&text).unwrap_or_else(|| {
            warn!("Trend insights could not be parsed");
            TrendInsights::default()
        }))
    }
}

/// Domain name followed by each focus area.
pub fn fallback_queries(domain: &str, focus_areas: &[String]) -> Vec<String> {
    std::iter::once(domain.to_string())
        .chain(focus_areas.iter().cloned())
        .filter(|q| !q.trim().is_empty())
        .collect()
}
