//! Evaluation engine: per-technology assessments and batch comparison.

use std::sync::Arc;
use tracing::{info, warn};

use super::prompts::{
    self, COMPARISON_SYSTEM_PROMPT, COMPETITIVE_SYSTEM_PROMPT, MATURITY_SYSTEM_PROMPT,
    MaturityEvidence, STRATEGIC_FIT_SYSTEM_PROMPT,
};
use super::scoring::generate_recommendation;
use super::types::{
    Comparison, CompetitiveLandscape, Evaluation, EvaluationBatch, MaturityAssessment,
    StrategicFit,
};
use crate::brain::Brain;
use crate::config::{EvaluationCriterion, OrganizationContext, default_criteria};
use crate::error::LlmError;
use crate::parser;
use crate::persistence::{BATCH_EVALUATION_FILE, OutputDir};
use crate::technology::Technology;

/// Runs the three sub-assessments for each technology and combines them.
///
/// Every LLM call is stateless. A reply that cannot be parsed leaves that
/// sub-assessment empty; an LLM failure aborts the call.
pub struct EvaluationEngine {
    brain: Arc<Brain>,
    organization: OrganizationContext,
    criteria: Vec<EvaluationCriterion>,
    output: Option<OutputDir>,
}

impl EvaluationEngine {
    pub fn new(brain: Arc<Brain>) -> Self {
        Self {
            brain,
            organization: OrganizationContext::default(),
            criteria: default_criteria(),
            output: None,
        }
    }

    pub fn with_organization(mut self, organization: OrganizationContext) -> Self {
        self.organization = organization;
        self
    }

    /// Criteria for strategic fit and comparison. An empty list keeps the defaults.
    pub fn with_criteria(mut self, criteria: Vec<EvaluationCriterion>) -> Self {
        if !criteria.is_empty() {
            self.criteria = criteria;
        }
        self
    }

    pub fn with_output_dir(mut self, dir: OutputDir) -> Self {
        self.output = Some(dir);
        self
    }

    pub fn organization(&self) -> &OrganizationContext {
        &self.organization
    }

    pub fn criteria(&self) -> &[EvaluationCriterion] {
        &self.criteria
    }

    async fn ask<T: serde::de::DeserializeOwned>(
        &self,
        what: &str,
        technology: &str,
        prompt: &str,
        system_message: &str,
    ) -> Result<Option<T>, LlmError> {
        let (text, _) = self.brain.respond(prompt, system_message, &[]).await?;
        let parsed = parser::parse_as::<T>(&text);
        if parsed.is_none() {
            warn!(technology, assessment = what, "Assessment reply could not be parsed");
        }
        Ok(parsed)
    }

    pub async fn assess_maturity(
        &self,
        technology: &Technology,
        evidence: &MaturityEvidence,
    ) -> Result<Option<MaturityAssessment>, LlmError> {
        let prompt = prompts::maturity(technology, evidence);
        self.ask("maturity", &technology.name, &prompt, MATURITY_SYSTEM_PROMPT)
            .await
    }

    pub async fn evaluate_strategic_fit(
        &self,
        technology: &Technology,
    ) -> Result<Option<StrategicFit>, LlmError> {
        let prompt = prompts::strategic_fit(technology, &self.organization, &self.criteria);
        self.ask(
            "strategic_fit",
            &technology.name,
            &prompt,
            STRATEGIC_FIT_SYSTEM_PROMPT,
        )
        .await
    }

    pub async fn analyze_competitive_landscape(
        &self,
        technology: &Technology,
        key_players: &[String],
    ) -> Result<Option<CompetitiveLandscape>, LlmError> {
        let prompt = prompts::competitive_landscape(technology, key_players);
        self.ask(
            "competitive_landscape",
            &technology.name,
            &prompt,
            COMPETITIVE_SYSTEM_PROMPT,
        )
        .await
    }

    /// Maturity, strategic fit, and competition, then the combined
    /// recommendation. Nothing is written to disk.
    pub async fn evaluate_technology(&self, technology: &Technology) -> Result<Evaluation, LlmError> {
        info!(technology = %technology.name, "Evaluating technology");
        let evidence = MaturityEvidence::for_technology(technology);

        let maturity_assessment = self.assess_maturity(technology, &evidence).await?;
        let strategic_fit = self.evaluate_strategic_fit(technology).await?;
        let competitive_landscape = self
            .analyze_competitive_landscape(technology, &technology.key_players)
            .await?;

        let recommendation = generate_recommendation(
            maturity_assessment.as_ref(),
            strategic_fit.as_ref(),
            competitive_landscape.as_ref(),
        );
        info!(
            technology = %technology.name,
            score = recommendation.overall_score,
            action = %recommendation.recommended_action,
            "Evaluation complete"
        );

        Ok(Evaluation {
            technology: technology.clone(),
            evaluation_date: now_iso(),
            maturity_assessment,
            strategic_fit,
            competitive_landscape,
            recommendation,
        })
    }

    /// Evaluate one technology and write `evaluation_<name>.json`.
    pub async fn evaluate_and_save(&self, technology: &Technology) -> Result<Evaluation, LlmError> {
        let evaluation = self.evaluate_technology(technology).await?;
        if let Some(out) = &self.output {
            let path = out.evaluation_path(&technology.name);
            match crate::persistence::atomic_write_json(&path, &evaluation) {
                Ok(()) => info!(path = %path.display(), "Evaluation saved"),
                Err(e) => warn!(error = %e, "Failed to save evaluation"),
            }
        }
        Ok(evaluation)
    }

    /// Rank technologies against the criteria.
    ///
    /// Never fails: an LLM error or an unparseable reply gives an empty
    /// comparison.
    pub async fn compare(&self, technologies: &[Technology]) -> Comparison {
        let prompt = prompts::comparison(technologies, &self.criteria);
        match self.brain.respond(&prompt, COMPARISON_SYSTEM_PROMPT, &[]).await {
            Ok((text, _)) => parser::parse_as::<Comparison>(&text).unwrap_or_else(|| {
                warn!("Comparison reply could not be parsed");
                Comparison::default()
            }),
            Err(e) => {
                warn!(error = %e, "Comparison failed");
                Comparison::default()
            }
        }
    }

    /// Evaluate each technology in order, then compare them all.
    ///
    /// Writes `batch_evaluation_results.json` when an output directory is set.
    pub async fn batch_evaluate(
        &self,
        technologies: &[Technology],
    ) -> Result<EvaluationBatch, LlmError> {
        let mut individual_evaluations = Vec::with_capacity(technologies.len());
        for (i, technology) in technologies.iter().enumerate() {
            info!(
                index = i + 1,
                total = technologies.len(),
                technology = %technology.name,
                "Batch evaluation"
            );
            individual_evaluations.push(self.evaluate_technology(technology).await?);
        }

        let comparison = if technologies.is_empty() {
            Comparison::default()
        } else {
            self.compare(technologies).await
        };

        let batch = EvaluationBatch {
            evaluation_date: now_iso(),
            technologies_evaluated: technologies.len(),
            evaluation_criteria: self.criteria.clone(),
            individual_evaluations,
            comparison,
        };

        if let Some(out) = &self.output {
            match out.save(BATCH_EVALUATION_FILE, &batch) {
                Ok(path) => info!(path = %path.display(), "Batch evaluation saved"),
                Err(e) => warn!(error = %e, "Failed to save batch evaluation"),
            }
        }
        Ok(batch)
    }
}

fn now_iso() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::evaluation::types::{Priority, RecommendedAction};

    fn engine(mock: Arc<MockLlmProvider>) -> EvaluationEngine {
        EvaluationEngine::new(Arc::new(Brain::new(mock)))
    }

    #[tokio::test]
    async fn test_evaluate_technology_scores() {
        let mock = Arc::new(MockLlmProvider::with_responses([
            r#"```json
{"trl_level": 6, "evidence_strength": 8}
```"#,
            r#"```json
{"overall_fit_score": 6, "build_vs_buy_recommendation": "partner"}
```"#,
            r#"```json
{"competitive_intensity": 4}
```"#,
        ]));
        let tech = Technology::new("solid_state_battery", "Solid-State Battery");
        let eval = engine(Arc::clone(&mock)).evaluate_technology(&tech).await.unwrap();

        assert_eq!(eval.maturity_assessment.as_ref().unwrap().trl_level, Some(6));
        assert_eq!(eval.recommendation.overall_score, 6.6);
        assert_eq!(
            eval.recommendation.recommended_action,
            RecommendedAction::MonitorAndPilot
        );
        assert_eq!(eval.recommendation.investment_recommendation, "partner");
        assert_eq!(mock.call_count(), 3);

        let requests = mock.requests();
        assert_eq!(requests[0].messages[0].content, MATURITY_SYSTEM_PROMPT);
        assert_eq!(requests[1].messages[0].content, STRATEGIC_FIT_SYSTEM_PROMPT);
        assert_eq!(requests[2].messages[0].content, COMPETITIVE_SYSTEM_PROMPT);
        assert!(requests.iter().all(|r| r.messages.len() == 2));
    }

    #[tokio::test]
    async fn test_unparseable_sub_assessment_is_neutral() {
        let mock = Arc::new(MockLlmProvider::with_responses([
            "I cannot assess this.",
            "Nope.",
            "Still nope.",
        ]));
        let eval = engine(mock)
            .evaluate_technology(&Technology::new("x", "X"))
            .await
            .unwrap();
        assert!(eval.maturity_assessment.is_none());
        assert!(eval.strategic_fit.is_none());
        assert!(eval.competitive_landscape.is_none());
        assert_eq!(eval.recommendation.overall_score, 5.0);
        assert_eq!(eval.recommendation.priority, Priority::Low);
        assert_eq!(eval.recommendation.time_sensitivity, "can_wait");
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_error(LlmError::AuthFailed {
            provider: "mock".into(),
        });
        let result = engine(mock)
            .evaluate_technology(&Technology::new("x", "X"))
            .await;
        assert!(matches!(result, Err(LlmError::AuthFailed { .. })));
    }

    #[tokio::test]
    async fn test_compare_failure_is_empty() {
        let mock = Arc::new(MockLlmProvider::new());
        mock.queue_error(LlmError::AuthFailed {
            provider: "mock".into(),
        });
        let comparison = engine(mock).compare(&[Technology::new("x", "X")]).await;
        assert!(comparison.is_empty());
    }

    #[tokio::test]
    async fn test_odd_secondary_fields_do_not_drop_scores() {
        let mock = Arc::new(MockLlmProvider::with_responses([
            r#"```json
{"evidence_strength": 8}
```"#,
            r#"```json
{"overall_fit_score": 9, "alignment_with_priorities": null, "time_sensitivity": ["urgent"]}
```"#,
            r#"```json
{"competitive_intensity": 2, "market_timing": ["growth", "early"]}
```"#,
        ]));
        let eval = engine(mock)
            .evaluate_technology(&Technology::new("x", "X"))
            .await
            .unwrap();
        assert!(eval.strategic_fit.is_some());
        assert!(eval.competitive_landscape.is_some());
        assert_eq!(eval.recommendation.overall_score, 8.5);
        assert_eq!(
            eval.recommendation.recommended_action,
            RecommendedAction::PursueActively
        );
        assert_eq!(eval.recommendation.time_sensitivity, "can_wait");
    }

    #[tokio::test]
    async fn test_compare_keeps_string_ranking_scores() {
        let mock = Arc::new(MockLlmProvider::with_responses([r#"```json
{"rankings": [{"name": "x", "overall_score": "85"}], "prioritization_rationale": "x first"}
```"#]));
        let comparison = engine(mock).compare(&[Technology::new("x", "X")]).await;
        assert!(!comparison.is_empty());
        assert_eq!(comparison.rankings[0].overall_score, Some(85.0));
        assert_eq!(
            comparison.prioritization_rationale,
            Some(serde_json::json!("x first"))
        );
    }

    #[test]
    fn test_empty_criteria_keeps_defaults() {
        let e = engine(Arc::new(MockLlmProvider::new())).with_criteria(Vec::new());
        assert_eq!(e.criteria().len(), 5);
    }
}
