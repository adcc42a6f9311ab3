//! Prompt templates for evaluation.

use serde::Serialize;

use crate::config::{EvaluationCriterion, OrganizationContext};
use crate::technology::Technology;

pub const MATURITY_SYSTEM_PROMPT: &str =
    "You are an expert at assessing technology maturity and readiness levels.";
pub const STRATEGIC_FIT_SYSTEM_PROMPT: &str = "You are a strategic technology advisor helping \
organizations make technology investment decisions.";
pub const COMPETITIVE_SYSTEM_PROMPT: &str =
    "You are a competitive intelligence analyst specializing in emerging technologies.";
pub const COMPARISON_SYSTEM_PROMPT: &str = "You are a technology portfolio analyst helping \
organizations prioritize technology investments.";

/// Evidence counts shown to the maturity assessment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaturityEvidence {
    pub papers_count: usize,
    pub patents_count: usize,
    pub news_count: usize,
    pub key_players: Vec<String>,
}

impl MaturityEvidence {
    /// References stand in for papers; patent and news counts are not
    /// tracked per technology.
    pub fn for_technology(technology: &Technology) -> Self {
        Self {
            papers_count: technology.key_references.len(),
            patents_count: 0,
            news_count: 0,
            key_players: technology.key_players.clone(),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn maturity(technology: &Technology, evidence: &MaturityEvidence) -> String {
    format!(
        r#"Assess the maturity of this technology on the Technology Readiness Level scale.

<technology>
{tech}
</technology>

<evidence>
{evidence}
</evidence>

TRL scale:
1. Basic principles observed
2. Technology concept formulated
3. Experimental proof of concept
4. Technology validated in lab
5. Technology validated in relevant environment
6. Technology demonstrated in relevant environment
7. System prototype demonstrated in operational environment
8. System complete and qualified
9. Actual system proven in operational environment

Return a JSON object:
```json
{{
  "trl_level": <integer 1-9>,
  "trl_description": "<name of the level>",
  "maturity_stage": "research|development|demonstration|deployment|mature",
  "evidence_strength": <integer 1-10>,
  "key_milestones_achieved": ["..."],
  "remaining_challenges": ["..."],
  "estimated_years_to_market": <number>,
  "confidence": <integer 1-10>,
  "rationale": "<short justification>"
}}
```
"#,
        tech = to_json(technology),
        evidence = to_json(evidence),
    )
}

pub fn strategic_fit(
    technology: &Technology,
    organization: &OrganizationContext,
    criteria: &[EvaluationCriterion],
) -> String {
    format!(
        r#"Evaluate how well this technology fits the organization below.

<technology>
{tech}
</technology>

<organization>
{org}
</organization>

<evaluation_criteria>
{criteria}
</evaluation_criteria>

Consider alignment with the strategic priorities, the capability gaps the
organization would have to close, the risk tolerance, and the investment
horizon.

Return a JSON object:
```json
{{
  "overall_fit_score": <integer 1-10>,
  "alignment_with_priorities": {{"<priority>": <integer 1-10>}},
  "capability_gaps": ["..."],
  "build_vs_buy_recommendation": "build_internal|partner|acquire|license|avoid",
  "investment_type": "exploratory|strategic|opportunistic",
  "recommended_investment_level": "low|medium|high",
  "key_risks": ["..."],
  "key_opportunities": ["..."],
  "competitive_advantage_potential": <integer 1-10>,
  "time_sensitivity": "urgent|important|can_wait|not_time_sensitive",
  "recommended_actions": ["..."]
}}
```
"#,
        tech = to_json(technology),
        org = to_json(organization),
        criteria = to_json(criteria),
    )
}

pub fn competitive_landscape(technology: &Technology, key_players: &[String]) -> String {
    format!(
        r#"Analyze the competitive landscape for this technology.

<technology>
{tech}
</technology>

<known_players>
{players}
</known_players>

Return a JSON object:
```json
{{
  "market_leaders": [{{"name": "...", "description": "..."}}],
  "emerging_players": [{{"name": "...", "description": "..."}}],
  "research_leaders": ["..."],
  "competitive_intensity": <integer 1-10>,
  "market_timing": "early|growth|mature|declining",
  "barriers_to_entry": ["..."],
  "ip_landscape": "<summary of the patent situation>",
  "partnership_opportunities": ["..."],
  "acquisition_targets": ["..."]
}}
```
"#,
        tech = to_json(technology),
        players = to_json(key_players),
    )
}

pub fn comparison(technologies: &[Technology], criteria: &[EvaluationCriterion]) -> String {
    format!(
        r#"Compare these technologies and rank them for investment.

<technologies>
{techs}
</technologies>

<evaluation_criteria>
{criteria}
</evaluation_criteria>

Score each technology against every criterion on 1-10 and combine the scores
with the criterion weights into an overall score on 1-100.

Return a JSON object:
```json
{{
  "rankings": [
    {{
      "name": "<technology name>",
      "overall_score": <number 1-100>,
      "scores_by_criteria": {{"<criterion>": <integer 1-10>}},
      "key_strengths": ["..."],
      "key_weaknesses": ["..."]
    }}
  ],
  "recommended_portfolio": {{"immediate": ["..."], "near_term": ["..."], "long_term": ["..."]}},
  "prioritization_rationale": "...",
  "resource_allocation_suggestion": {{"<technology name>": "<share of budget>"}}
}}
```
"#,
        techs = to_json(technologies),
        criteria = to_json(criteria),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_criteria;

    #[test]
    fn test_evidence_from_technology() {
        let mut tech = Technology::new("solid_state_battery", "Solid-State Battery");
        tech.key_references = vec!["ref a".into(), "ref b".into()];
        tech.key_players = vec!["QuantumScape".into()];
        let evidence = MaturityEvidence::for_technology(&tech);
        assert_eq!(evidence.papers_count, 2);
        assert_eq!(evidence.patents_count, 0);
        assert_eq!(evidence.key_players, vec!["QuantumScape"]);
    }

    #[test]
    fn test_strategic_fit_embeds_context() {
        let tech = Technology::new("edge_ai", "Edge AI");
        let org = OrganizationContext::default();
        let prompt = strategic_fit(&tech, &org, &default_criteria());
        assert!(prompt.contains("\"edge_ai\""));
        assert!(prompt.contains("\"Technology\""));
        assert!(prompt.contains("build_vs_buy_recommendation"));
    }

    #[test]
    fn test_comparison_lists_all() {
        let techs = vec![Technology::new("a", "A"), Technology::new("b", "B")];
        let prompt = comparison(&techs, &default_criteria());
        assert!(prompt.contains("\"a\""));
        assert!(prompt.contains("\"b\""));
        assert!(prompt.contains("rankings"));
    }
}
