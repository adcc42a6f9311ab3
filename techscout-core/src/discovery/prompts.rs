//! Prompt templates for discovery.

use crate::records::EvidenceBundle;
use crate::technology::Technology;

/// Literal the model writes when further refinement would not change its answer.
pub const COMPLETION_MARKER: &str = "ANALYSIS COMPLETE";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert technology scout with deep knowledge \
of emerging technologies and their commercial potential.";

pub const QUERY_SYSTEM_PROMPT: &str =
    "You are an expert at information retrieval and technology scouting.";

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

pub fn query_generation(domain: &str, focus_areas: &[String], count: usize) -> String {
    format!(
        r#"Write {count} search queries for scouting technologies in this domain.

Domain: {domain}
Focus areas:
{focus}

The queries will be sent to academic paper indexes, patent databases, and news
feeds. Cover recent research breakthroughs, patent activity that signals
commercial development, and startup or industry moves.

Return the queries as a JSON list of strings:
```json
["query 1", "query 2"]
```
"#,
        focus = bullet_list(focus_areas),
    )
}

pub fn initial_analysis(
    domain: &str,
    focus_areas: &[String],
    evidence: &EvidenceBundle,
    existing_technologies: &[String],
) -> String {
    format!(
        r#"You are scouting emerging technologies in the domain of: {domain}

Focus areas:
{focus}

Evidence collected from external sources:

<academic_papers>
{papers}
</academic_papers>

<patents>
{patents}
</patents>

<news_articles>
{news}
</news_articles>

<existing_technologies>
{existing}
</existing_technologies>

Identify the most promising emerging technologies that are not already in the
existing technologies list.

Answer in this format:

ANALYSIS:
<your analysis>

TECHNOLOGIES JSON:
```json
<technology list>
```

In the analysis, cover the trends visible across sources, technologies that
show up in more than one source type, technologies with breakthrough or
rapid-growth signals, and gaps in the current landscape.

The technology list is a JSON array. Each entry has:
- "name": short identifier, lowercase with underscores
- "title": descriptive title
- "description": two or three sentences
- "key_capabilities": list of main capabilities or applications
- "source_types": subset of ["paper", "patent", "news"] where it was seen
- "key_players": companies, universities, or researchers involved
- "maturity_estimate": one of "emerging", "developing", "maturing", "mature"
- "potential_impact": integer 1-10
- "strategic_relevance": integer 1-10 relative to the focus areas
- "key_references": titles or identifiers of the most relevant sources
- "timeline_estimate": years until mainstream adoption

Be thorough but realistic.
"#,
        focus = bullet_list(focus_areas),
        papers = to_json(&evidence.papers),
        patents = to_json(&evidence.patents),
        news = to_json(&evidence.news),
        existing = to_json(&existing_technologies),
    )
}

pub fn refinement(round: u32, total: u32) -> String {
    format!(
        r#"Round {round}/{total}.

Review the technologies you identified and refine them:

1. Should any technologies be merged or split?
2. Do the maturity estimates match the evidence?
3. Did you miss technologies that appear in several sources?
4. Do the strategic relevance scores reflect the focus areas?

Answer in the same format:

ANALYSIS:
<your analysis>

TECHNOLOGIES JSON:
```json
<complete technology list>
```

Always return the complete list, not only the changes. If you are satisfied
with the analysis, write "{COMPLETION_MARKER}" at the end of ANALYSIS."#
    )
}

pub fn trend_analysis(domain: &str, technologies: &[Technology]) -> String {
    format!(
        r#"You are a technology trend analyst. These technologies were discovered in the {domain} domain:

<technologies>
{techs}
</technologies>

Describe the overarching trends and their strategic implications.

Answer in this format:

TREND ANALYSIS:
<your analysis>

INSIGHTS JSON:
```json
<insights object>
```

The insights object has:
- "major_trends": 3-5 entries of {{"trend": ..., "description": ...}}
- "convergence_opportunities": technologies that could be combined for greater impact
- "disruption_risks": technologies that could disrupt existing solutions
- "investment_priorities": recommended priority ranking for investment
- "watch_list": technologies to monitor that are not ready for investment
- "recommended_actions": specific actions for the organization
"#,
        techs = to_json(&technologies),
    )
}
