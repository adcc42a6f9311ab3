//! Configuration system for TechScout.
//!
//! Uses `figment` for layered configuration: defaults -> user file -> workspace file
//! -> explicit file -> environment -> CLI overrides. The user file lives at
//! `~/.config/techscout/config.toml`, the workspace file at `<workspace>/techscout.toml`.
//!
//! API keys are plain configuration values. Nothing outside this module reads
//! the process environment for credentials.

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration for a scouting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub llm: LlmConfig,
    pub scouting: ScoutingConfig,
    pub sources: SourcesConfig,
    pub evidence: EvidenceCaps,
    pub evaluation: EvaluationConfig,
    /// Directory receiving `scouting_results.json` and evaluation output.
    pub output_dir: PathBuf,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            scouting: ScoutingConfig::default(),
            sources: SourcesConfig::default(),
            evidence: EvidenceCaps::default(),
            evaluation: EvaluationConfig::default(),
            output_dir: PathBuf::from("techscout_results"),
        }
    }
}

impl ScoutConfig {
    /// Check for configuration problems. Returns human-readable descriptions.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.scouting.domain.trim().is_empty() {
            problems.push("scouting.domain is empty".to_string());
        }
        if self.scouting.num_reflections == 0 {
            problems.push("scouting.num_reflections must be at least 1".to_string());
        }
        if self.scouting.year_lookback == 0 {
            problems.push("scouting.year_lookback is 0, only the current year is searched".to_string());
        }
        for w in self.llm.validate() {
            problems.push(format!("[llm] {}", w));
        }
        for w in self.llm.retry.validate() {
            problems.push(format!("[llm.retry] {}", w));
        }
        for w in self.sources.retry.validate() {
            problems.push(format!("[sources.retry] {}", w));
        }

        let criteria = &self.evaluation.criteria;
        if !criteria.is_empty() {
            let total: f64 = criteria.iter().map(|c| c.weight).sum();
            if (total - 1.0).abs() > 0.01 {
                problems.push(format!(
                    "evaluation.criteria weights sum to {:.2}, expected 1.0",
                    total
                ));
            }
        }

        problems
    }

    /// Focus areas to use, applying domain defaults when none are configured.
    pub fn effective_focus_areas(&self) -> Vec<String> {
        if self.scouting.focus_areas.is_empty() {
            default_focus_areas(&self.scouting.domain)
        } else {
            self.scouting.focus_areas.clone()
        }
    }
}

/// Configuration for the LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai", "anthropic", or any OpenAI-compatible alias
    /// ("ollama", "vllm", "lmstudio").
    pub provider: String,
    /// Model identifier (e.g., "gpt-4o", "claude-sonnet-4-20250514").
    pub model: String,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    /// Explicit API key. Takes precedence over `api_key_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Temperature for generation.
    pub temperature: f32,
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: 4096,
            temperature: 0.75,
            timeout_secs: 120,
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !(0.0..=2.0).contains(&self.temperature) {
            warnings.push(format!(
                "temperature {} is outside the supported range 0.0-2.0",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            warnings.push("max_tokens is 0".to_string());
        }
        if self.model.trim().is_empty() {
            warnings.push("model is empty".to_string());
        }
        warnings
    }

    /// Resolve the API key from the explicit value or the configured env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        configured_key(&self.api_key, &self.api_key_env)
    }
}

/// Retry settings shared by LLM and source calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
    pub jitter: bool,
}

impl RetryConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.max_attempts == 0 {
            warnings.push("max_attempts is 0, calls are still made once".to_string());
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            warnings.push(format!(
                "backoff_multiplier {} must be a number >= 1.0, using {}",
                self.backoff_multiplier,
                crate::retry::DEFAULT_MULTIPLIER
            ));
        }
        warnings
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
            jitter: true,
        }
    }
}

/// What to scout and how hard to think about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutingConfig {
    pub domain: String,
    pub focus_areas: Vec<String>,
    /// Explicit search queries. Empty means generate them with the LLM.
    pub search_queries: Vec<String>,
    /// Initial analysis plus refinements. At least 1.
    pub num_reflections: u32,
    /// Publication years to look back from the current year.
    pub year_lookback: u32,
    /// Target count for generated search queries.
    pub num_generated_queries: usize,
    pub news_days_back: u32,
    /// Replaces the built-in analyst system prompt when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Reuse a previous `scouting_results.json` instead of collecting again.
    pub skip_collection: bool,
}

impl Default for ScoutingConfig {
    fn default() -> Self {
        Self {
            domain: "AI/ML".to_string(),
            focus_areas: Vec::new(),
            search_queries: Vec::new(),
            num_reflections: 3,
            year_lookback: 3,
            num_generated_queries: 10,
            news_days_back: 180,
            system_prompt: None,
            skip_collection: false,
        }
    }
}

/// Credentials and limits for the evidence sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_scholar_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serpapi_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newsapi_key: Option<String>,
    /// Contact address sent to OpenAlex for the polite pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openalex_email: Option<String>,
    /// Extra region-specific providers (ISO country codes, e.g. "JP").
    pub regions: Vec<String>,
    pub papers_limit: usize,
    pub patents_limit: usize,
    pub news_limit: usize,
    /// Pause between consecutive source requests.
    pub request_delay_ms: u64,
    pub http_timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            semantic_scholar_api_key: None,
            serpapi_key: None,
            newsapi_key: None,
            openalex_email: None,
            regions: Vec::new(),
            papers_limit: 30,
            patents_limit: 20,
            news_limit: 20,
            request_delay_ms: 1000,
            http_timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

impl SourcesConfig {
    pub fn semantic_scholar_key(&self) -> Option<String> {
        configured_key(&self.semantic_scholar_api_key, "S2_API_KEY")
    }

    pub fn serpapi_key(&self) -> Option<String> {
        configured_key(&self.serpapi_key, "SERPAPI_KEY")
    }

    pub fn newsapi_key(&self) -> Option<String> {
        configured_key(&self.newsapi_key, "NEWSAPI_KEY")
    }
}

/// Per-category caps on how much evidence is shown to the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceCaps {
    pub papers: usize,
    pub patents: usize,
    pub news: usize,
}

impl Default for EvidenceCaps {
    fn default() -> Self {
        Self {
            papers: 50,
            patents: 30,
            news: 30,
        }
    }
}

/// Evaluation settings and organization profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Skip the evaluation stage entirely.
    pub skip: bool,
    pub criteria: Vec<EvaluationCriterion>,
    pub organization: OrganizationContext,
    /// Technologies the organization already runs.
    pub existing_technologies: Vec<String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            skip: false,
            criteria: default_criteria(),
            organization: OrganizationContext::default(),
            existing_technologies: Vec::new(),
        }
    }
}

/// A weighted criterion used in the cross-technology comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriterion {
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub description: String,
}

impl EvaluationCriterion {
    fn new(name: &str, weight: f64, description: &str) -> Self {
        Self {
            name: name.to_string(),
            weight,
            description: description.to_string(),
        }
    }
}

pub fn default_criteria() -> Vec<EvaluationCriterion> {
    vec![
        EvaluationCriterion::new("strategic_fit", 0.3, "Alignment with strategic priorities"),
        EvaluationCriterion::new("maturity", 0.2, "Technology readiness level"),
        EvaluationCriterion::new("market_potential", 0.2, "Market size and growth potential"),
        EvaluationCriterion::new(
            "competitive_position",
            0.15,
            "Ability to achieve competitive advantage",
        ),
        EvaluationCriterion::new("implementation_feasibility", 0.15, "Ease of implementation"),
    ]
}

/// The organization a technology is evaluated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationContext {
    pub industry: String,
    pub current_capabilities: Vec<String>,
    pub strategic_priorities: Vec<String>,
    pub risk_tolerance: String,
    pub investment_horizon: String,
    /// Unrecognized keys are kept and round-tripped.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for OrganizationContext {
    fn default() -> Self {
        Self {
            industry: "Technology".to_string(),
            current_capabilities: Vec::new(),
            strategic_priorities: vec![
                "Innovation".to_string(),
                "Growth".to_string(),
                "Efficiency".to_string(),
            ],
            risk_tolerance: "moderate".to_string(),
            investment_horizon: "3-5 years".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// Focus areas used when none are configured for a domain.
pub fn default_focus_areas(domain: &str) -> Vec<String> {
    let areas: &[&str] = match domain {
        "AI/ML" => &[
            "Machine Learning",
            "Natural Language Processing",
            "Computer Vision",
            "Robotics",
        ],
        "Biotechnology" => &[
            "Gene Therapy",
            "Drug Discovery",
            "Diagnostics",
            "Synthetic Biology",
        ],
        "CleanTech" => &[
            "Renewable Energy",
            "Energy Storage",
            "Carbon Capture",
            "Sustainable Materials",
        ],
        "FinTech" => &["Blockchain", "Digital Payments", "InsurTech", "RegTech"],
        _ => &["Innovation", "Emerging Technology", "Digital Transformation"],
    };
    areas.iter().map(|s| s.to_string()).collect()
}

/// Whether a credential value is a template placeholder rather than a real key.
pub fn is_placeholder_key(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    v.is_empty()
        || v.starts_with("your-")
        || v.starts_with("your_")
        || v.ends_with("-here")
        || v.ends_with("_here")
        || v.starts_with('<')
        || v == "changeme"
}

fn configured_key(explicit: &Option<String>, env_var: &str) -> Option<String> {
    if let Some(key) = explicit.as_deref()
        && !is_placeholder_key(key)
    {
        return Some(key.to_string());
    }
    std::env::var(env_var)
        .ok()
        .filter(|key| !is_placeholder_key(key))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (dotted key, value)
/// 2. Environment variables (prefixed with `TECHSCOUT_`, `__` separates sections)
/// 3. Explicit config file (TOML, or JSON when the extension is `.json`)
/// 4. Workspace-local config (`techscout.toml`)
/// 5. User config (`~/.config/techscout/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: &[(String, serde_json::Value)],
) -> Result<ScoutConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ScoutConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join("techscout.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        figment = if is_json {
            figment.merge(Json::file(path))
        } else {
            figment.merge(Toml::file(path))
        };
    }

    // TECHSCOUT_SCOUTING__DOMAIN, TECHSCOUT_SOURCES__SERPAPI_KEY, etc.
    figment = figment.merge(Env::prefixed("TECHSCOUT_").split("__"));

    for (key, value) in overrides {
        figment = figment.merge(Serialized::default(key, value));
    }

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

/// Path of the user-level config file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "techscout", "techscout")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Directory for log files and other per-user state.
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "techscout", "techscout")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScoutConfig::default();
        assert_eq!(config.scouting.num_reflections, 3);
        assert_eq!(config.scouting.year_lookback, 3);
        assert_eq!(config.sources.papers_limit, 30);
        assert_eq!(config.sources.patents_limit, 20);
        assert_eq!(config.sources.news_limit, 20);
        assert_eq!(config.evidence, EvidenceCaps { papers: 50, patents: 30, news: 30 });
        assert_eq!(config.evaluation.criteria.len(), 5);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_zero_reflections_and_empty_domain() {
        let mut config = ScoutConfig::default();
        config.scouting.num_reflections = 0;
        config.scouting.domain = "  ".into();
        let problems = config.validate();
        assert!(problems.iter().any(|p| p.contains("num_reflections")));
        assert!(problems.iter().any(|p| p.contains("domain")));
    }

    #[test]
    fn test_validate_criteria_weights() {
        let mut config = ScoutConfig::default();
        config.evaluation.criteria[0].weight = 0.9;
        assert!(config.validate().iter().any(|p| p.contains("weights")));
    }

    #[test]
    fn test_validate_reports_bad_backoff_multiplier() {
        let mut config = ScoutConfig::default();
        config.sources.retry.backoff_multiplier = -2.0;
        config.llm.retry.backoff_multiplier = f64::NAN;
        let problems = config.validate();
        assert!(problems.iter().any(|p| p.starts_with("[sources.retry] backoff_multiplier")));
        assert!(problems.iter().any(|p| p.starts_with("[llm.retry] backoff_multiplier")));
        assert!(ScoutConfig::default().validate().is_empty());
    }

    #[test]
    fn test_llm_config_validate_bad_temperature() {
        let config = LlmConfig {
            temperature: 3.5,
            ..Default::default()
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("temperature"));
    }

    #[test]
    fn test_default_focus_areas() {
        assert_eq!(default_focus_areas("FinTech")[0], "Blockchain");
        assert_eq!(default_focus_areas("CleanTech").len(), 4);
        assert_eq!(
            default_focus_areas("Quantum"),
            vec!["Innovation", "Emerging Technology", "Digital Transformation"]
        );
    }

    #[test]
    fn test_effective_focus_areas_prefers_configured() {
        let mut config = ScoutConfig::default();
        config.scouting.focus_areas = vec!["CRISPR".into()];
        assert_eq!(config.effective_focus_areas(), vec!["CRISPR"]);
        config.scouting.focus_areas.clear();
        assert_eq!(config.effective_focus_areas()[0], "Machine Learning");
    }

    #[test]
    fn test_placeholder_keys() {
        assert!(is_placeholder_key(""));
        assert!(is_placeholder_key("your-serpapi-key-here"));
        assert!(is_placeholder_key("your-newsapi-key-here"));
        assert!(is_placeholder_key("<api key>"));
        assert!(!is_placeholder_key("a1b2c3d4"));
    }

    #[test]
    fn test_explicit_key_wins_over_placeholder_env() {
        let sources = SourcesConfig {
            serpapi_key: Some("real-key-123".into()),
            ..Default::default()
        };
        assert_eq!(sources.serpapi_key().as_deref(), Some("real-key-123"));
    }

    #[test]
    fn test_organization_context_keeps_extra_keys() {
        let json = r#"{"industry": "Automotive", "headcount": 1200}"#;
        let ctx: OrganizationContext = serde_json::from_str(json).unwrap();
        assert_eq!(ctx.industry, "Automotive");
        assert_eq!(ctx.risk_tolerance, "moderate");
        assert_eq!(ctx.extra["headcount"], serde_json::json!(1200));
    }

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(None, None, &[]).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert!(config.scouting.num_reflections >= 1);
    }

    #[test]
    fn test_load_config_with_overrides() {
        let overrides = vec![
            ("scouting.domain".to_string(), serde_json::json!("Biotechnology")),
            ("scouting.num_reflections".to_string(), serde_json::json!(1)),
        ];
        let config = load_config(None, None, &overrides).unwrap();
        assert_eq!(config.scouting.domain, "Biotechnology");
        assert_eq!(config.scouting.num_reflections, 1);
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("techscout.toml"),
            r#"
output_dir = "out"

[scouting]
domain = "CleanTech"
focus_areas = ["Energy Storage"]
num_reflections = 2

[sources]
regions = ["JP"]
papers_limit = 10
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None, &[]).unwrap();
        assert_eq!(config.scouting.domain, "CleanTech");
        assert_eq!(config.scouting.num_reflections, 2);
        assert_eq!(config.sources.regions, vec!["JP"]);
        assert_eq!(config.sources.papers_limit, 10);
        assert_eq!(config.sources.news_limit, 20);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_load_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(
            &path,
            r#"{"scouting": {"domain": "FinTech", "search_queries": ["open banking"]}}"#,
        )
        .unwrap();

        let config = load_config(None, Some(&path), &[]).unwrap();
        assert_eq!(config.scouting.domain, "FinTech");
        assert_eq!(config.scouting.search_queries, vec!["open banking"]);
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let err = load_config(None, Some(Path::new("/nonexistent/techscout.toml")), &[])
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}
