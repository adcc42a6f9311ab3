//! Technology and trend records produced by discovery.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::lenient;

/// Coarse maturity stage reported by the discovery analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaturityEstimate {
    #[default]
    Emerging,
    Developing,
    Maturing,
    Mature,
}

impl std::fmt::Display for MaturityEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaturityEstimate::Emerging => write!(f, "emerging"),
            MaturityEstimate::Developing => write!(f, "developing"),
            MaturityEstimate::Maturing => write!(f, "maturing"),
            MaturityEstimate::Mature => write!(f, "mature"),
        }
    }
}

impl std::str::FromStr for MaturityEstimate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emerging" => Ok(MaturityEstimate::Emerging),
            "developing" => Ok(MaturityEstimate::Developing),
            "maturing" => Ok(MaturityEstimate::Maturing),
            "mature" => Ok(MaturityEstimate::Mature),
            other => Err(format!("unknown maturity estimate: {}", other)),
        }
    }
}

// Unknown stages fall back to the default instead of failing the record.
impl<'de> Deserialize<'de> for MaturityEstimate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default())
    }
}

fn neutral_score() -> u8 {
    5
}

/// A technology identified by the discovery analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    /// Stable identifier, lowercase with underscores.
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub key_capabilities: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub source_types: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub key_players: Vec<String>,
    #[serde(default)]
    pub maturity_estimate: MaturityEstimate,
    #[serde(default = "neutral_score", deserialize_with = "lenient::score")]
    pub potential_impact: u8,
    #[serde(default = "neutral_score", deserialize_with = "lenient::score")]
    pub strategic_relevance: u8,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub key_references: Vec<String>,
    /// Years until mainstream adoption. 0 when the model gave no estimate.
    #[serde(default, deserialize_with = "lenient::number")]
    pub timeline_estimate: f64,
    /// Keys the model added beyond the known schema.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Technology {
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: normalize_name(name),
            title: title.to_string(),
            description: String::new(),
            key_capabilities: Vec::new(),
            source_types: Vec::new(),
            key_players: Vec::new(),
            maturity_estimate: MaturityEstimate::default(),
            potential_impact: neutral_score(),
            strategic_relevance: neutral_score(),
            key_references: Vec::new(),
            timeline_estimate: 0.0,
            extra: BTreeMap::new(),
        }
    }

    /// Parse one technology from loosely-shaped JSON.
    ///
    /// Returns `None` for non-objects and for entries with neither a name
    /// nor a title.
    pub fn from_value(value: &Value) -> Option<Technology> {
        if !value.is_object() {
            return None;
        }
        let tech: Technology = serde_json::from_value(value.clone()).ok()?;
        tech.normalized()
    }

    fn normalized(mut self) -> Option<Technology> {
        let source = if self.name.is_empty() {
            &self.title
        } else {
            &self.name
        };
        self.name = normalize_name(source);
        if self.name.is_empty() {
            return None;
        }
        if self.title.is_empty() {
            self.title = self.name.replace('_', " ");
        }
        dedup_in_place(&mut self.key_capabilities);
        dedup_in_place(&mut self.key_players);
        dedup_in_place(&mut self.source_types);
        Some(self)
    }
}

/// Lowercase, with runs of non-alphanumerics collapsed into one underscore.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

fn dedup_in_place(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.to_lowercase()));
}

/// One entry of `major_trends`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    #[serde(default, deserialize_with = "lenient::string")]
    pub trend: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
}

fn trend_list<'de, D>(deserializer: D) -> Result<Vec<Trend>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(Trend {
                trend: s,
                description: String::new(),
            }),
            obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
            _ => None,
        })
        .collect())
}

/// Strategic summary over the final technology set.
///
/// Only `major_trends` is typed; the remaining sections are free-form. A
/// default value serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendInsights {
    #[serde(
        default,
        deserialize_with = "trend_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub major_trends: Vec<Trend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergence_opportunities: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disruption_risks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_priorities: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_list: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_actions: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TrendInsights {
    pub fn is_empty(&self) -> bool {
        self == &TrendInsights::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Solid-State Batteries"), "solid_state_batteries");
        assert_eq!(normalize_name("  mRNA  vaccines "), "mrna_vaccines");
        assert_eq!(normalize_name("already_ok"), "already_ok");
        assert_eq!(normalize_name("--"), "");
    }

    #[test]
    fn test_from_value_full_record() {
        let value = json!({
            "name": "perovskite_solar_cells",
            "title": "Perovskite Solar Cells",
            "description": "Thin-film photovoltaics.",
            "key_capabilities": ["high efficiency", "low cost", "High efficiency"],
            "source_types": ["paper", "patent"],
            "key_players": ["Oxford PV"],
            "maturity_estimate": "developing",
            "potential_impact": 9,
            "strategic_relevance": "8",
            "key_references": ["Stable perovskites at scale"],
            "timeline_estimate": "3-5 years",
            "confidence": "high"
        });
        let tech = Technology::from_value(&value).unwrap();
        assert_eq!(tech.name, "perovskite_solar_cells");
        assert_eq!(tech.maturity_estimate, MaturityEstimate::Developing);
        assert_eq!(tech.potential_impact, 9);
        assert_eq!(tech.strategic_relevance, 8);
        assert_eq!(tech.key_capabilities, vec!["high efficiency", "low cost"]);
        assert_eq!(tech.timeline_estimate, 3.0);
        assert_eq!(tech.extra["confidence"], json!("high"));
    }

    #[test]
    fn test_from_value_defaults_missing_fields() {
        let tech = Technology::from_value(&json!({"title": "Quantum Sensing"})).unwrap();
        assert_eq!(tech.name, "quantum_sensing");
        assert_eq!(tech.potential_impact, 5);
        assert_eq!(tech.strategic_relevance, 5);
        assert_eq!(tech.maturity_estimate, MaturityEstimate::Emerging);
        assert!(tech.key_players.is_empty());
    }

    #[test]
    fn test_from_value_rejects_nameless_and_non_objects() {
        assert!(Technology::from_value(&json!({"description": "no name"})).is_none());
        assert!(Technology::from_value(&json!("just a string")).is_none());
        assert!(Technology::from_value(&json!(null)).is_none());
    }

    #[test]
    fn test_unknown_maturity_falls_back() {
        let tech = Technology::from_value(&json!({"name": "x", "maturity_estimate": "nascent"}))
            .unwrap();
        assert_eq!(tech.maturity_estimate, MaturityEstimate::Emerging);
    }

    #[test]
    fn test_default_insights_serialize_empty() {
        let insights = TrendInsights::default();
        assert!(insights.is_empty());
        assert_eq!(serde_json::to_value(&insights).unwrap(), json!({}));
    }

    #[test]
    fn test_insights_accept_string_trends() {
        let insights: TrendInsights = serde_json::from_value(json!({
            "major_trends": ["Edge AI", {"trend": "Agents", "description": "Tool use"}, 3],
            "watch_list": ["neuromorphic_chips"]
        }))
        .unwrap();
        assert_eq!(insights.major_trends.len(), 2);
        assert_eq!(insights.major_trends[0].trend, "Edge AI");
        assert_eq!(insights.major_trends[1].description, "Tool use");
        assert_eq!(insights.watch_list, Some(json!(["neuromorphic_chips"])));
        assert!(!insights.is_empty());
    }
}
