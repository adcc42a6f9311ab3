//! Discovery run state machine.
//!
//! Tracks which phase a scouting run is in, the conversation it is carrying
//! through refinement, and the current technology set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::technology::Technology;
use crate::types::Message;

/// Current phase of a discovery run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPhase {
    /// Asking the LLM for search queries.
    QueryGeneration,
    /// Querying paper, patent, and news sources.
    EvidenceCollection,
    /// First analysis over the collected evidence.
    InitialAnalysis,
    /// Refinement round (1-based, the initial analysis is round 1).
    Refinement(u32),
    /// Stateless trend summary over the final technology set.
    TrendAnalysis,
    Done,
    Failed,
}

impl std::fmt::Display for DiscoveryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryPhase::QueryGeneration => write!(f, "query_generation"),
            DiscoveryPhase::EvidenceCollection => write!(f, "evidence_collection"),
            DiscoveryPhase::InitialAnalysis => write!(f, "initial_analysis"),
            DiscoveryPhase::Refinement(round) => write!(f, "refinement({})", round),
            DiscoveryPhase::TrendAnalysis => write!(f, "trend_analysis"),
            DiscoveryPhase::Done => write!(f, "done"),
            DiscoveryPhase::Failed => write!(f, "failed"),
        }
    }
}

/// State of one in-flight discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySession {
    pub phase: DiscoveryPhase,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Total analysis rounds, initial analysis included.
    pub num_reflections: u32,
    /// Conversation shared by the initial analysis and every refinement.
    pub history: Vec<Message>,
    /// Latest successfully parsed technology set.
    pub technologies: Vec<Technology>,
    /// Set when the model signalled convergence before the budget ran out.
    pub converged_at: Option<u32>,
    pub progress: f64,
    pub error: Option<String>,
}

impl DiscoverySession {
    pub fn new(num_reflections: u32) -> Self {
        let now = Utc::now();
        Self {
            phase: DiscoveryPhase::EvidenceCollection,
            started_at: now,
            updated_at: now,
            num_reflections: num_reflections.max(1),
            history: Vec::new(),
            technologies: Vec::new(),
            converged_at: None,
            progress: 0.0,
            error: None,
        }
    }

    /// Transition to a new phase.
    pub fn transition(&mut self, new_phase: DiscoveryPhase) {
        self.phase = new_phase;
        self.updated_at = Utc::now();
        self.update_progress();
    }

    /// Mark the session as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.phase = DiscoveryPhase::Failed;
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, DiscoveryPhase::Done | DiscoveryPhase::Failed)
    }

    /// Replace the technology set with a refined one.
    ///
    /// `None` or an empty list keeps the previous set. Returns whether the set
    /// was replaced.
    pub fn apply_refinement(&mut self, refined: Option<Vec<Technology>>) -> bool {
        match refined {
            Some(techs) if !techs.is_empty() => {
                self.technologies = techs;
                true
            }
            _ => false,
        }
    }

    fn update_progress(&mut self) {
        self.progress = match self.phase {
            DiscoveryPhase::QueryGeneration => 0.05,
            DiscoveryPhase::EvidenceCollection => 0.1,
            DiscoveryPhase::InitialAnalysis => 0.5,
            DiscoveryPhase::Refinement(round) => {
                let total = self.num_reflections.max(2) as f64;
                0.5 + 0.35 * (round as f64 - 1.0) / (total - 1.0)
            }
            DiscoveryPhase::TrendAnalysis => 0.9,
            DiscoveryPhase::Done => 1.0,
            DiscoveryPhase::Failed => self.progress,
        };
    }
}

/// Callback for progress reporting during a discovery run.
pub trait DiscoveryCallback: Send + Sync {
    fn on_phase_change(&self, phase: DiscoveryPhase, progress: f64);
    /// Called after every refinement round with the size of the current set.
    fn on_refinement(&self, round: u32, total: u32, technologies: usize, replaced: bool);
}

/// No-op callback.
pub struct NoOpDiscoveryCallback;

impl DiscoveryCallback for NoOpDiscoveryCallback {
    fn on_phase_change(&self, _phase: DiscoveryPhase, _progress: f64) {}
    fn on_refinement(&self, _round: u32, _total: u32, _technologies: usize, _replaced: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let mut session = DiscoverySession::new(3);
        assert!(session.is_active());

        session.transition(DiscoveryPhase::InitialAnalysis);
        assert!((session.progress - 0.5).abs() < f64::EPSILON);

        session.transition(DiscoveryPhase::Refinement(3));
        assert!((session.progress - 0.85).abs() < 1e-9);

        session.transition(DiscoveryPhase::Done);
        assert!(!session.is_active());
        assert!((session.progress - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fail_keeps_progress() {
        let mut session = DiscoverySession::new(1);
        session.transition(DiscoveryPhase::InitialAnalysis);
        session.fail("provider down");
        assert_eq!(session.phase, DiscoveryPhase::Failed);
        assert_eq!(session.error.as_deref(), Some("provider down"));
        assert!((session.progress - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_apply_refinement_never_erases() {
        let mut session = DiscoverySession::new(3);
        session.technologies = vec![Technology::new("edge_ai", "Edge AI")];

        assert!(!session.apply_refinement(None));
        assert_eq!(session.technologies.len(), 1);

        assert!(!session.apply_refinement(Some(Vec::new())));
        assert_eq!(session.technologies[0].name, "edge_ai");

        assert!(session.apply_refinement(Some(vec![
            Technology::new("tiny_ml", "TinyML"),
            Technology::new("edge_ai", "Edge AI"),
        ])));
        assert_eq!(session.technologies.len(), 2);
    }

    #[test]
    fn test_zero_reflections_clamped() {
        assert_eq!(DiscoverySession::new(0).num_reflections, 1);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(DiscoveryPhase::Refinement(2).to_string(), "refinement(2)");
        assert_eq!(DiscoveryPhase::TrendAnalysis.to_string(), "trend_analysis");
    }
}
