//! Technology evaluation: maturity, strategic fit, competition, and the
//! weighted recommendation that combines them.

pub mod engine;
pub mod prompts;
pub mod scoring;
pub mod types;

pub use engine::EvaluationEngine;
pub use prompts::MaturityEvidence;
pub use scoring::generate_recommendation;
pub use types::{
    Comparison, CompetitiveLandscape, Evaluation, EvaluationBatch, MaturityAssessment, Priority,
    Ranking, Recommendation, RecommendedAction, StrategicFit,
};
