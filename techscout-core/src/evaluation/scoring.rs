//! Weighted recommendation scoring.

use super::types::{
    CompetitiveLandscape, MaturityAssessment, Priority, Recommendation, RecommendedAction,
    StrategicFit,
};

pub const MATURITY_WEIGHT: f64 = 0.3;
pub const FIT_WEIGHT: f64 = 0.5;
pub const COMPETITION_WEIGHT: f64 = 0.2;

/// Score used for a sub-assessment that is missing or has no score.
pub const NEUTRAL_SCORE: f64 = 5.0;

/// Weighted score from the three sub-scores, unrounded.
///
/// Competitive intensity is inverted: a crowded field lowers the score.
pub fn overall_score(evidence_strength: f64, fit_score: f64, competitive_intensity: f64) -> f64 {
    MATURITY_WEIGHT * evidence_strength
        + FIT_WEIGHT * fit_score
        + COMPETITION_WEIGHT * (10.0 - competitive_intensity)
}

/// Map a score onto an action and priority.
pub fn classify(score: f64) -> (RecommendedAction, Priority) {
    if score >= 7.5 {
        (RecommendedAction::PursueActively, Priority::High)
    } else if score >= 5.5 {
        (RecommendedAction::MonitorAndPilot, Priority::Medium)
    } else if score >= 3.5 {
        (RecommendedAction::Watch, Priority::Low)
    } else {
        (RecommendedAction::Deprioritize, Priority::None)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Combine the sub-assessments into a recommendation.
pub fn generate_recommendation(
    maturity: Option<&MaturityAssessment>,
    strategic_fit: Option<&StrategicFit>,
    competitive: Option<&CompetitiveLandscape>,
) -> Recommendation {
    let evidence = maturity
        .and_then(|m| m.evidence_strength)
        .unwrap_or(NEUTRAL_SCORE);
    let fit = strategic_fit
        .and_then(|f| f.overall_fit_score)
        .unwrap_or(NEUTRAL_SCORE);
    let intensity = competitive
        .and_then(|c| c.competitive_intensity)
        .unwrap_or(NEUTRAL_SCORE);

    let score = overall_score(evidence, fit, intensity);
    let (recommended_action, priority) = classify(score);

    Recommendation {
        overall_score: round2(score),
        recommended_action,
        priority,
        investment_recommendation: strategic_fit
            .and_then(|f| f.build_vs_buy_recommendation.clone())
            .unwrap_or_else(|| "evaluate".to_string()),
        time_sensitivity: strategic_fit
            .and_then(|f| f.time_sensitivity.clone())
            .unwrap_or_else(|| "can_wait".to_string()),
    }
}
