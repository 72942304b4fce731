pub mod aggregation;
pub mod config;
pub mod insights;
pub mod scoring;

pub use aggregation::{
    compute_aggregation, compute_aggregation_today, monthly_equivalent, yearly_equivalent,
    AggregationResult, CategoryTotal, RENEWAL_WINDOW_DAYS,
};
pub use config::HealthThresholds;
pub use insights::{
    compute_health_assessment, Difficulty, Finding, HealthAssessment, Impact, Insight,
    InsightType, Recommendation, RecommendationCategory,
};
pub use scoring::{health_score, score_from_findings};
