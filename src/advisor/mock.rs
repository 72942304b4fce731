use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::analytics::{
    compute_aggregation_today, score_from_findings, Difficulty, Finding, HealthThresholds,
    Impact, Insight, InsightType, Recommendation, RecommendationCategory,
};
use crate::db::models::Subscription;

use super::{AdvisorAnalysis, AnalysisRequest, Advisor};

const ENABLE_LOGS: bool = true;
use crate::log_debug;

/// Stand-in advisor: waits a fixed delay, then returns canned advice shaped by the records.
pub struct MockAdvisor {
    delay: Duration,
    thresholds: HealthThresholds,
}

impl MockAdvisor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            thresholds: HealthThresholds::default(),
        }
    }

    /// Overload and unused cut-offs follow the same thresholds as the rule engine.
    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

impl Default for MockAdvisor {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl Advisor for MockAdvisor {
    async fn analyze(
        &self,
        request: AnalysisRequest,
        cancel: CancellationToken,
    ) -> Result<AdvisorAnalysis> {
        log_debug!(
            "mock advisor analysing {} records after {:?}",
            request.records.len(),
            self.delay
        );

        tokio::select! {
            _ = cancel.cancelled() => bail!("analysis cancelled"),
            _ = tokio::time::sleep(self.delay) => {}
        }

        Ok(canned_analysis(&request.records, &self.thresholds))
    }
}

fn canned_analysis(records: &[Subscription], thresholds: &HealthThresholds) -> AdvisorAnalysis {
    let aggregation = compute_aggregation_today(records);
    let active_count = aggregation.active_count;
    let overloaded = active_count > thresholds.high_count;
    let has_unused = records
        .iter()
        .any(|r| r.is_active && r.is_underused(thresholds.unused_usage_pct));

    let insights = vec![
        Insight {
            title: "Subscription Count".into(),
            description: format!("You have {active_count} active subscriptions."),
            insight_type: if overloaded {
                InsightType::Warning
            } else {
                InsightType::Tip
            },
            impact: if overloaded {
                Impact::High
            } else {
                Impact::Low
            },
            finding: if overloaded {
                Finding::SubscriptionOverload
            } else {
                Finding::General
            },
        },
        Insight {
            title: "Monthly Spend".into(),
            description: format!(
                "Total monthly cost: {:.2}",
                aggregation.total_monthly_cost
            ),
            insight_type: InsightType::Tip,
            impact: Impact::Low,
            finding: Finding::General,
        },
        Insight {
            title: "Unused Services".into(),
            description: "Consider canceling unused services to save money.".into(),
            insight_type: InsightType::Suggestion,
            impact: Impact::Medium,
            finding: if has_unused {
                Finding::UnusedServices
            } else {
                Finding::General
            },
        },
    ];

    let recommendations = if active_count == 0 {
        Vec::new()
    } else {
        vec![
            Recommendation {
                title: "Cancel Unused Subscriptions".into(),
                description: "Cancel services you haven't used in the last 3 months.".into(),
                estimated_annual_savings: 29.99,
                difficulty: Difficulty::Easy,
                category: RecommendationCategory::Optimization,
            },
            Recommendation {
                title: "Switch to Annual Billing".into(),
                description: "Annual plans are usually cheaper than paying monthly.".into(),
                estimated_annual_savings: 120.0,
                difficulty: Difficulty::Medium,
                category: RecommendationCategory::Optimization,
            },
            Recommendation {
                title: "Bundle Services".into(),
                description: "A bundle could replace several individual subscriptions.".into(),
                estimated_annual_savings: 15.0,
                difficulty: Difficulty::Hard,
                category: RecommendationCategory::Bundling,
            },
        ]
    };

    let health_score = score_from_findings(&insights, &recommendations);
    AdvisorAnalysis {
        insights,
        recommendations,
        health_score,
    }
}
