use crate::analytics::aggregation::AggregationResult;
use crate::analytics::config::HealthThresholds;
use crate::analytics::insights::{Finding, Insight, Recommendation, RecommendationCategory};

const BASE_SCORE: i32 = 100;
const OVERLOAD_FINDING_PENALTY: i32 = 20;
const UNUSED_FINDING_PENALTY: i32 = 15;
const OPTIMIZATION_BONUS: i32 = 10;

fn clamp_score(score: i32) -> i32 {
    score.clamp(0, 100)
}

/// Rule-based score from active count and monthly spend. Always within [0, 100].
pub fn health_score(aggregation: &AggregationResult, thresholds: &HealthThresholds) -> i32 {
    let mut score = BASE_SCORE;

    let count = aggregation.active_count;
    if count > thresholds.high_count {
        score -= thresholds.high_count_penalty;
    } else if count > thresholds.moderate_count {
        score -= thresholds.moderate_count_penalty;
    }

    let monthly = aggregation.total_monthly_cost;
    if monthly > thresholds.high_monthly_cost {
        score -= thresholds.high_cost_penalty;
    } else if monthly > thresholds.moderate_monthly_cost {
        score -= thresholds.moderate_cost_penalty;
    }

    clamp_score(score)
}

/// Score from qualitative findings alone, for analyses that carry no raw totals.
pub fn score_from_findings(insights: &[Insight], recommendations: &[Recommendation]) -> i32 {
    let mut score = BASE_SCORE;

    if insights
        .iter()
        .any(|i| i.finding == Finding::SubscriptionOverload)
    {
        score -= OVERLOAD_FINDING_PENALTY;
    }
    if insights.iter().any(|i| i.finding == Finding::UnusedServices) {
        score -= UNUSED_FINDING_PENALTY;
    }
    if recommendations
        .iter()
        .any(|r| r.category == RecommendationCategory::Optimization)
    {
        score += OPTIMIZATION_BONUS;
    }

    clamp_score(score)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::analytics::aggregation::compute_aggregation;
    use crate::analytics::aggregation::test_support::{monthly, today};
    use crate::analytics::insights::{Difficulty, Impact, InsightType};

    fn score_for(records: &[crate::db::models::Subscription]) -> i32 {
        let aggregation = compute_aggregation(records, today());
        health_score(&aggregation, &HealthThresholds::default())
    }

    fn many(count: usize, amount: f64) -> Vec<crate::db::models::Subscription> {
        (0..count)
            .map(|i| monthly(&format!("sub-{i}"), amount))
            .collect()
    }

    #[test]
    fn empty_input_scores_full_marks() {
        assert_eq!(score_for(&[]), 100);
    }

    #[test]
    fn eleven_small_subscriptions_lose_count_and_cost_points() {
        // 11 > 10 costs 20, and 110 > 100 costs another 15
        assert_eq!(score_for(&many(11, 10.0)), 65);
    }

    #[test]
    fn heavy_spender_hits_both_top_penalties() {
        assert_eq!(score_for(&many(50, 500.0)), 55);
    }

    #[test]
    fn moderate_bands_apply_only_above_their_threshold() {
        assert_eq!(score_for(&many(5, 20.0)), 100);
        assert_eq!(score_for(&many(6, 10.0)), 90);
        assert_eq!(score_for(&many(6, 20.0)), 75);
        assert_eq!(score_for(&many(1, 200.0)), 85);
        assert_eq!(score_for(&many(1, 200.01)), 75);
    }

    #[test]
    fn inactive_records_do_not_count() {
        let mut records = many(11, 10.0);
        for record in records.iter_mut().take(6) {
            record.is_active = false;
        }
        assert_eq!(score_for(&records), 100);
    }

    #[test]
    fn custom_penalties_are_clamped() {
        let thresholds = HealthThresholds {
            high_count_penalty: 90,
            high_cost_penalty: 90,
            ..HealthThresholds::default()
        };
        let aggregation = compute_aggregation(&many(20, 50.0), today());
        assert_eq!(health_score(&aggregation, &thresholds), 0);
    }

    fn insight(finding: Finding) -> Insight {
        Insight {
            title: "t".into(),
            description: "d".into(),
            insight_type: InsightType::Warning,
            impact: Impact::High,
            finding,
        }
    }

    fn recommendation(category: RecommendationCategory) -> Recommendation {
        Recommendation {
            title: "t".into(),
            description: "d".into(),
            estimated_annual_savings: 10.0,
            difficulty: Difficulty::Easy,
            category,
        }
    }

    #[test]
    fn findings_score_applies_flag_adjustments() {
        let insights = [
            insight(Finding::SubscriptionOverload),
            insight(Finding::UnusedServices),
            insight(Finding::BillingOptimization),
        ];
        let recs = [
            recommendation(RecommendationCategory::Optimization),
            recommendation(RecommendationCategory::Bundling),
        ];
        assert_eq!(score_from_findings(&insights, &recs), 75);
    }

    #[test]
    fn findings_score_never_exceeds_one_hundred() {
        let recs = [recommendation(RecommendationCategory::Optimization)];
        assert_eq!(score_from_findings(&[], &recs), 100);
        assert_eq!(score_from_findings(&[], &[]), 100);
    }

    proptest! {
        #[test]
        fn rule_score_is_always_bounded(count in 0usize..80, amount in 0.0f64..5000.0) {
            let score = score_for(&many(count, amount));
            prop_assert!((0..=100).contains(&score));
        }
    }
}
