//! Insight and recommendation derivation.
//!
//! Everything here is a pure function of the aggregation, the record snapshot and the
//! thresholds. The advisor collaborator may produce its own findings using the same types.

use serde::{Deserialize, Serialize};

use crate::analytics::aggregation::{billable_amount, yearly_equivalent, AggregationResult};
use crate::analytics::config::HealthThresholds;
use crate::analytics::scoring::health_score;
use crate::db::models::{BillingCycle, Subscription};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InsightType {
    Warning,
    Suggestion,
    Tip,
    Achievement,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

/// Machine-readable tag for an insight, so scoring never has to match on title text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Finding {
    SubscriptionOverload,
    OverBudget,
    UnusedServices,
    BillingOptimization,
    HealthySpending,
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub title: String,
    pub description: String,
    pub insight_type: InsightType,
    pub impact: Impact,
    pub finding: Finding,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecommendationCategory {
    Optimization,
    Bundling,
    Cancellation,
    Upgrade,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub estimated_annual_savings: f64,
    pub difficulty: Difficulty,
    pub category: RecommendationCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthAssessment {
    pub health_score: i32,
    pub monthly_savings_estimate: f64,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

impl Default for HealthAssessment {
    fn default() -> Self {
        Self {
            health_score: 100,
            monthly_savings_estimate: 0.0,
            insights: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

fn join_names(records: &[&Subscription]) -> String {
    records
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sum of monthly-equivalent savings over all recommendations.
pub fn monthly_savings(recommendations: &[Recommendation]) -> f64 {
    recommendations
        .iter()
        .map(|r| r.estimated_annual_savings / 12.0)
        .sum()
}

pub fn compute_health_assessment(
    aggregation: &AggregationResult,
    records: &[Subscription],
    thresholds: &HealthThresholds,
) -> HealthAssessment {
    let active: Vec<&Subscription> = records.iter().filter(|r| r.is_active).collect();

    let recommendations = derive_recommendations(aggregation, &active, thresholds);
    let insights = derive_insights(aggregation, &active, thresholds);

    HealthAssessment {
        health_score: health_score(aggregation, thresholds),
        monthly_savings_estimate: monthly_savings(&recommendations),
        insights,
        recommendations,
    }
}

fn underused<'a>(active: &[&'a Subscription], thresholds: &HealthThresholds) -> Vec<&'a Subscription> {
    active
        .iter()
        .copied()
        .filter(|r| r.is_underused(thresholds.unused_usage_pct))
        .collect()
}

fn monthly_billed<'a>(active: &[&'a Subscription]) -> Vec<&'a Subscription> {
    active
        .iter()
        .copied()
        .filter(|r| r.billing_cycle == BillingCycle::Monthly && billable_amount(r) > 0.0)
        .collect()
}

fn annual_switch_savings(monthly: &[&Subscription], thresholds: &HealthThresholds) -> f64 {
    monthly
        .iter()
        .map(|r| billable_amount(r) * 12.0 * thresholds.annual_discount_rate)
        .sum()
}

fn derive_insights(
    aggregation: &AggregationResult,
    active: &[&Subscription],
    thresholds: &HealthThresholds,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    let count = aggregation.active_count;

    if count > thresholds.moderate_count {
        let impact = if count > thresholds.high_count {
            Impact::High
        } else {
            Impact::Medium
        };
        insights.push(Insight {
            title: "Subscription Overload".into(),
            description: format!(
                "You have {} active subscriptions. Review which ones you still need.",
                count
            ),
            insight_type: InsightType::Warning,
            impact,
            finding: Finding::SubscriptionOverload,
        });
    }

    if let Some(limit) = thresholds.monthly_budget {
        let total = aggregation.total_monthly_cost;
        if total > limit {
            insights.push(Insight {
                title: "Over Budget".into(),
                description: format!(
                    "Monthly spend of {:.2} exceeds your budget of {:.2} by {:.2}.",
                    total,
                    limit,
                    total - limit
                ),
                insight_type: InsightType::Warning,
                impact: Impact::High,
                finding: Finding::OverBudget,
            });
        }
    }

    let unused = underused(active, thresholds);
    if !unused.is_empty() {
        insights.push(Insight {
            title: "Unused Services".into(),
            description: format!(
                "{} show less than {:.0}% usage ({}). Consider canceling to save money.",
                plural(unused.len(), "subscription"),
                thresholds.unused_usage_pct,
                join_names(&unused)
            ),
            insight_type: InsightType::Suggestion,
            impact: Impact::Medium,
            finding: Finding::UnusedServices,
        });
    }

    let monthly = monthly_billed(active);
    let switch_savings = annual_switch_savings(&monthly, thresholds);
    if switch_savings > 0.0 {
        insights.push(Insight {
            title: "Payment Optimization".into(),
            description: format!(
                "Switch {} to annual billing to save about {:.2}/year.",
                plural(monthly.len(), "subscription"),
                round_cents(switch_savings)
            ),
            insight_type: InsightType::Tip,
            impact: Impact::Low,
            finding: Finding::BillingOptimization,
        });
    }

    let has_concerns = insights.iter().any(|i| {
        matches!(
            i.finding,
            Finding::SubscriptionOverload | Finding::OverBudget | Finding::UnusedServices
        )
    });
    if !has_concerns {
        insights.push(Insight {
            title: "Healthy Spending".into(),
            description: format!(
                "{} costing {:.2} per month, with nothing flagged.",
                plural(count, "active subscription"),
                aggregation.total_monthly_cost
            ),
            insight_type: InsightType::Achievement,
            impact: Impact::Low,
            finding: Finding::HealthySpending,
        });
    }

    insights
}

fn derive_recommendations(
    aggregation: &AggregationResult,
    active: &[&Subscription],
    thresholds: &HealthThresholds,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let unused = underused(active, thresholds);
    let cancel_savings: f64 = unused
        .iter()
        .map(|r| yearly_equivalent(billable_amount(r), r.billing_cycle))
        .sum();
    if cancel_savings > 0.0 {
        recommendations.push(Recommendation {
            title: "Cancel Unused Subscriptions".into(),
            description: format!(
                "Cancel {} - usage is below {:.0}%.",
                join_names(&unused),
                thresholds.unused_usage_pct
            ),
            estimated_annual_savings: round_cents(cancel_savings),
            difficulty: Difficulty::Easy,
            category: RecommendationCategory::Cancellation,
        });
    }

    let monthly = monthly_billed(active);
    let switch_savings = annual_switch_savings(&monthly, thresholds);
    if switch_savings > 0.0 {
        recommendations.push(Recommendation {
            title: "Switch to Annual Billing".into(),
            description: format!(
                "Move {} to annual plans ({}).",
                plural(monthly.len(), "monthly subscription"),
                join_names(&monthly)
            ),
            estimated_annual_savings: round_cents(switch_savings),
            difficulty: Difficulty::Medium,
            category: RecommendationCategory::Optimization,
        });
    }

    for category in &aggregation.category_totals {
        if category.subscription_count < thresholds.bundle_min_services {
            continue;
        }
        let savings = category.monthly_total * 12.0 * thresholds.bundle_discount_rate;
        if savings <= 0.0 {
            continue;
        }
        recommendations.push(Recommendation {
            title: format!("Bundle {} Services", category.category),
            description: format!(
                "You pay for {} {} services separately; a bundle could cut the cost.",
                category.subscription_count, category.category
            ),
            estimated_annual_savings: round_cents(savings),
            difficulty: Difficulty::Hard,
            category: RecommendationCategory::Bundling,
        });
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::aggregation::compute_aggregation;
    use crate::analytics::aggregation::test_support::{assert_close, monthly, today, yearly};

    fn assess(records: &[Subscription], thresholds: &HealthThresholds) -> HealthAssessment {
        let aggregation = compute_aggregation(records, today());
        compute_health_assessment(&aggregation, records, thresholds)
    }

    fn findings(assessment: &HealthAssessment) -> Vec<Finding> {
        assessment.insights.iter().map(|i| i.finding).collect()
    }

    #[test]
    fn empty_snapshot_is_healthy() {
        let assessment = assess(&[], &HealthThresholds::default());
        assert_eq!(assessment.health_score, 100);
        assert_eq!(assessment.monthly_savings_estimate, 0.0);
        assert!(assessment.recommendations.is_empty());
        assert_eq!(findings(&assessment), vec![Finding::HealthySpending]);
        assert_eq!(assessment.insights[0].insight_type, InsightType::Achievement);
    }

    #[test]
    fn yearly_only_snapshot_has_no_billing_tip() {
        let assessment = assess(&[yearly("Adobe", 120.0)], &HealthThresholds::default());
        assert_eq!(findings(&assessment), vec![Finding::HealthySpending]);
    }

    #[test]
    fn overload_impact_scales_with_count() {
        let six: Vec<_> = (0..6).map(|i| yearly(&format!("y{i}"), 12.0)).collect();
        let eleven: Vec<_> = (0..11).map(|i| yearly(&format!("y{i}"), 12.0)).collect();

        let medium = assess(&six, &HealthThresholds::default());
        assert_eq!(medium.insights[0].finding, Finding::SubscriptionOverload);
        assert_eq!(medium.insights[0].impact, Impact::Medium);

        let high = assess(&eleven, &HealthThresholds::default());
        assert_eq!(high.insights[0].impact, Impact::High);
        assert_eq!(high.health_score, 80);
    }

    #[test]
    fn unused_services_flag_low_usage_non_essentials() {
        let mut idle = monthly("Idle", 10.0);
        idle.usage_percentage = Some(5.0);
        let mut idle_essential = monthly("Bank", 4.0);
        idle_essential.usage_percentage = Some(1.0);
        idle_essential.is_essential = true;
        let mut busy = monthly("Busy", 20.0);
        busy.usage_percentage = Some(90.0);

        let assessment = assess(&[idle, idle_essential, busy], &HealthThresholds::default());

        let unused = assessment
            .insights
            .iter()
            .find(|i| i.finding == Finding::UnusedServices)
            .expect("unused insight");
        assert!(unused.description.contains("1 subscription show"));
        assert!(unused.description.contains("Idle"));
        assert!(!unused.description.contains("Bank"));

        let cancel = &assessment.recommendations[0];
        assert_eq!(cancel.category, RecommendationCategory::Cancellation);
        assert_eq!(cancel.difficulty, Difficulty::Easy);
        assert_close(cancel.estimated_annual_savings, 120.0);
    }

    #[test]
    fn annual_switch_savings_use_discount_rate() {
        let assessment = assess(
            &[monthly("Netflix", 10.0), monthly("Spotify", 10.0)],
            &HealthThresholds::default(),
        );

        let switch = assessment
            .recommendations
            .iter()
            .find(|r| r.category == RecommendationCategory::Optimization)
            .expect("switch recommendation");
        assert_close(switch.estimated_annual_savings, 36.0);
        assert_eq!(switch.difficulty, Difficulty::Medium);
        assert_close(assessment.monthly_savings_estimate, 3.0);
        assert!(findings(&assessment).contains(&Finding::BillingOptimization));
    }

    #[test]
    fn bundling_needs_enough_services_in_one_category() {
        let records: Vec<_> = (0..3).map(|i| yearly(&format!("y{i}"), 120.0)).collect();
        let assessment = assess(&records, &HealthThresholds::default());

        assert_eq!(assessment.recommendations.len(), 1);
        let bundle = &assessment.recommendations[0];
        assert_eq!(bundle.title, "Bundle Entertainment Services");
        assert_eq!(bundle.category, RecommendationCategory::Bundling);
        assert_eq!(bundle.difficulty, Difficulty::Hard);
        assert_close(bundle.estimated_annual_savings, 36.0);

        let two = assess(&records[..2], &HealthThresholds::default());
        assert!(two.recommendations.is_empty());
    }

    #[test]
    fn monthly_savings_is_sum_of_annual_over_twelve() {
        let mut idle = monthly("Idle", 10.0);
        idle.usage_percentage = Some(0.0);
        let records = vec![idle, monthly("A", 10.0), monthly("B", 10.0)];
        let assessment = assess(&records, &HealthThresholds::default());

        let annual: f64 = assessment
            .recommendations
            .iter()
            .map(|r| r.estimated_annual_savings)
            .sum();
        assert_close(assessment.monthly_savings_estimate, annual / 12.0);
        assert!(assessment
            .recommendations
            .iter()
            .all(|r| r.estimated_annual_savings >= 0.0));
    }

    #[test]
    fn over_budget_warning_needs_a_limit() {
        let records = [monthly("Gym", 60.0), monthly("Cloud", 60.0)];

        let without = assess(&records, &HealthThresholds::default());
        assert!(!findings(&without).contains(&Finding::OverBudget));

        let with = assess(
            &records,
            &HealthThresholds::default().with_monthly_budget(Some(100.0)),
        );
        let warning = with
            .insights
            .iter()
            .find(|i| i.finding == Finding::OverBudget)
            .expect("over budget");
        assert!(warning.description.contains("by 20.00"));
        assert!(!findings(&with).contains(&Finding::HealthySpending));
    }

    #[test]
    fn inactive_records_are_ignored_for_insights() {
        let mut idle = monthly("Idle", 10.0);
        idle.usage_percentage = Some(0.0);
        idle.is_active = false;
        let assessment = assess(&[idle], &HealthThresholds::default());
        assert!(assessment.recommendations.is_empty());
        assert_eq!(findings(&assessment), vec![Finding::HealthySpending]);
    }

    #[test]
    fn non_finite_amounts_count_as_zero_for_savings() {
        let mut broken = monthly("Broken", f64::INFINITY);
        broken.usage_percentage = Some(1.0);
        let mut nan = monthly("Nan", f64::NAN);
        nan.usage_percentage = Some(1.0);
        let records = vec![broken, nan, monthly("Fine", 10.0)];

        let aggregation = compute_aggregation(&records, today());
        let assessment =
            compute_health_assessment(&aggregation, &records, &HealthThresholds::default());
        assert_close(aggregation.total_monthly_cost, 10.0);
        assert!(assessment.monthly_savings_estimate.is_finite());
        assert!(assessment
            .recommendations
            .iter()
            .all(|r| r.estimated_annual_savings.is_finite()));
        assert!(!assessment
            .recommendations
            .iter()
            .any(|r| r.category == RecommendationCategory::Cancellation));
        // annual switch on the 10.00 record plus the Entertainment bundle
        assert_close(assessment.monthly_savings_estimate, (18.0 + 12.0) / 12.0);
    }

    #[test]
    fn assessment_is_deterministic() {
        let mut idle = monthly("Idle", 10.0);
        idle.usage_percentage = Some(3.0);
        let records = vec![idle, monthly("A", 12.5), yearly("B", 99.0)];
        let first = assess(&records, &HealthThresholds::default());
        let second = assess(&records, &HealthThresholds::default());
        assert_eq!(first, second);
    }
}
