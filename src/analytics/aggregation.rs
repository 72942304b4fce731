use std::collections::HashMap;

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::models::{BillingCycle, Subscription};

/// Renewals due within this many days (inclusive) count as upcoming.
pub const RENEWAL_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub monthly_total: f64,
    pub subscription_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub total_monthly_cost: f64,
    pub total_yearly_cost: f64,
    pub upcoming_renewals: Vec<Subscription>,
    /// Insertion order of each category's first active record.
    pub category_totals: Vec<CategoryTotal>,
    pub active_count: usize,
}

impl AggregationResult {
    /// Category totals largest first, ties broken by name.
    pub fn categories_by_spend(&self) -> Vec<CategoryTotal> {
        let mut sorted = self.category_totals.clone();
        sorted.sort_by(|a, b| {
            b.monthly_total
                .total_cmp(&a.monthly_total)
                .then_with(|| a.category.cmp(&b.category))
        });
        sorted
    }

    pub fn category_total(&self, category: &str) -> Option<f64> {
        self.category_totals
            .iter()
            .find(|entry| entry.category == category)
            .map(|entry| entry.monthly_total)
    }
}

/// Negative or non-finite amounts contribute nothing.
pub(crate) fn billable_amount(record: &Subscription) -> f64 {
    if record.amount.is_finite() {
        record.amount.max(0.0)
    } else {
        0.0
    }
}

pub fn monthly_equivalent(amount: f64, cycle: BillingCycle) -> f64 {
    match cycle {
        BillingCycle::Yearly => amount / 12.0,
        BillingCycle::Monthly => amount,
    }
}

pub fn yearly_equivalent(amount: f64, cycle: BillingCycle) -> f64 {
    match cycle {
        BillingCycle::Monthly => amount * 12.0,
        BillingCycle::Yearly => amount,
    }
}

/// Aggregate a snapshot of records as of `as_of`.
///
/// Records are expected to arrive sorted by next billing date; the renewal list keeps
/// that order. Inactive records are ignored everywhere.
pub fn compute_aggregation(records: &[Subscription], as_of: NaiveDate) -> AggregationResult {
    let window_end = as_of + Duration::days(RENEWAL_WINDOW_DAYS);

    let mut result = AggregationResult::default();
    let mut category_index: HashMap<String, usize> = HashMap::new();

    for record in records.iter().filter(|r| r.is_active) {
        let amount = billable_amount(record);
        let monthly = monthly_equivalent(amount, record.billing_cycle);

        result.active_count += 1;
        result.total_monthly_cost += monthly;
        result.total_yearly_cost += yearly_equivalent(amount, record.billing_cycle);

        if matches!(record.next_billing_date, Some(date) if date <= window_end) {
            result.upcoming_renewals.push(record.clone());
        }

        let label = record.category_label();
        match category_index.get(label) {
            Some(&idx) => {
                let entry = &mut result.category_totals[idx];
                entry.monthly_total += monthly;
                entry.subscription_count += 1;
            }
            None => {
                category_index.insert(label.to_string(), result.category_totals.len());
                result.category_totals.push(CategoryTotal {
                    category: label.to_string(),
                    monthly_total: monthly,
                    subscription_count: 1,
                });
            }
        }
    }

    result
}

pub fn compute_aggregation_today(records: &[Subscription]) -> AggregationResult {
    compute_aggregation(records, Local::now().date_naive())
}
