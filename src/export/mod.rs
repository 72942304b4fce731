use anyhow::{Context, Result};
use serde::Serialize;

use crate::analytics::{monthly_equivalent, AggregationResult, HealthAssessment};
use crate::db::helpers::format_optional_date;
use crate::db::models::Subscription;
use crate::subscriptions::DashboardState;

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    name: &'a str,
    service_name: &'a str,
    category: &'a str,
    amount: f64,
    currency: &'a str,
    billing_cycle: &'a str,
    monthly_equivalent: String,
    next_billing_date: String,
    is_active: bool,
    payment_method: &'a str,
    usage_percentage: Option<f64>,
    is_essential: bool,
    notes: &'a str,
}

impl<'a> From<&'a Subscription> for CsvRow<'a> {
    fn from(record: &'a Subscription) -> Self {
        Self {
            id: &record.id,
            name: &record.name,
            service_name: &record.service_name,
            category: record.category_label(),
            amount: record.amount,
            currency: &record.currency,
            billing_cycle: record.billing_cycle.as_str(),
            monthly_equivalent: format!(
                "{:.2}",
                monthly_equivalent(record.amount, record.billing_cycle)
            ),
            next_billing_date: format_optional_date(record.next_billing_date).unwrap_or_default(),
            is_active: record.is_active,
            payment_method: &record.payment_method,
            usage_percentage: record.usage_percentage,
            is_essential: record.is_essential,
            notes: record.notes.as_deref().unwrap_or(""),
        }
    }
}

/// One header row, then one row per record in the order given.
pub fn records_to_csv(records: &[Subscription]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer
            .serialize(CsvRow::from(record))
            .with_context(|| format!("failed to write CSV row for {}", record.id))?;
    }
    if records.is_empty() {
        writer.write_record(CSV_HEADER)?;
    }

    let bytes = writer.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

const CSV_HEADER: [&str; 14] = [
    "id",
    "name",
    "service_name",
    "category",
    "amount",
    "currency",
    "billing_cycle",
    "monthly_equivalent",
    "next_billing_date",
    "is_active",
    "payment_method",
    "usage_percentage",
    "is_essential",
    "notes",
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardExport<'a> {
    generated_at: String,
    subscription_count: usize,
    aggregation: &'a AggregationResult,
    health: &'a HealthAssessment,
}

/// Pretty JSON of the aggregation and health assessment in a dashboard snapshot.
pub fn dashboard_to_json(state: &DashboardState) -> Result<String> {
    let export = DashboardExport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        subscription_count: state.subscriptions.len(),
        aggregation: &state.aggregation,
        health: &state.health,
    };
    serde_json::to_string_pretty(&export).context("failed to serialize dashboard")
}
