use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;

use crate::db::models::BillingCycle;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// Stored dates that no longer parse are read as missing so one bad row cannot block a load.
pub fn parse_optional_date(value: Option<String>, field: &str, id: &str) -> Option<NaiveDate> {
    let raw = value?;
    match NaiveDate::parse_from_str(&raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(err) => {
            warn!("subscription {id} has unreadable {field} '{raw}' ({err}); treating as unset");
            None
        }
    }
}

pub fn format_optional_date(value: Option<NaiveDate>) -> Option<String> {
    value.map(|date| date.format(DATE_FORMAT).to_string())
}

/// Stored cycles are free text in older databases; anything unrecognised is read as Monthly.
pub fn parse_billing_cycle(value: &str, id: &str) -> BillingCycle {
    match value {
        "Monthly" => BillingCycle::Monthly,
        "Yearly" => BillingCycle::Yearly,
        other => {
            warn!("subscription {id} has unknown billing cycle '{other}'; treating as Monthly");
            BillingCycle::Monthly
        }
    }
}
