//! Subscription data models.
//!
//! `Subscription` is the persisted record. `SubscriptionInput` is the validated field set
//! accepted by add/update, and `SubscriptionForm` is the raw text a user typed before it
//! has been parsed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_CATEGORY: &str = "Other";
pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl Default for BillingCycle {
    fn default() -> Self {
        BillingCycle::Monthly
    }
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "Monthly",
            BillingCycle::Yearly => "Yearly",
        }
    }

    /// Strict parse used at the input boundary. Case and surrounding whitespace are ignored.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(BillingCycle::Monthly),
            "yearly" | "annual" | "annually" => Ok(BillingCycle::Yearly),
            _ => Err(ValidationError::UnknownBillingCycle(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub service_name: String,
    pub category: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: Option<NaiveDate>,
    pub is_active: bool,
    pub payment_method: String,
    pub notes: Option<String>,
    pub usage_percentage: Option<f64>,
    pub is_essential: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Build a fresh active record from validated input; id and timestamps are generated here.
    pub fn from_input(input: SubscriptionInput, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            service_name: input.service_name,
            category: input.category,
            amount: input.amount,
            currency: input.currency,
            billing_cycle: input.billing_cycle,
            next_billing_date: input.next_billing_date,
            is_active: true,
            payment_method: input.payment_method,
            notes: input.notes,
            usage_percentage: input.usage_percentage,
            is_essential: input.is_essential,
            created_at: now,
            updated_at: now,
        }
    }

    /// Category used for grouping; blank or missing labels fall into "Other".
    pub fn category_label(&self) -> &str {
        match self.category.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label,
            _ => DEFAULT_CATEGORY,
        }
    }

    /// A record with a known usage below `threshold_pct` that is not marked essential.
    pub fn is_underused(&self, threshold_pct: f64) -> bool {
        !self.is_essential
            && self
                .usage_percentage
                .map(|usage| usage < threshold_pct)
                .unwrap_or(false)
    }
}

/// Validated fields for creating or updating a subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInput {
    pub name: String,
    pub service_name: String,
    pub category: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: Option<NaiveDate>,
    pub payment_method: String,
    pub notes: Option<String>,
    pub usage_percentage: Option<f64>,
    pub is_essential: bool,
}

impl SubscriptionInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_name(&self.name)?;
        validation::validate_amount(self.amount)?;
        validation::validate_currency(&self.currency)?;
        if let Some(usage) = self.usage_percentage {
            validation::validate_usage(usage)?;
        }
        Ok(())
    }
}

/// Raw form fields, as typed by a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionForm {
    pub name: String,
    pub service_name: String,
    pub category: String,
    pub amount: String,
    pub currency: String,
    pub billing_cycle: String,
    pub next_billing_date: String,
    pub payment_method: String,
    pub notes: String,
    pub usage_percentage: String,
    pub is_essential: bool,
}

impl SubscriptionForm {
    /// Parse and validate the form. `default_currency` fills a blank currency field.
    pub fn parse(&self, default_currency: &str) -> Result<SubscriptionInput, ValidationError> {
        let currency = match self.currency.trim() {
            "" => default_currency.to_string(),
            code => code.to_string(),
        };

        let input = SubscriptionInput {
            name: self.name.trim().to_string(),
            service_name: self.service_name.trim().to_string(),
            category: non_blank(&self.category),
            amount: validation::parse_amount(&self.amount)?,
            currency,
            billing_cycle: BillingCycle::parse(&self.billing_cycle)?,
            next_billing_date: validation::parse_optional_date(&self.next_billing_date)?,
            payment_method: self.payment_method.trim().to_string(),
            notes: non_blank(&self.notes),
            usage_percentage: validation::parse_optional_usage(&self.usage_percentage)?,
            is_essential: self.is_essential,
        };

        input.validate()?;
        Ok(input)
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Boundary checks for subscription fields
pub mod validation {
    use chrono::NaiveDate;

    use crate::error::ValidationError;

    pub fn validate_name(name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }

    pub fn validate_amount(amount: f64) -> Result<(), ValidationError> {
        if !amount.is_finite() {
            return Err(ValidationError::NonFiniteAmount);
        }
        if amount < 0.0 {
            return Err(ValidationError::NegativeAmount(amount));
        }
        Ok(())
    }

    pub fn validate_currency(code: &str) -> Result<(), ValidationError> {
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency(code.to_string()));
        }
        Ok(())
    }

    pub fn validate_usage(usage: f64) -> Result<(), ValidationError> {
        if !usage.is_finite() || !(0.0..=100.0).contains(&usage) {
            return Err(ValidationError::UsageOutOfRange(usage));
        }
        Ok(())
    }

    /// Accepts plain decimals with an optional leading `$` and thousands separators.
    pub fn parse_amount(raw: &str) -> Result<f64, ValidationError> {
        let cleaned: String = raw
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();

        let amount: f64 = cleaned
            .parse()
            .map_err(|_| ValidationError::UnparseableAmount(raw.to_string()))?;
        validate_amount(amount)?;
        Ok(amount)
    }

    pub fn parse_optional_date(raw: &str) -> Result<Option<NaiveDate>, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
    }

    pub fn parse_optional_usage(raw: &str) -> Result<Option<f64>, ValidationError> {
        let trimmed = raw.trim().trim_end_matches('%');
        if trimmed.is_empty() {
            return Ok(None);
        }
        let usage: f64 = trimmed
            .parse()
            .map_err(|_| ValidationError::UnparseableUsage(raw.to_string()))?;
        validate_usage(usage)?;
        Ok(Some(usage))
    }
}
