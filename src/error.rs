use thiserror::Error;

/// Malformed user input caught before it reaches the store or the engines.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("subscription name must not be empty")]
    EmptyName,
    #[error("amount must not be negative (got {0})")]
    NegativeAmount(f64),
    #[error("amount must be a finite number")]
    NonFiniteAmount,
    #[error("could not parse amount '{0}'")]
    UnparseableAmount(String),
    #[error("unknown billing cycle '{0}' (expected Monthly or Yearly)")]
    UnknownBillingCycle(String),
    #[error("invalid currency code '{0}' (expected three upper-case letters)")]
    InvalidCurrency(String),
    #[error("usage percentage must be between 0 and 100 (got {0})")]
    UsageOutOfRange(f64),
    #[error("could not parse usage percentage '{0}'")]
    UnparseableUsage(String),
    #[error("invalid next billing date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("monthly budget limit must be a non-negative number (got {0})")]
    InvalidBudget(f64),
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("subscription {0} not found")]
    NotFound(String),
    #[error("store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

pub type SubscriptionResult<T> = std::result::Result<T, SubscriptionError>;
