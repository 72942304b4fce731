pub mod subscription;

pub use subscription::{
    BillingCycle, Subscription, SubscriptionForm, SubscriptionInput, DEFAULT_CATEGORY,
    DEFAULT_CURRENCY,
};
