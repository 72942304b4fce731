mod subscriptions;

use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::{Subscription, SubscriptionInput};

/// Persistence seam for subscription records.
///
/// The SQLite `Database` is the production implementation; the controller only ever talks
/// to this trait so the backing store can be swapped out.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// All records ordered by next billing date ascending. Records without a date come last.
    async fn list_all(&self) -> Result<Vec<Subscription>>;

    async fn get(&self, id: &str) -> Result<Option<Subscription>>;

    /// Insert a new active record with a generated id and timestamps.
    async fn create(&self, input: SubscriptionInput) -> Result<Subscription>;

    /// Replace the editable fields of a record. Returns `None` if the id is unknown.
    async fn update(&self, id: &str, input: SubscriptionInput) -> Result<Option<Subscription>>;

    /// Returns true if a record was deleted.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Returns the updated record, or `None` if the id is unknown.
    async fn set_active(&self, id: &str, active: bool) -> Result<Option<Subscription>>;
}
