use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::analytics::{
    compute_aggregation_today, compute_health_assessment, AggregationResult, HealthAssessment,
    HealthThresholds,
};
use crate::db::models::{Subscription, SubscriptionForm, SubscriptionInput};
use crate::db::SubscriptionStore;
use crate::error::{SubscriptionError, SubscriptionResult};

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_error, log_info};

/// Immutable snapshot published after every successful write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub subscriptions: Vec<Subscription>,
    pub aggregation: AggregationResult,
    pub health: HealthAssessment,
}

impl DashboardState {
    fn compute(subscriptions: Vec<Subscription>, thresholds: &HealthThresholds) -> Self {
        let aggregation = compute_aggregation_today(&subscriptions);
        let health = compute_health_assessment(&aggregation, &subscriptions, thresholds);
        Self {
            subscriptions,
            aggregation,
            health,
        }
    }
}

/// Owns the store handle and recomputes the dashboard after each write.
///
/// Writes are serialized through `thresholds`, so snapshots are published in the order the
/// writes reached the store.
#[derive(Clone)]
pub struct SubscriptionController {
    store: Arc<dyn SubscriptionStore>,
    thresholds: Arc<Mutex<HealthThresholds>>,
    state_tx: Arc<watch::Sender<DashboardState>>,
}

fn store_failure(operation: &str, err: anyhow::Error) -> SubscriptionError {
    log_error!("{operation} failed: {err:#}");
    SubscriptionError::Store(err)
}

impl SubscriptionController {
    pub fn new(store: Arc<dyn SubscriptionStore>, thresholds: HealthThresholds) -> Self {
        let (state_tx, _) = watch::channel(DashboardState::default());
        Self {
            store,
            thresholds: Arc::new(Mutex::new(thresholds)),
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn state(&self) -> DashboardState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state_tx.subscribe()
    }

    pub async fn thresholds(&self) -> HealthThresholds {
        self.thresholds.lock().await.clone()
    }

    /// Reads every record from the store and publishes a fresh snapshot.
    pub async fn load(&self) -> SubscriptionResult<DashboardState> {
        let thresholds = self.thresholds.lock().await;
        self.refresh(&thresholds).await
    }

    async fn refresh(&self, thresholds: &HealthThresholds) -> SubscriptionResult<DashboardState> {
        let records = self
            .store
            .list_all()
            .await
            .map_err(|err| store_failure("loading subscriptions", err))?;

        let state = DashboardState::compute(records, thresholds);
        log_debug!(
            "dashboard refreshed: {} records, {:.2}/month, score {}",
            state.subscriptions.len(),
            state.aggregation.total_monthly_cost,
            state.health.health_score
        );
        self.state_tx.send_replace(state.clone());
        Ok(state)
    }

    pub async fn add(&self, input: SubscriptionInput) -> SubscriptionResult<Subscription> {
        input.validate()?;
        let thresholds = self.thresholds.lock().await;

        let created = self
            .store
            .create(input)
            .await
            .map_err(|err| store_failure("adding subscription", err))?;
        log_info!("added subscription {} ({})", created.name, created.id);

        self.refresh(&thresholds).await?;
        Ok(created)
    }

    /// Parses raw form text, then adds the record.
    pub async fn add_form(
        &self,
        form: &SubscriptionForm,
        default_currency: &str,
    ) -> SubscriptionResult<Subscription> {
        let input = form.parse(default_currency)?;
        self.add(input).await
    }

    pub async fn update(
        &self,
        id: &str,
        input: SubscriptionInput,
    ) -> SubscriptionResult<Subscription> {
        input.validate()?;
        let thresholds = self.thresholds.lock().await;

        let updated = self
            .store
            .update(id, input)
            .await
            .map_err(|err| store_failure("updating subscription", err))?
            .ok_or_else(|| SubscriptionError::NotFound(id.to_string()))?;
        log_info!("updated subscription {}", updated.id);

        self.refresh(&thresholds).await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> SubscriptionResult<()> {
        let thresholds = self.thresholds.lock().await;

        let deleted = self
            .store
            .delete(id)
            .await
            .map_err(|err| store_failure("deleting subscription", err))?;
        if !deleted {
            return Err(SubscriptionError::NotFound(id.to_string()));
        }
        log_info!("deleted subscription {id}");

        self.refresh(&thresholds).await?;
        Ok(())
    }

    pub async fn set_active(&self, id: &str, active: bool) -> SubscriptionResult<Subscription> {
        let thresholds = self.thresholds.lock().await;
        let updated = self.write_active(id, active).await?;
        self.refresh(&thresholds).await?;
        Ok(updated)
    }

    pub async fn toggle_active(&self, id: &str) -> SubscriptionResult<Subscription> {
        let thresholds = self.thresholds.lock().await;

        let current = self
            .store
            .get(id)
            .await
            .map_err(|err| store_failure("reading subscription", err))?
            .ok_or_else(|| SubscriptionError::NotFound(id.to_string()))?;
        let updated = self.write_active(id, !current.is_active).await?;

        self.refresh(&thresholds).await?;
        Ok(updated)
    }

    async fn write_active(&self, id: &str, active: bool) -> SubscriptionResult<Subscription> {
        let updated = self
            .store
            .set_active(id, active)
            .await
            .map_err(|err| store_failure("changing subscription status", err))?
            .ok_or_else(|| SubscriptionError::NotFound(id.to_string()))?;
        log_info!(
            "subscription {} is now {}",
            updated.id,
            if updated.is_active { "active" } else { "inactive" }
        );
        Ok(updated)
    }

    /// Swaps the scoring thresholds and republishes from the current records without a
    /// store round trip.
    pub async fn set_thresholds(&self, thresholds: HealthThresholds) -> DashboardState {
        let mut guard = self.thresholds.lock().await;
        *guard = thresholds;

        let records = self.state_tx.borrow().subscriptions.clone();
        let state = DashboardState::compute(records, &guard);
        self.state_tx.send_replace(state.clone());
        state
    }
}
