pub mod advisor;
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod settings;
pub mod subscriptions;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};

use advisor::{AdvisorController, MockAdvisor};
use analytics::HealthThresholds;
use config::AppConfig;
use db::Database;
use db::models::{Subscription, SubscriptionForm};
use error::SubscriptionResult;
use settings::{Preferences, SettingsStore};
use subscriptions::{DashboardState, SubscriptionController};

/// Everything a front end needs, wired together once at startup.
pub struct App {
    pub config: AppConfig,
    pub db: Database,
    pub settings: SettingsStore,
    pub subscriptions: SubscriptionController,
    pub advisor: AdvisorController,
}

impl App {
    pub fn open(config: AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data directory {}", config.data_dir.display())
        })?;

        let db = Database::new(config.database_path())?;
        let settings = SettingsStore::new(config.settings_path())?;

        let thresholds =
            HealthThresholds::default().with_monthly_budget(settings.preferences().budget());
        let advisor = AdvisorController::new(Arc::new(
            MockAdvisor::new(config.advisor_delay).with_thresholds(thresholds.clone()),
        ));
        let subscriptions = SubscriptionController::new(Arc::new(db.clone()), thresholds);

        Ok(Self {
            config,
            db,
            settings,
            subscriptions,
            advisor,
        })
    }

    /// Persists new preferences, then rescores the dashboard against the new budget.
    pub async fn update_preferences(&self, preferences: Preferences) -> Result<DashboardState> {
        let budget = preferences.budget();
        self.settings.update_preferences(preferences)?;

        let thresholds = self.subscriptions.thresholds().await.with_monthly_budget(budget);
        Ok(self.subscriptions.set_thresholds(thresholds).await)
    }

    /// Adds a record from raw form text; a blank currency falls back to the preferred one.
    pub async fn add_form(&self, form: &SubscriptionForm) -> SubscriptionResult<Subscription> {
        let currency = self.settings.preferences().currency;
        self.subscriptions.add_form(form, &currency).await
    }
}

fn log_dashboard(state: &DashboardState) {
    let aggregation = &state.aggregation;
    log::info!(
        "{} subscriptions ({} active): {:.2}/month, {:.2}/year",
        state.subscriptions.len(),
        aggregation.active_count,
        aggregation.total_monthly_cost,
        aggregation.total_yearly_cost
    );
    for renewal in &aggregation.upcoming_renewals {
        log::info!(
            "upcoming renewal: {} on {}",
            renewal.name,
            db::helpers::format_optional_date(renewal.next_billing_date).unwrap_or_default()
        );
    }
    for category in aggregation.categories_by_spend() {
        log::info!(
            "category {}: {:.2}/month across {}",
            category.category,
            category.monthly_total,
            category.subscription_count
        );
    }

    let health = &state.health;
    log::info!(
        "health score {} with {:.2}/month in potential savings",
        health.health_score,
        health.monthly_savings_estimate
    );
    for insight in &health.insights {
        log::info!("insight [{:?}] {}: {}", insight.impact, insight.title, insight.description);
    }
    for rec in &health.recommendations {
        log::info!(
            "recommendation [{:?}] {}: saves {:.2}/year",
            rec.difficulty,
            rec.title,
            rec.estimated_annual_savings
        );
    }
}

pub fn run() -> Result<()> {
    let config = AppConfig::from_env()?;

    // RUST_LOG still wins over the debug flag
    let level = if config.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    log::info!("subtrack starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let app = App::open(config)?;

        let dashboard = app.subscriptions.load().await?;
        log_dashboard(&dashboard);

        app.advisor.start_analysis(dashboard.subscriptions).await;
        let advisor_state = app.advisor.wait_until_idle().await;
        match (advisor_state.analysis, advisor_state.last_error) {
            (_, Some(err)) => log::warn!("advisor failed: {err}"),
            (Some(analysis), None) => {
                log::info!("advisor health score {}", analysis.health_score);
                for insight in &analysis.insights {
                    log::info!("advisor insight: {}", insight.description);
                }
            }
            (None, None) => log::info!("advisor produced no analysis"),
        }

        Ok::<(), anyhow::Error>(())
    })?;

    log::info!("subtrack finished");
    Ok(())
}
