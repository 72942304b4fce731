mod controller;
mod mock;

pub use controller::{AdvisorController, AdvisorState};
pub use mock::MockAdvisor;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::analytics::{Insight, Recommendation};
use crate::db::models::Subscription;

#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub records: Vec<Subscription>,
}

/// Result of one advisor run. Replaces any earlier analysis wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorAnalysis {
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    pub health_score: i32,
}

/// An analysis backend. Implementations should stop early once `cancel` fires; the
/// controller discards late results either way.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn analyze(
        &self,
        request: AnalysisRequest,
        cancel: CancellationToken,
    ) -> Result<AdvisorAnalysis>;
}
