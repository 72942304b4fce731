use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::db::models::Subscription;

use super::{AdvisorAnalysis, AnalysisRequest, Advisor};

const ENABLE_LOGS: bool = true;
use crate::{log_info, log_warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorState {
    pub is_analyzing: bool,
    /// Bumped on every start; only the run holding the current generation may publish.
    pub generation: u64,
    pub analysis: Option<AdvisorAnalysis>,
    pub last_error: Option<String>,
}

struct RunningAnalysis {
    generation: u64,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs at most one advisor analysis at a time. Starting a new run cancels the
/// previous one, and a superseded run never overwrites newer state.
#[derive(Clone)]
pub struct AdvisorController {
    advisor: Arc<dyn Advisor>,
    state_tx: Arc<watch::Sender<AdvisorState>>,
    current: Arc<Mutex<Option<RunningAnalysis>>>,
}

impl AdvisorController {
    pub fn new(advisor: Arc<dyn Advisor>) -> Self {
        let (state_tx, _) = watch::channel(AdvisorState::default());
        Self {
            advisor,
            state_tx: Arc::new(state_tx),
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> AdvisorState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AdvisorState> {
        self.state_tx.subscribe()
    }

    /// Starts analysing a snapshot of `records` and returns the run's generation.
    pub async fn start_analysis(&self, records: Vec<Subscription>) -> u64 {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            log_info!("superseding advisor run {}", previous.generation);
            previous.cancel_token.cancel();
        }

        let mut generation = 0;
        self.state_tx.send_modify(|state| {
            state.generation += 1;
            state.is_analyzing = true;
            state.last_error = None;
            generation = state.generation;
        });

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(run_analysis(
            Arc::clone(&self.advisor),
            Arc::clone(&self.state_tx),
            AnalysisRequest { records },
            generation,
            cancel_token.clone(),
        ));

        *current = Some(RunningAnalysis {
            generation,
            cancel_token,
            handle,
        });
        generation
    }

    /// Cancels the in-flight run, if any. The last published analysis is kept.
    pub async fn cancel(&self) -> Result<()> {
        let running = self.current.lock().await.take();
        let Some(running) = running else {
            return Ok(());
        };

        running.cancel_token.cancel();
        self.state_tx.send_if_modified(|state| {
            if state.generation == running.generation && state.is_analyzing {
                state.is_analyzing = false;
                true
            } else {
                false
            }
        });

        running
            .handle
            .await
            .context("advisor task failed to join")
    }

    /// Waits until no run is in flight and returns the settled state.
    pub async fn wait_until_idle(&self) -> AdvisorState {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.is_analyzing).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }
}

async fn run_analysis(
    advisor: Arc<dyn Advisor>,
    state_tx: Arc<watch::Sender<AdvisorState>>,
    request: AnalysisRequest,
    generation: u64,
    cancel_token: CancellationToken,
) {
    // Run the advisor on its own task so a panic still settles the published state.
    let token = cancel_token.clone();
    let result = match tokio::spawn(async move { advisor.analyze(request, token).await }).await {
        Ok(result) => result,
        Err(join_err) => Err(anyhow!("advisor task failed: {join_err}")),
    };

    // The generation check runs under the channel lock, so it cannot interleave
    // with a concurrent start bumping the generation.
    let published = state_tx.send_if_modified(|state| {
        if state.generation != generation || cancel_token.is_cancelled() {
            return false;
        }
        state.is_analyzing = false;
        match &result {
            Ok(analysis) => state.analysis = Some(analysis.clone()),
            Err(err) => state.last_error = Some(format!("{err:#}")),
        }
        true
    });

    match (&result, published) {
        (Ok(analysis), true) => log_info!(
            "advisor run {generation} finished with health score {}",
            analysis.health_score
        ),
        (Err(err), true) => log_warn!("advisor run {generation} failed: {err:#}"),
        (_, false) => log_info!("discarding result of superseded advisor run {generation}"),
    }
}
