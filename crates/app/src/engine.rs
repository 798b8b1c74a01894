use std::sync::Arc;

use chrono::{DateTime, Utc};
use counter_collector::{CollectError, CollectIssue, Collection, ContentCollector, PageSession};
use counter_core::{CharRatioEstimator, Estimator, TurnTally, UnitContent};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;

use crate::display::UsageDisplay;
use crate::error::{AppError, Result};
use crate::services::CounterService;
use crate::session::SessionState;

/// Stage of the pass currently running, `Idle` between passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassState {
    Idle,
    Collecting,
    Estimating,
    Merging,
    Persisted,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    pub model: String,
    pub tally: TurnTally,
    pub total: u64,
    pub reset_at: DateTime<Utc>,
    pub issues: Vec<CollectIssue>,
}

/// Runs counting passes and owns the session's running totals.
pub struct AccountingEngine {
    collector: ContentCollector,
    counters: CounterService,
    estimator: Arc<dyn Estimator>,
    output_multiplier: u64,
    display: Arc<dyn UsageDisplay>,
    session: Mutex<SessionState>,
    state: watch::Sender<PassState>,
}

impl AccountingEngine {
    pub fn new(
        collector: ContentCollector,
        counters: CounterService,
        output_multiplier: u64,
        display: Arc<dyn UsageDisplay>,
        model: &str,
    ) -> Self {
        let (state, _) = watch::channel(PassState::Idle);
        Self {
            collector,
            counters,
            estimator: Arc::new(CharRatioEstimator),
            output_multiplier,
            display,
            session: Mutex::new(SessionState::new(model)),
            state,
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn Estimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<PassState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PassState {
        *self.state.borrow()
    }

    pub async fn session(&self) -> SessionState {
        self.session.lock().await.clone()
    }

    pub async fn current_model(&self) -> String {
        self.session.lock().await.current_model.clone()
    }

    /// Reloads the stored total for the session model and redraws.
    pub async fn load_session(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        session.total = self.counters.load(&session.current_model)?.total;
        let snapshot = self
            .counters
            .snapshot(&session.current_model, session.last_turn)?;
        drop(session);
        self.display.render(&snapshot);
        Ok(())
    }

    /// Switches the session to `model`. Returns false when it already was.
    pub async fn switch_model(&self, model: &str) -> Result<bool> {
        let mut session = self.session.lock().await;
        if session.current_model == model {
            return Ok(false);
        }
        tracing::info!(from = %session.current_model, to = %model, "model changed");
        let load = self.counters.load(model)?;
        session.switch_to(model, load.total);
        let snapshot = self.counters.snapshot(model, 0)?;
        drop(session);
        self.display.render(&snapshot);
        Ok(true)
    }

    /// Runs a pass charged to the session's current model.
    pub async fn run_pass(
        &self,
        page: &dyn PageSession,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome> {
        let model = self.current_model().await;
        self.run_pass_for(&model, page, cancel).await
    }

    /// Runs a pass charged to `model`, whatever the session switches to
    /// while it runs.
    pub async fn run_pass_for(
        &self,
        model: &str,
        page: &dyn PageSession,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome> {
        let result = self.run_stages(model, page, cancel).await;
        self.state.send_replace(PassState::Idle);
        match &result {
            Ok(outcome) => tracing::info!(
                model = %outcome.model,
                tally = outcome.tally.tokens,
                total = outcome.total,
                reset_at = %outcome.reset_at,
                "pass complete"
            ),
            Err(AppError::Cancelled) => tracing::debug!("pass cancelled"),
            Err(err) => tracing::warn!(error = %err, "pass aborted"),
        }
        result
    }

    async fn run_stages(
        &self,
        model: &str,
        page: &dyn PageSession,
        cancel: &CancellationToken,
    ) -> Result<PassOutcome> {
        self.enter(PassState::Collecting);
        let collection = match self.collector.collect(page, cancel).await {
            Ok(collection) => collection,
            Err(CollectError::Cancelled) => return Err(AppError::Cancelled),
        };

        self.enter(PassState::Estimating);
        let tally = self.estimate(&collection);
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        self.cache_file_estimates(&collection);

        self.enter(PassState::Merging);
        let load = self.counters.load(model)?;
        let total = if load.initialized {
            load.total.saturating_add(tally.tokens)
        } else {
            tally.tokens
        };
        tracing::debug!(
            model = %model,
            loaded = load.total,
            initialized = load.initialized,
            tally = tally.tokens,
            "merging"
        );

        let record = self.counters.save(model, total)?;
        self.enter(PassState::Persisted);

        let mut session = self.session.lock().await;
        if session.current_model == model {
            session.total = record.total;
            session.last_turn = tally.tokens;
        }
        let snapshot = self
            .counters
            .snapshot(&session.current_model, session.last_turn)?;
        drop(session);
        self.display.render(&snapshot);

        Ok(PassOutcome {
            model: model.to_string(),
            tally,
            total: record.total,
            reset_at: record.reset_at,
            issues: collection.issues,
        })
    }

    fn enter(&self, state: PassState) {
        tracing::debug!(?state, "pass state");
        self.state.send_replace(state);
    }

    pub fn estimate(&self, collection: &Collection) -> TurnTally {
        let mut tally = TurnTally::default();
        for unit in &collection.units {
            let tokens = self.unit_tokens(&unit.content);
            let weighted = tokens.saturating_mul(unit.kind.weight(self.output_multiplier));
            tracing::debug!(kind = unit.kind.as_str(), tokens, weighted, "unit");
            tally.add(unit.kind, weighted);
        }
        tally
    }

    fn unit_tokens(&self, content: &UnitContent) -> u64 {
        match content {
            UnitContent::Text(text) => self.estimator.estimate(text),
            UnitContent::Tokens(tokens) => *tokens,
        }
    }

    fn cache_file_estimates(&self, collection: &Collection) {
        for unit in &collection.units {
            let (Some(key), UnitContent::Text(text)) = (&unit.cache_key, &unit.content) else {
                continue;
            };
            let tokens = self.estimator.estimate(text);
            if tokens == 0 {
                continue;
            }
            if let Err(err) = self.counters.save_file_tokens(key, tokens) {
                tracing::warn!(file = %key.filename, error = %err, "failed to cache file estimate");
            }
        }
    }
}
