use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use counter_collector::PageSession;
use counter_core::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;

use crate::config::CounterConfig;
use crate::engine::{AccountingEngine, PassOutcome};
use crate::error::{AppError, Result};

/// User actions on the page that change what should be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    Send,
    Regenerate,
    EditSave,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEvent::Send => "send",
            TriggerEvent::Regenerate => "regenerate",
            TriggerEvent::EditSave => "edit_save",
        }
    }
}

/// Turns page events into accounting passes. At most one pass is pending at
/// a time: a new trigger cancels the previous one, and passes for the same
/// model never overlap.
pub struct TriggerCoordinator {
    engine: Arc<AccountingEngine>,
    page: Arc<dyn PageSession>,
    settle_delay: Duration,
    new_conversation_delay: Duration,
    model_poll: Duration,
    generation: AtomicU64,
    inflight: Mutex<Option<(u64, CancellationToken)>>,
    model_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TriggerCoordinator {
    pub fn new(
        engine: Arc<AccountingEngine>,
        page: Arc<dyn PageSession>,
        config: &CounterConfig,
    ) -> Self {
        Self {
            engine,
            page,
            settle_delay: config.settle_delay(true),
            new_conversation_delay: config.settle_delay(false),
            model_poll: config.model_poll_interval(),
            generation: AtomicU64::new(0),
            inflight: Mutex::new(None),
            model_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<AccountingEngine> {
        &self.engine
    }

    /// Picks up the page's model and shows its stored usage.
    pub async fn initialize(&self) -> Result<()> {
        if !self.check_model().await? {
            self.engine.load_session().await?;
        }
        Ok(())
    }

    /// Compares the page's model with the session's and switches on change.
    pub async fn check_model(&self) -> Result<bool> {
        let model = match self.page.current_model().await {
            Ok(model) => model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read current model");
                return Ok(false);
            }
        };
        self.engine.switch_model(&model).await
    }

    /// Schedules a pass for `event`, cancelling any pass still pending.
    pub async fn handle(self: &Arc<Self>, event: TriggerEvent) -> JoinHandle<Result<PassOutcome>> {
        let cancel = CancellationToken::new();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = self
            .inflight
            .lock()
            .await
            .replace((generation, cancel.clone()));
        if let Some((_, previous)) = previous {
            tracing::debug!(event = event.as_str(), "superseding pending pass");
            previous.cancel();
        }
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let result = coordinator.pass(event, &cancel).await;
            let mut inflight = coordinator.inflight.lock().await;
            if inflight.as_ref().is_some_and(|(current, _)| *current == generation) {
                *inflight = None;
            }
            result
        })
    }

    async fn pass(&self, event: TriggerEvent, cancel: &CancellationToken) -> Result<PassOutcome> {
        let has_conversation = matches!(self.page.conversation_id().await, Ok(Some(_)));
        let delay = if has_conversation {
            self.settle_delay
        } else {
            self.new_conversation_delay
        };
        tracing::debug!(
            event = event.as_str(),
            delay_ms = delay.as_millis() as u64,
            "settling before pass"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            _ = sleep(delay) => {}
        }

        self.check_model().await?;
        let model = self.engine.current_model().await;
        let lock = self.model_lock(&model).await;
        let _guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            guard = lock.lock() => guard,
        };
        self.engine
            .run_pass_for(&model, self.page.as_ref(), cancel)
            .await
    }

    async fn model_lock(&self, model: &str) -> Arc<Mutex<()>> {
        let mut locks = self.model_locks.lock().await;
        Arc::clone(locks.entry(model.to_string()).or_default())
    }

    /// Cancels whatever pass is pending.
    pub async fn cancel_pending(&self) {
        if let Some((_, token)) = self.inflight.lock().await.take() {
            token.cancel();
        }
    }

    /// Drives the coordinator until `shutdown` fires or the event channel closes.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<TriggerEvent>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.initialize().await?;
        let mut ticker = interval(self.model_poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    tracing::info!(event = event.as_str(), "trigger");
                    let handle = self.handle(event).await;
                    tokio::spawn(async move {
                        match handle.await {
                            Ok(Ok(_)) | Ok(Err(AppError::Cancelled)) => {}
                            Ok(Err(err)) => tracing::warn!(error = %err, "pass failed"),
                            Err(err) => tracing::warn!(error = %err, "pass task failed"),
                        }
                    });
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.check_model().await {
                        tracing::warn!(error = %err, "model check failed");
                    }
                }
            }
        }
        self.cancel_pending().await;
        tracing::debug!("coordinator stopped");
        Ok(())
    }
}
