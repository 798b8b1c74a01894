use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use counter_core::{ContentUnit, FileCacheKey, FileScope, UnitKind};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::page::{AssistantMessage, FileRef, FileView, PageError, PageSession, UserMessage};
use crate::types::{CollectError, Collection};
use crate::wait::{StabilityProbe, WaitPolicy, wait_for};

/// How cached file estimates are used.
///
/// `Refresh` always extracts live content so counts follow what is on the
/// page; estimates are still written back by the caller. `PreferCache` skips
/// extraction for any file that already has an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    #[default]
    Refresh,
    PreferCache,
}

pub trait FileTokenCache: Send + Sync {
    fn lookup(&self, key: &FileCacheKey) -> Option<u64>;
}

#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub element_wait: WaitPolicy,
    pub modal_wait: WaitPolicy,
    pub panel_wait: WaitPolicy,
    pub panel_settle: Duration,
    pub after_close_pause: Duration,
    pub final_output: StabilityProbe,
    pub cache_policy: CachePolicy,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            element_wait: WaitPolicy::fixed(5, Duration::from_millis(100)),
            modal_wait: WaitPolicy::fixed(5, Duration::from_millis(200)),
            panel_wait: WaitPolicy::fixed(5, Duration::from_millis(100)),
            panel_settle: Duration::from_secs(1),
            after_close_pause: Duration::from_millis(200),
            final_output: StabilityProbe::default(),
            cache_policy: CachePolicy::Refresh,
        }
    }
}

/// Gathers the chargeable units currently rendered on a page.
#[derive(Clone)]
pub struct ContentCollector {
    settings: CollectorSettings,
    cache: Option<Arc<dyn FileTokenCache>>,
}

impl ContentCollector {
    pub fn new(settings: CollectorSettings) -> Self {
        Self {
            settings,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn FileTokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    /// Collects every unit on the page. On cancellation any panel or file
    /// view opened by this run is closed again before returning.
    pub async fn collect(
        &self,
        page: &dyn PageSession,
        cancel: &CancellationToken,
    ) -> Result<Collection, CollectError> {
        let mut collection = Collection::default();
        let held = self.collect_units(page, cancel, &mut collection).await;
        self.close_project_panel(page, &mut collection).await;
        let held = held?;

        match self.await_final_output(page, cancel).await {
            Some((index, text)) => {
                if let Some((held_index, held_text)) = held
                    && held_index != index
                {
                    collection.push(ContentUnit::text(UnitKind::Assistant, held_text));
                }
                collection.push(ContentUnit::text(UnitKind::FinalOutput, text));
            }
            None if cancel.is_cancelled() => return Err(CollectError::Cancelled),
            None => {
                if let Some((index, text)) = held {
                    tracing::debug!(index, "counting held message as intermediate");
                    collection.push(ContentUnit::text(UnitKind::Assistant, text));
                }
                collection.issue("final output", "no complete response within timeout");
            }
        }
        Ok(collection)
    }

    /// Messages and files. Returns the assistant message held back as the
    /// final output candidate.
    async fn collect_units(
        &self,
        page: &dyn PageSession,
        cancel: &CancellationToken,
        collection: &mut Collection,
    ) -> Result<Option<(usize, String)>, CollectError> {
        check(cancel)?;
        collection.conversation_id = match page.conversation_id().await {
            Ok(value) => value,
            Err(err) => {
                collection.issue("conversation", err.to_string());
                None
            }
        };

        let users = page.user_messages().await.unwrap_or_else(|err| {
            collection.issue("user messages", err.to_string());
            Vec::new()
        });
        let assistants = page.assistant_messages().await.unwrap_or_else(|err| {
            collection.issue("assistant messages", err.to_string());
            Vec::new()
        });
        tracing::debug!(
            users = users.len(),
            assistants = assistants.len(),
            "found messages"
        );

        for message in &users {
            collection.push(ContentUnit::text(UnitKind::User, message.text.clone()));
        }

        let candidate = final_candidate(&users, &assistants);
        let mut held = None;
        for (index, message) in assistants.iter().enumerate() {
            if Some(index) == candidate {
                tracing::debug!(index, "holding back final output");
                held = Some((index, message.text.clone()));
                continue;
            }
            if message.streaming {
                tracing::debug!(index, "skipping streaming message");
                continue;
            }
            collection.push(ContentUnit::text(UnitKind::Assistant, message.text.clone()));
        }

        let conversation_id = collection.conversation_id.clone();
        let mut seen = HashSet::new();
        if self.ensure_project_panel(page, cancel, collection).await? {
            let files = page.project_files().await.unwrap_or_else(|err| {
                collection.issue("project files", err.to_string());
                Vec::new()
            });
            for file in files {
                check(cancel)?;
                if !seen.insert(file.id.clone()) {
                    continue;
                }
                let result = self
                    .file_unit(page, cancel, conversation_id.as_deref(), &file, FileScope::Project)
                    .await;
                check(cancel)?;
                self.record_file(collection, &file, result);
            }
        }

        check(cancel)?;
        let attachments = page.attachments().await.unwrap_or_else(|err| {
            collection.issue("attachments", err.to_string());
            Vec::new()
        });
        for file in attachments {
            check(cancel)?;
            if !seen.insert(file.id.clone()) {
                continue;
            }
            let result = self
                .file_unit(page, cancel, conversation_id.as_deref(), &file, FileScope::Content)
                .await;
            check(cancel)?;
            self.record_file(collection, &file, result);
        }
        Ok(held)
    }

    async fn ensure_project_panel(
        &self,
        page: &dyn PageSession,
        cancel: &CancellationToken,
        collection: &mut Collection,
    ) -> Result<bool, CollectError> {
        match page.project_panel().await {
            Ok(state) if state.present && state.processed => {
                tracing::debug!("project panel already processed");
                return Ok(true);
            }
            Ok(_) => {}
            Err(err) => {
                collection.issue("project panel", err.to_string());
                return Ok(false);
            }
        }
        if let Err(err) = page.open_project_panel().await {
            collection.issue("project panel", err.to_string());
            return Ok(false);
        }
        let visible = until_cancelled(
            cancel,
            wait_for(&self.settings.panel_wait, move || async move {
                page.project_panel()
                    .await
                    .ok()
                    .filter(|state| state.present && state.visible)
            }),
        )
        .await;
        check(cancel)?;
        if visible.is_none() {
            collection.issue("project panel", "panel did not become visible");
            return Ok(false);
        }
        if let Err(err) = page.mark_project_panel_processed().await {
            collection.issue("project panel", err.to_string());
        }
        pause(cancel, self.settings.panel_settle).await;
        check(cancel)?;
        if let Err(err) = page.close_file_preview().await {
            collection.issue("file preview", err.to_string());
        }
        Ok(true)
    }

    async fn close_project_panel(&self, page: &dyn PageSession, collection: &mut Collection) {
        let visible = matches!(page.project_panel().await, Ok(state) if state.visible);
        if visible && let Err(err) = page.close_project_panel().await {
            collection.issue("project panel", err.to_string());
        }
    }

    async fn file_unit(
        &self,
        page: &dyn PageSession,
        cancel: &CancellationToken,
        conversation_id: Option<&str>,
        file: &FileRef,
        scope: FileScope,
    ) -> Result<Option<ContentUnit>, PageError> {
        let Some(name) = file.name.as_deref() else {
            return Err(PageError::MissingElement(format!(
                "file container for {}",
                file.id
            )));
        };
        let kind = match scope {
            FileScope::Project => UnitKind::ProjectFile,
            FileScope::Content => UnitKind::Attachment,
        };
        let key = FileCacheKey::new(conversation_id, scope, name);
        if self.settings.cache_policy == CachePolicy::PreferCache
            && let Some(tokens) = self.cache.as_ref().and_then(|cache| cache.lookup(&key))
        {
            tracing::debug!(file = name, tokens, "using cached file estimate");
            return Ok(Some(ContentUnit::file_tokens(kind, key, tokens)));
        }

        tracing::debug!(file = name, scope = scope.as_str(), "extracting file content");
        page.open_file(file).await?;
        let view = match scope {
            // Project files open in a modal; make sure it is the right one.
            FileScope::Project => {
                until_cancelled(
                    cancel,
                    wait_for(&self.settings.modal_wait, move || async move {
                        current_view(page)
                            .await
                            .filter(|view| view.title.as_deref() == Some(name))
                    }),
                )
                .await
            }
            FileScope::Content => {
                until_cancelled(
                    cancel,
                    wait_for(&self.settings.element_wait, move || async move {
                        current_view(page).await
                    }),
                )
                .await
            }
        };
        if let Err(err) = page.close_file(file).await {
            tracing::warn!(file = name, error = %err, "failed to close file view");
        }
        if scope == FileScope::Project && !cancel.is_cancelled() {
            sleep(self.settings.after_close_pause).await;
        }
        let Some(view) = view else {
            return Err(PageError::MissingElement(format!("file view for {name}")));
        };
        match view.content {
            Some(text) => Ok(Some(ContentUnit::file_text(kind, key, text))),
            None => Err(PageError::MissingElement(format!("file content for {name}"))),
        }
    }

    fn record_file(
        &self,
        collection: &mut Collection,
        file: &FileRef,
        result: Result<Option<ContentUnit>, PageError>,
    ) {
        match result {
            Ok(Some(unit)) => collection.push(unit),
            Ok(None) => {}
            Err(err) => {
                let label = file.name.clone().unwrap_or_else(|| file.id.clone());
                collection.issue(label, err.to_string());
            }
        }
    }

    async fn await_final_output(
        &self,
        page: &dyn PageSession,
        cancel: &CancellationToken,
    ) -> Option<(usize, String)> {
        tracing::debug!("waiting for final output");
        until_cancelled(
            cancel,
            self.settings.final_output.observe(move || async move {
                let users = page.user_messages().await.ok()?;
                let assistants = page.assistant_messages().await.ok()?;
                settled_output(&users, &assistants)
            }),
        )
        .await
    }
}

fn check(cancel: &CancellationToken) -> Result<(), CollectError> {
    if cancel.is_cancelled() {
        return Err(CollectError::Cancelled);
    }
    Ok(())
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    wait: impl Future<Output = Option<T>>,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        value = wait => value,
    }
}

async fn pause(cancel: &CancellationToken, duration: Duration) {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {}
        _ = sleep(duration) => {}
    }
}

async fn current_view(page: &dyn PageSession) -> Option<FileView> {
    page.file_view().await.ok().flatten()
}

/// Index of the last assistant message when it already looks final.
fn final_candidate(users: &[UserMessage], assistants: &[AssistantMessage]) -> Option<usize> {
    let last = assistants.len().checked_sub(1)?;
    if assistants.len() >= users.len() && !assistants[last].streaming {
        Some(last)
    } else {
        None
    }
}

/// Index and text of the last assistant message, provided every assistant
/// message finished streaming.
fn settled_output(users: &[UserMessage], assistants: &[AssistantMessage]) -> Option<(usize, String)> {
    let last = assistants.len().checked_sub(1)?;
    if assistants.len() < users.len() || assistants.iter().any(|message| message.streaming) {
        return None;
    }
    Some((last, assistants[last].text.clone()))
}
