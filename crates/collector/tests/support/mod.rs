#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use counter_collector::{
    AssistantMessage, FileRef, FileTokenCache, FileView, PageError, PageSession, PageSnapshot,
    PanelState, SnapshotAssistant, SnapshotFile, StaticPage, UserMessage,
};
use counter_core::FileCacheKey;

pub fn snapshot(users: &[&str], assistants: &[(&str, bool)]) -> PageSnapshot {
    PageSnapshot {
        model: Some("3 Opus".to_string()),
        conversation_id: Some("conv-1".to_string()),
        user_messages: users.iter().map(|text| text.to_string()).collect(),
        assistant_messages: assistants
            .iter()
            .map(|(text, streaming)| SnapshotAssistant {
                text: text.to_string(),
                streaming: *streaming,
            })
            .collect(),
        ..PageSnapshot::default()
    }
}

pub fn file(id: &str, name: Option<&str>, content: Option<&str>) -> SnapshotFile {
    SnapshotFile {
        id: Some(id.to_string()),
        name: name.map(str::to_string),
        content: content.map(str::to_string),
    }
}

/// Static page whose trailing assistant message keeps streaming for the first
/// `streaming_polls` reads. The panel toggle can be removed, file views can
/// show a fixed title, and panel/preview actions are counted.
pub struct ScriptedPage {
    pub inner: StaticPage,
    pub streaming_polls: AtomicU32,
    pub panel_toggle_missing: bool,
    pub view_title: Option<String>,
    pub panel_opens: AtomicU32,
    pub preview_closes: AtomicU32,
    pub file_closes: AtomicU32,
}

impl ScriptedPage {
    pub fn new(snapshot: PageSnapshot, streaming_polls: u32) -> Self {
        Self {
            inner: StaticPage::new(snapshot),
            streaming_polls: AtomicU32::new(streaming_polls),
            panel_toggle_missing: false,
            view_title: None,
            panel_opens: AtomicU32::new(0),
            preview_closes: AtomicU32::new(0),
            file_closes: AtomicU32::new(0),
        }
    }

    pub fn count(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSession for ScriptedPage {
    async fn current_model(&self) -> Result<Option<String>, PageError> {
        self.inner.current_model().await
    }

    async fn conversation_id(&self) -> Result<Option<String>, PageError> {
        self.inner.conversation_id().await
    }

    async fn user_messages(&self) -> Result<Vec<UserMessage>, PageError> {
        self.inner.user_messages().await
    }

    async fn assistant_messages(&self) -> Result<Vec<AssistantMessage>, PageError> {
        let mut messages = self.inner.assistant_messages().await?;
        let remaining = self.streaming_polls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.streaming_polls.store(remaining - 1, Ordering::SeqCst);
            if let Some(last) = messages.last_mut() {
                last.streaming = true;
            }
        }
        Ok(messages)
    }

    async fn project_panel(&self) -> Result<PanelState, PageError> {
        self.inner.project_panel().await
    }

    async fn open_project_panel(&self) -> Result<(), PageError> {
        if self.panel_toggle_missing {
            return Err(PageError::MissingElement("panel toggle".to_string()));
        }
        self.panel_opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open_project_panel().await
    }

    async fn mark_project_panel_processed(&self) -> Result<(), PageError> {
        self.inner.mark_project_panel_processed().await
    }

    async fn close_project_panel(&self) -> Result<(), PageError> {
        self.inner.close_project_panel().await
    }

    async fn close_file_preview(&self) -> Result<(), PageError> {
        self.preview_closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close_file_preview().await
    }

    async fn project_files(&self) -> Result<Vec<FileRef>, PageError> {
        self.inner.project_files().await
    }

    async fn attachments(&self) -> Result<Vec<FileRef>, PageError> {
        self.inner.attachments().await
    }

    async fn open_file(&self, file: &FileRef) -> Result<(), PageError> {
        self.inner.open_file(file).await
    }

    async fn file_view(&self) -> Result<Option<FileView>, PageError> {
        let view = self.inner.file_view().await?;
        Ok(view.map(|view| match &self.view_title {
            Some(title) => FileView {
                title: Some(title.clone()),
                ..view
            },
            None => view,
        }))
    }

    async fn close_file(&self, file: &FileRef) -> Result<(), PageError> {
        self.file_closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close_file(file).await
    }
}

/// Serves `first` for the initial assistant read and `later` afterwards.
pub struct GrowingPage {
    pub first: StaticPage,
    pub later: StaticPage,
    pub assistant_reads: AtomicU32,
}

impl GrowingPage {
    pub fn new(first: PageSnapshot, later: PageSnapshot) -> Self {
        Self {
            first: StaticPage::new(first),
            later: StaticPage::new(later),
            assistant_reads: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl PageSession for GrowingPage {
    async fn current_model(&self) -> Result<Option<String>, PageError> {
        self.first.current_model().await
    }

    async fn conversation_id(&self) -> Result<Option<String>, PageError> {
        self.first.conversation_id().await
    }

    async fn user_messages(&self) -> Result<Vec<UserMessage>, PageError> {
        self.first.user_messages().await
    }

    async fn assistant_messages(&self) -> Result<Vec<AssistantMessage>, PageError> {
        if self.assistant_reads.fetch_add(1, Ordering::SeqCst) == 0 {
            self.first.assistant_messages().await
        } else {
            self.later.assistant_messages().await
        }
    }

    async fn project_panel(&self) -> Result<PanelState, PageError> {
        self.first.project_panel().await
    }

    async fn open_project_panel(&self) -> Result<(), PageError> {
        self.first.open_project_panel().await
    }

    async fn mark_project_panel_processed(&self) -> Result<(), PageError> {
        self.first.mark_project_panel_processed().await
    }

    async fn close_project_panel(&self) -> Result<(), PageError> {
        self.first.close_project_panel().await
    }

    async fn close_file_preview(&self) -> Result<(), PageError> {
        self.first.close_file_preview().await
    }

    async fn project_files(&self) -> Result<Vec<FileRef>, PageError> {
        self.first.project_files().await
    }

    async fn attachments(&self) -> Result<Vec<FileRef>, PageError> {
        self.first.attachments().await
    }

    async fn open_file(&self, file: &FileRef) -> Result<(), PageError> {
        self.first.open_file(file).await
    }

    async fn file_view(&self) -> Result<Option<FileView>, PageError> {
        self.first.file_view().await
    }

    async fn close_file(&self, file: &FileRef) -> Result<(), PageError> {
        self.first.close_file(file).await
    }
}

#[derive(Default)]
pub struct MemoryCache {
    pub entries: Mutex<HashMap<FileCacheKey, u64>>,
}

impl MemoryCache {
    pub fn with(key: FileCacheKey, tokens: u64) -> Self {
        let cache = Self::default();
        cache.entries.lock().expect("lock").insert(key, tokens);
        cache
    }
}

impl FileTokenCache for MemoryCache {
    fn lookup(&self, key: &FileCacheKey) -> Option<u64> {
        self.entries.lock().expect("lock").get(key).copied()
    }
}
