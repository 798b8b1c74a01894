#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use counter_app::{AppState, CounterConfig, UsageDisplay};
use counter_collector::{
    AssistantMessage, FileRef, FileView, PageError, PageSession, PageSnapshot, PanelState,
    SnapshotAssistant, SnapshotFile, StaticPage, UserMessage,
};
use counter_core::{FixedClock, UsageSnapshot};
use tempfile::TempDir;

pub struct TestApp {
    pub _dir: TempDir,
    pub state: AppState,
    pub clock: Arc<FixedClock>,
}

pub fn setup_app(config: CounterConfig, now: DateTime<Utc>) -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("counter.sqlite");
    let clock = Arc::new(FixedClock::new(now));
    let state = AppState::with_clock(db_path, config, clock.clone());
    state.setup_db().expect("setup db");
    TestApp {
        _dir: dir,
        state,
        clock,
    }
}

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, minute, 0)
        .single()
        .expect("valid time")
}

pub fn conversation(user: &str, final_output: &str) -> PageSnapshot {
    PageSnapshot {
        model: Some("3 Opus".to_string()),
        conversation_id: Some("conv-1".to_string()),
        user_messages: vec![user.to_string()],
        assistant_messages: vec![SnapshotAssistant {
            text: final_output.to_string(),
            streaming: false,
        }],
        ..PageSnapshot::default()
    }
}

pub fn attachment(id: &str, name: Option<&str>, content: &str) -> SnapshotFile {
    SnapshotFile {
        id: Some(id.to_string()),
        name: name.map(str::to_string),
        content: Some(content.to_string()),
    }
}

#[derive(Default)]
pub struct RecordingDisplay {
    pub snapshots: Mutex<Vec<UsageSnapshot>>,
}

impl RecordingDisplay {
    pub fn last(&self) -> Option<UsageSnapshot> {
        self.snapshots.lock().expect("lock").last().cloned()
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().expect("lock").len()
    }
}

impl UsageDisplay for RecordingDisplay {
    fn render(&self, snapshot: &UsageSnapshot) {
        self.snapshots.lock().expect("lock").push(snapshot.clone());
    }
}

/// Page whose content can be swapped between passes and whose message
/// queries can be made to fail.
pub struct TestPage {
    inner: Mutex<Arc<StaticPage>>,
    pub fail_user_messages: AtomicBool,
}

impl TestPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self {
            inner: Mutex::new(Arc::new(StaticPage::new(snapshot))),
            fail_user_messages: AtomicBool::new(false),
        }
    }

    pub fn set(&self, snapshot: PageSnapshot) {
        *self.inner.lock().expect("lock") = Arc::new(StaticPage::new(snapshot));
    }

    pub fn set_model(&self, model: &str) {
        let mut snapshot = self.page().snapshot().clone();
        snapshot.model = Some(model.to_string());
        self.set(snapshot);
    }

    fn page(&self) -> Arc<StaticPage> {
        self.inner.lock().expect("lock").clone()
    }
}

#[async_trait]
impl PageSession for TestPage {
    async fn current_model(&self) -> Result<Option<String>, PageError> {
        self.page().current_model().await
    }

    async fn conversation_id(&self) -> Result<Option<String>, PageError> {
        self.page().conversation_id().await
    }

    async fn user_messages(&self) -> Result<Vec<UserMessage>, PageError> {
        if self.fail_user_messages.load(Ordering::SeqCst) {
            return Err(PageError::MissingElement("user messages".to_string()));
        }
        self.page().user_messages().await
    }

    async fn assistant_messages(&self) -> Result<Vec<AssistantMessage>, PageError> {
        self.page().assistant_messages().await
    }

    async fn project_panel(&self) -> Result<PanelState, PageError> {
        self.page().project_panel().await
    }

    async fn open_project_panel(&self) -> Result<(), PageError> {
        self.page().open_project_panel().await
    }

    async fn mark_project_panel_processed(&self) -> Result<(), PageError> {
        self.page().mark_project_panel_processed().await
    }

    async fn close_project_panel(&self) -> Result<(), PageError> {
        self.page().close_project_panel().await
    }

    async fn close_file_preview(&self) -> Result<(), PageError> {
        self.page().close_file_preview().await
    }

    async fn project_files(&self) -> Result<Vec<FileRef>, PageError> {
        self.page().project_files().await
    }

    async fn attachments(&self) -> Result<Vec<FileRef>, PageError> {
        self.page().attachments().await
    }

    async fn open_file(&self, file: &FileRef) -> Result<(), PageError> {
        self.page().open_file(file).await
    }

    async fn file_view(&self) -> Result<Option<FileView>, PageError> {
        self.page().file_view().await
    }

    async fn close_file(&self, file: &FileRef) -> Result<(), PageError> {
        self.page().close_file(file).await
    }
}
