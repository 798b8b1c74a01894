use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::page::{
    AssistantMessage, FileRef, FileView, PageError, PageSession, PanelState, UserMessage,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotAssistant {
    pub text: String,
    #[serde(default)]
    pub streaming: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Serialized page state, e.g. captured from a browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub user_messages: Vec<String>,
    #[serde(default)]
    pub assistant_messages: Vec<SnapshotAssistant>,
    #[serde(default)]
    pub project_files: Vec<SnapshotFile>,
    #[serde(default)]
    pub attachments: Vec<SnapshotFile>,
}

impl PageSnapshot {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Default)]
struct PageState {
    panel_visible: bool,
    panel_processed: bool,
    open_file: Option<String>,
}

/// `PageSession` over a fixed snapshot. Panel and file views behave like the
/// live page: they must be opened before their content is readable.
#[derive(Debug)]
pub struct StaticPage {
    snapshot: PageSnapshot,
    state: Mutex<PageState>,
}

impl StaticPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self {
            snapshot,
            state: Mutex::new(PageState::default()),
        }
    }

    pub fn snapshot(&self) -> &PageSnapshot {
        &self.snapshot
    }

    fn file_refs(files: &[SnapshotFile], scope: &str) -> Vec<FileRef> {
        files
            .iter()
            .enumerate()
            .map(|(index, file)| FileRef {
                id: file
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{scope}-{index}")),
                name: file.name.clone(),
            })
            .collect()
    }

    fn find_file(&self, id: &str) -> Option<&SnapshotFile> {
        let project = Self::file_refs(&self.snapshot.project_files, "project")
            .into_iter()
            .zip(self.snapshot.project_files.iter());
        let attachments = Self::file_refs(&self.snapshot.attachments, "attachment")
            .into_iter()
            .zip(self.snapshot.attachments.iter());
        project
            .chain(attachments)
            .find(|(file_ref, _)| file_ref.id == id)
            .map(|(_, file)| file)
    }
}

#[async_trait]
impl PageSession for StaticPage {
    async fn current_model(&self) -> Result<Option<String>, PageError> {
        Ok(self.snapshot.model.clone())
    }

    async fn conversation_id(&self) -> Result<Option<String>, PageError> {
        Ok(self.snapshot.conversation_id.clone())
    }

    async fn user_messages(&self) -> Result<Vec<UserMessage>, PageError> {
        Ok(self
            .snapshot
            .user_messages
            .iter()
            .map(|text| UserMessage { text: text.clone() })
            .collect())
    }

    async fn assistant_messages(&self) -> Result<Vec<AssistantMessage>, PageError> {
        Ok(self
            .snapshot
            .assistant_messages
            .iter()
            .map(|message| AssistantMessage {
                text: message.text.clone(),
                streaming: message.streaming,
            })
            .collect())
    }

    async fn project_panel(&self) -> Result<PanelState, PageError> {
        let state = self.state.lock().await;
        Ok(PanelState {
            present: state.panel_visible || state.panel_processed,
            visible: state.panel_visible,
            processed: state.panel_processed,
        })
    }

    async fn open_project_panel(&self) -> Result<(), PageError> {
        self.state.lock().await.panel_visible = true;
        Ok(())
    }

    async fn mark_project_panel_processed(&self) -> Result<(), PageError> {
        self.state.lock().await.panel_processed = true;
        Ok(())
    }

    async fn close_project_panel(&self) -> Result<(), PageError> {
        self.state.lock().await.panel_visible = false;
        Ok(())
    }

    async fn close_file_preview(&self) -> Result<(), PageError> {
        self.state.lock().await.open_file = None;
        Ok(())
    }

    async fn project_files(&self) -> Result<Vec<FileRef>, PageError> {
        if !self.state.lock().await.panel_processed {
            return Ok(Vec::new());
        }
        Ok(Self::file_refs(&self.snapshot.project_files, "project"))
    }

    async fn attachments(&self) -> Result<Vec<FileRef>, PageError> {
        Ok(Self::file_refs(&self.snapshot.attachments, "attachment"))
    }

    async fn open_file(&self, file: &FileRef) -> Result<(), PageError> {
        if self.find_file(&file.id).is_none() {
            return Err(PageError::MissingElement(file.id.clone()));
        }
        self.state.lock().await.open_file = Some(file.id.clone());
        Ok(())
    }

    async fn file_view(&self) -> Result<Option<FileView>, PageError> {
        let state = self.state.lock().await;
        let Some(id) = state.open_file.as_deref() else {
            return Ok(None);
        };
        Ok(self.find_file(id).map(|file| FileView {
            title: file.name.clone(),
            content: file.content.clone(),
        }))
    }

    async fn close_file(&self, _file: &FileRef) -> Result<(), PageError> {
        self.state.lock().await.open_file = None;
        Ok(())
    }
}
