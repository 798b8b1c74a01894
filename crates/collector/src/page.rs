use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("element not found: {0}")]
    MissingElement(String),
    #[error("page action failed: {0}")]
    Action(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub text: String,
    pub streaming: bool,
}

/// Handle to a file thumbnail on the page. `name` is absent when the
/// thumbnail has no labelled container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    pub name: Option<String>,
}

/// Whatever file detail view is currently shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileView {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelState {
    pub present: bool,
    pub visible: bool,
    pub processed: bool,
}

/// Queries and actions the counter needs from the chat page.
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn current_model(&self) -> Result<Option<String>, PageError>;

    async fn conversation_id(&self) -> Result<Option<String>, PageError>;

    /// Rendered user messages, in page order.
    async fn user_messages(&self) -> Result<Vec<UserMessage>, PageError>;

    /// Rendered assistant messages, in page order.
    async fn assistant_messages(&self) -> Result<Vec<AssistantMessage>, PageError>;

    async fn project_panel(&self) -> Result<PanelState, PageError>;

    /// Clicks the panel toggle. Fails when the toggle is missing.
    async fn open_project_panel(&self) -> Result<(), PageError>;

    async fn mark_project_panel_processed(&self) -> Result<(), PageError>;

    /// Dismisses the file preview the panel may open while it loads.
    async fn close_file_preview(&self) -> Result<(), PageError>;

    async fn close_project_panel(&self) -> Result<(), PageError>;

    async fn project_files(&self) -> Result<Vec<FileRef>, PageError>;

    /// Every file thumbnail on the page, project files included.
    async fn attachments(&self) -> Result<Vec<FileRef>, PageError>;

    async fn open_file(&self, file: &FileRef) -> Result<(), PageError>;

    async fn file_view(&self) -> Result<Option<FileView>, PageError>;

    /// Closes the detail view (or navigates back from it).
    async fn close_file(&self, file: &FileRef) -> Result<(), PageError>;
}
