mod collector;
mod page;
mod snapshot;
mod types;
mod wait;

pub use collector::{CachePolicy, CollectorSettings, ContentCollector, FileTokenCache};
pub use page::{AssistantMessage, FileRef, FileView, PageError, PageSession, PanelState, UserMessage};
pub use snapshot::{PageSnapshot, SnapshotAssistant, SnapshotFile, StaticPage};
pub use types::{CollectError, CollectIssue, Collection};
pub use wait::{StabilityProbe, WaitPolicy, wait_for};
