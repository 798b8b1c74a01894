use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod estimator;
mod usage;
mod window;

pub use estimator::{CharRatioEstimator, Estimator, estimate_tokens};
pub use usage::{ModelUsage, UsageSnapshot, format_time_remaining};
pub use window::{
    Clock, FixedClock, SystemClock, WINDOW_HOURS, is_expired, window_reset_at,
};

/// Identifier used when the page does not expose a model name.
pub const DEFAULT_MODEL: &str = "default";

pub const DEFAULT_OUTPUT_MULTIPLIER: u64 = 10;

/// Per-model token quotas with a fallback for unrecognized identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelQuotas {
    pub default: u64,
    pub models: BTreeMap<String, u64>,
}

impl Default for ModelQuotas {
    fn default() -> Self {
        let mut models = BTreeMap::new();
        models.insert("3 Opus".to_string(), 1_500_000);
        models.insert("3.5 Sonnet (New)".to_string(), 2_500_000);
        models.insert("3 Haiku".to_string(), 4_000_000);
        Self {
            default: 2_500_000,
            models,
        }
    }
}

impl ModelQuotas {
    pub fn quota_for(&self, model: &str) -> u64 {
        self.models.get(model).copied().unwrap_or(self.default)
    }
}

/// Category of a chargeable item; decides its weight multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    User,
    Assistant,
    FinalOutput,
    ProjectFile,
    Attachment,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::User => "user",
            UnitKind::Assistant => "assistant",
            UnitKind::FinalOutput => "final_output",
            UnitKind::ProjectFile => "project_file",
            UnitKind::Attachment => "attachment",
        }
    }

    /// Only the final assistant output is weighted; everything else counts once.
    pub fn weight(&self, output_multiplier: u64) -> u64 {
        match self {
            UnitKind::FinalOutput => output_multiplier,
            _ => 1,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, UnitKind::ProjectFile | UnitKind::Attachment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileScope {
    Content,
    Project,
}

impl FileScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileScope::Content => "content",
            FileScope::Project => "project",
        }
    }
}

/// Identifies a cached file estimate: conversation, scope and file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileCacheKey {
    pub conversation_id: Option<String>,
    pub scope: FileScope,
    pub filename: String,
}

impl FileCacheKey {
    pub fn new(conversation_id: Option<&str>, scope: FileScope, filename: &str) -> Self {
        Self {
            conversation_id: conversation_id.map(str::to_string),
            scope,
            filename: filename.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitContent {
    Text(String),
    Tokens(u64),
}

/// One chargeable item discovered during a counting pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub kind: UnitKind,
    pub content: UnitContent,
    pub cache_key: Option<FileCacheKey>,
}

impl ContentUnit {
    pub fn text(kind: UnitKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            content: UnitContent::Text(text.into()),
            cache_key: None,
        }
    }

    pub fn file_text(kind: UnitKind, key: FileCacheKey, text: impl Into<String>) -> Self {
        Self {
            kind,
            content: UnitContent::Text(text.into()),
            cache_key: Some(key),
        }
    }

    pub fn file_tokens(kind: UnitKind, key: FileCacheKey, tokens: u64) -> Self {
        Self {
            kind,
            content: UnitContent::Tokens(tokens),
            cache_key: Some(key),
        }
    }
}

/// Stored usage for one model. `reset_at` is the end of the window `total` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub total: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub reset_at: DateTime<Utc>,
}

impl CounterRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.reset_at, now)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterLoad {
    pub total: u64,
    pub initialized: bool,
}

/// Weighted token sum for a single counting pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TurnTally {
    pub tokens: u64,
    pub units: usize,
    pub by_kind: BTreeMap<UnitKind, u64>,
}

impl TurnTally {
    pub fn add(&mut self, kind: UnitKind, weighted_tokens: u64) {
        self.tokens = self.tokens.saturating_add(weighted_tokens);
        self.units += 1;
        let entry = self.by_kind.entry(kind).or_default();
        *entry = entry.saturating_add(weighted_tokens);
    }

    pub fn tokens_for(&self, kind: UnitKind) -> u64 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn quotas_fall_back_to_default() {
        let quotas = ModelQuotas::default();
        assert_eq!(quotas.quota_for("3 Opus"), 1_500_000);
        assert_eq!(quotas.quota_for("3 Haiku"), 4_000_000);
        assert_eq!(quotas.quota_for("something new"), 2_500_000);
    }

    #[test]
    fn only_final_output_is_weighted() {
        assert_eq!(UnitKind::FinalOutput.weight(10), 10);
        assert_eq!(UnitKind::User.weight(10), 1);
        assert_eq!(UnitKind::Assistant.weight(10), 1);
        assert_eq!(UnitKind::ProjectFile.weight(10), 1);
        assert_eq!(UnitKind::Attachment.weight(10), 1);
    }

    #[test]
    fn tally_tracks_kinds() {
        let mut tally = TurnTally::default();
        tally.add(UnitKind::User, 12);
        tally.add(UnitKind::FinalOutput, 60);
        tally.add(UnitKind::User, 3);
        assert_eq!(tally.tokens, 75);
        assert_eq!(tally.units, 3);
        assert_eq!(tally.tokens_for(UnitKind::User), 15);
        assert_eq!(tally.tokens_for(UnitKind::Attachment), 0);
    }

    #[test]
    fn counter_record_serializes_reset_as_millis() {
        let reset_at = Utc.with_ymd_and_hms(2025, 1, 1, 19, 0, 0).unwrap();
        let record = CounterRecord {
            total: 72,
            reset_at,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, format!(r#"{{"total":72,"reset_at":{}}}"#, reset_at.timestamp_millis()));
        let parsed: CounterRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
