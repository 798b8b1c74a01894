use counter_core::{ContentUnit, UnitKind};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CollectError {
    #[error("collection cancelled")]
    Cancelled,
}

/// Non-fatal problem met while collecting; the affected unit counted as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectIssue {
    pub unit: String,
    pub message: String,
}

/// Units gathered by one collection run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Collection {
    pub conversation_id: Option<String>,
    pub units: Vec<ContentUnit>,
    pub issues: Vec<CollectIssue>,
}

impl Collection {
    pub(crate) fn push(&mut self, unit: ContentUnit) {
        self.units.push(unit);
    }

    pub(crate) fn issue(&mut self, unit: impl Into<String>, message: impl Into<String>) {
        let unit = unit.into();
        let message = message.into();
        tracing::warn!(unit = %unit, "{}", message);
        self.issues.push(CollectIssue { unit, message });
    }

    pub fn count_of(&self, kind: UnitKind) -> usize {
        self.units.iter().filter(|unit| unit.kind == kind).count()
    }

    pub fn has_final_output(&self) -> bool {
        self.count_of(UnitKind::FinalOutput) > 0
    }
}
