use chrono::{DateTime, Utc};
use serde::Serialize;

/// Usage of one model as handed to a display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelUsage {
    pub model: String,
    pub total: u64,
    pub quota: u64,
    pub reset_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl ModelUsage {
    pub fn percent(&self) -> f64 {
        if self.quota == 0 {
            return 0.0;
        }
        (self.total as f64 / self.quota as f64) * 100.0
    }

    pub fn is_warning(&self, threshold: f64) -> bool {
        self.total as f64 >= self.quota as f64 * threshold
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSnapshot {
    pub active_model: String,
    pub last_turn_tokens: u64,
    pub models: Vec<ModelUsage>,
}

impl UsageSnapshot {
    pub fn active(&self) -> Option<&ModelUsage> {
        self.models.iter().find(|usage| usage.active)
    }
}

pub fn format_time_remaining(reset_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(reset_at) = reset_at else {
        return "Reset in: Not set".to_string();
    };
    let diff = reset_at - now;
    if diff.num_milliseconds() <= 0 {
        return "Reset pending...".to_string();
    }
    let hours = diff.num_hours();
    let minutes = diff.num_minutes() % 60;
    if hours > 0 {
        format!("Reset in: {hours}h {minutes}m")
    } else {
        format!("Reset in: {minutes}m")
    }
}
