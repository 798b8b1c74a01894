use std::fs;
use std::path::Path;
use std::time::Duration;

use counter_collector::{CachePolicy, CollectorSettings, StabilityProbe, WaitPolicy};
use counter_core::{DEFAULT_OUTPUT_MULTIPLIER, ModelQuotas};
use counter_db::DEFAULT_PREFIX;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// User-tunable behaviour, stored as TOML next to the database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub storage_prefix: String,
    /// Weight applied to the final assistant output.
    pub output_multiplier: u64,
    pub warning_threshold: f64,
    /// Models shown by the display even before they have usage.
    pub tracked_models: Vec<String>,
    pub cache_policy: CachePolicy,
    pub quotas: ModelQuotas,
    pub timing: TimingConfig,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            storage_prefix: DEFAULT_PREFIX.to_string(),
            output_multiplier: DEFAULT_OUTPUT_MULTIPLIER,
            warning_threshold: 0.9,
            tracked_models: vec![
                "3 Haiku".to_string(),
                "3.5 Sonnet (New)".to_string(),
                "3 Opus".to_string(),
            ],
            cache_policy: CachePolicy::Refresh,
            quotas: ModelQuotas::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// Delays and poll bounds, in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub settle_delay_ms: u64,
    pub new_conversation_delay_ms: u64,
    pub model_poll_ms: u64,
    pub stable_polls: u32,
    pub stable_interval_ms: u64,
    pub final_output_timeout_ms: u64,
    pub element_attempts: u32,
    pub element_interval_ms: u64,
    pub modal_attempts: u32,
    pub modal_interval_ms: u64,
    pub panel_attempts: u32,
    pub panel_interval_ms: u64,
    pub panel_settle_ms: u64,
    pub after_close_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 100,
            new_conversation_delay_ms: 5_000,
            model_poll_ms: 1_000,
            stable_polls: 3,
            stable_interval_ms: 100,
            final_output_timeout_ms: 60_000,
            element_attempts: 5,
            element_interval_ms: 100,
            modal_attempts: 5,
            modal_interval_ms: 200,
            panel_attempts: 5,
            panel_interval_ms: 100,
            panel_settle_ms: 1_000,
            after_close_ms: 200,
        }
    }
}

impl CounterConfig {
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|err| AppError::Message(format!("read config {}: {}", path.display(), err)))?;
        Self::from_toml(&contents)
    }

    /// Loads the file, writing defaults first when it does not exist.
    /// Returns the config and whether the file was created.
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }
        let config = Self::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(&config)?)?;
        Ok((config, true))
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_prefix.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "storage_prefix must not be empty".to_string(),
            ));
        }
        if self.output_multiplier == 0 {
            return Err(AppError::InvalidInput(
                "output_multiplier must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.warning_threshold) {
            return Err(AppError::InvalidInput(format!(
                "warning_threshold {} is outside 0..=1",
                self.warning_threshold
            )));
        }
        if self.timing.stable_polls == 0 {
            return Err(AppError::InvalidInput(
                "timing.stable_polls must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Brand-new conversations take longer to settle than existing ones.
    pub fn settle_delay(&self, has_conversation: bool) -> Duration {
        if has_conversation {
            Duration::from_millis(self.timing.settle_delay_ms)
        } else {
            Duration::from_millis(self.timing.new_conversation_delay_ms)
        }
    }

    pub fn model_poll_interval(&self) -> Duration {
        Duration::from_millis(self.timing.model_poll_ms.max(1))
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        let timing = &self.timing;
        CollectorSettings {
            element_wait: WaitPolicy::fixed(
                timing.element_attempts,
                Duration::from_millis(timing.element_interval_ms),
            ),
            modal_wait: WaitPolicy::fixed(
                timing.modal_attempts,
                Duration::from_millis(timing.modal_interval_ms),
            ),
            panel_wait: WaitPolicy::fixed(
                timing.panel_attempts,
                Duration::from_millis(timing.panel_interval_ms),
            ),
            panel_settle: Duration::from_millis(timing.panel_settle_ms),
            after_close_pause: Duration::from_millis(timing.after_close_ms),
            final_output: StabilityProbe {
                required: timing.stable_polls,
                interval: Duration::from_millis(timing.stable_interval_ms),
                timeout: Duration::from_millis(timing.final_output_timeout_ms),
            },
            cache_policy: self.cache_policy,
        }
    }
}
