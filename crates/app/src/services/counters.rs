use std::sync::Arc;

use chrono::{DateTime, Utc};
use counter_collector::FileTokenCache;
use counter_core::{
    Clock, CounterLoad, CounterRecord, FileCacheKey, ModelUsage, UsageSnapshot,
};
use counter_db::Db;

use crate::error::Result;
use crate::services::{SharedConfig, open_db};

/// Per-model counters and the file estimate cache.
#[derive(Clone)]
pub struct CounterService {
    config: SharedConfig,
    clock: Arc<dyn Clock>,
}

impl CounterService {
    pub(super) fn new(config: SharedConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    fn db(&self) -> Result<Db> {
        open_db(&self.config)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn load(&self, model: &str) -> Result<CounterLoad> {
        Ok(self.db()?.load_counter(model, self.now())?)
    }

    pub fn save(&self, model: &str, total: u64) -> Result<CounterRecord> {
        Ok(self.db()?.save_counter(model, total, self.now())?)
    }

    pub fn record(&self, model: &str) -> Result<Option<CounterRecord>> {
        Ok(self.db()?.counter_record(model)?)
    }

    pub fn file_tokens(&self, key: &FileCacheKey) -> Result<Option<u64>> {
        Ok(self.db()?.load_file_tokens(key)?)
    }

    pub fn save_file_tokens(&self, key: &FileCacheKey, tokens: u64) -> Result<()> {
        Ok(self.db()?.save_file_tokens(key, tokens)?)
    }

    /// Usage of every tracked model plus the active one. Expired records
    /// read as zero but keep their reset time so the display can show it
    /// as pending.
    pub fn snapshot(&self, active_model: &str, last_turn_tokens: u64) -> Result<UsageSnapshot> {
        let db = self.db()?;
        let now = self.now();
        let counter = &self.config.counter;
        let mut models: Vec<String> = counter.tracked_models.clone();
        if !models.iter().any(|model| model == active_model) {
            models.push(active_model.to_string());
        }
        let mut usages = Vec::with_capacity(models.len());
        for model in models {
            let record = db.counter_record(&model)?;
            let total = match record {
                Some(record) if !record.is_expired(now) => record.total,
                _ => 0,
            };
            usages.push(ModelUsage {
                quota: counter.quotas.quota_for(&model),
                active: model == active_model,
                reset_at: record.map(|record| record.reset_at),
                total,
                model,
            });
        }
        Ok(UsageSnapshot {
            active_model: active_model.to_string(),
            last_turn_tokens,
            models: usages,
        })
    }
}

impl FileTokenCache for CounterService {
    fn lookup(&self, key: &FileCacheKey) -> Option<u64> {
        match self.file_tokens(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(file = %key.filename, error = %err, "file cache lookup failed");
                None
            }
        }
    }
}
