use chrono::{DateTime, Utc};
use counter_core::{CounterLoad, CounterRecord, window_reset_at};

use crate::Db;
use crate::error::Result;

/// Collapses every whitespace run to a single `_`.
pub fn sanitize_model(model: &str) -> String {
    let mut out = String::with_capacity(model.len());
    let mut in_space = false;
    for ch in model.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

pub fn counter_key(prefix: &str, model: &str) -> String {
    format!("{}_{}", prefix, sanitize_model(model))
}

impl Db {
    /// Raw stored record, expired or not.
    pub fn counter_record(&self, model: &str) -> Result<Option<CounterRecord>> {
        self.get_entry(&counter_key(&self.prefix, model))
    }

    pub fn load_counter(&self, model: &str, now: DateTime<Utc>) -> Result<CounterLoad> {
        match self.counter_record(model)? {
            Some(record) if !record.is_expired(now) => Ok(CounterLoad {
                total: record.total,
                initialized: true,
            }),
            _ => Ok(CounterLoad::default()),
        }
    }

    /// Keeps the stored window while it is current, otherwise opens a new one at `now`.
    pub fn save_counter(&self, model: &str, total: u64, now: DateTime<Utc>) -> Result<CounterRecord> {
        let key = counter_key(&self.prefix, model);
        let reset_at = match self.counter_record(model)? {
            Some(existing) if !existing.is_expired(now) => existing.reset_at,
            _ => window_reset_at(now),
        };
        let record = CounterRecord { total, reset_at };
        tracing::debug!(key = %key, total, reset_at = %reset_at, "saving counter");
        self.set_entry(&key, &record)?;
        Ok(record)
    }
}
