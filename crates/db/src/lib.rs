use std::path::Path;

use rusqlite::Connection;

mod counters;
mod error;
mod file_cache;
mod kv;
mod migrations;

pub use counters::{counter_key, sanitize_model};
pub use error::{DbError, Result};
pub use file_cache::file_cache_key;

/// Namespace for every key the counter writes.
pub const DEFAULT_PREFIX: &str = "chatTokenCounter_v1";

pub struct Db {
    conn: Connection,
    prefix: String,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_prefix(path, DEFAULT_PREFIX)
    }

    pub fn open_with_prefix(path: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
