use counter_core::FileCacheKey;

use crate::Db;
use crate::error::Result;

const NO_CONVERSATION: &str = "null";

pub fn file_cache_key(prefix: &str, key: &FileCacheKey) -> String {
    format!(
        "{}_{}_{}_{}",
        prefix,
        key.scope.as_str(),
        key.conversation_id.as_deref().unwrap_or(NO_CONVERSATION),
        key.filename
    )
}

impl Db {
    pub fn load_file_tokens(&self, key: &FileCacheKey) -> Result<Option<u64>> {
        self.get_entry(&file_cache_key(&self.prefix, key))
    }

    pub fn save_file_tokens(&self, key: &FileCacheKey, tokens: u64) -> Result<()> {
        self.set_entry(&file_cache_key(&self.prefix, key), &tokens)
    }
}
