mod counters;

use std::sync::Arc;

use counter_core::Clock;
use counter_db::Db;

use crate::app::AppConfig;
use crate::error::Result;

pub use counters::CounterService;

type SharedConfig = Arc<AppConfig>;

/// Service registry for app-level operations.
#[derive(Clone)]
pub struct AppServices {
    pub counters: CounterService,
}

impl AppServices {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let shared = Arc::new(config.clone());
        Self {
            counters: CounterService::new(shared, clock),
        }
    }
}

fn open_db(config: &SharedConfig) -> Result<Db> {
    Ok(Db::open_with_prefix(
        &config.db_path,
        &config.counter.storage_prefix,
    )?)
}
