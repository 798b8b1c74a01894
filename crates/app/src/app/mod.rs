use std::path::PathBuf;
use std::sync::Arc;

use counter_collector::ContentCollector;
use counter_core::{Clock, SystemClock};
use counter_db::Db;

use crate::config::CounterConfig;
use crate::display::{LogDisplay, UsageDisplay};
use crate::engine::AccountingEngine;
use crate::error::Result;
use crate::services::AppServices;

/// Where the counter keeps its data, plus the loaded configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub counter: CounterConfig,
}

/// Application state shared by frontends (CLI, embedding hosts).
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db_path: PathBuf, counter: CounterConfig) -> Self {
        Self::with_clock(db_path, counter, Arc::new(SystemClock))
    }

    pub fn with_clock(db_path: PathBuf, counter: CounterConfig, clock: Arc<dyn Clock>) -> Self {
        let config = AppConfig { db_path, counter };
        let services = AppServices::new(&config, clock);
        Self { config, services }
    }

    pub fn is_fresh_db(&self) -> bool {
        !self.config.db_path.exists()
    }

    pub fn setup_db(&self) -> Result<()> {
        setup_db(&self.config.db_path)
    }

    pub fn log_display(&self) -> Arc<dyn UsageDisplay> {
        Arc::new(LogDisplay {
            warning_threshold: self.config.counter.warning_threshold,
        })
    }

    /// Engine wired to this state's counters, with the counters doubling as
    /// the collector's file cache.
    pub fn engine(&self, display: Arc<dyn UsageDisplay>, model: &str) -> AccountingEngine {
        let counters = self.services.counters.clone();
        let collector = ContentCollector::new(self.config.counter.collector_settings())
            .with_cache(Arc::new(counters.clone()));
        AccountingEngine::new(
            collector,
            counters,
            self.config.counter.output_multiplier,
            display,
            model,
        )
    }
}

pub fn setup_db(path: &std::path::Path) -> Result<()> {
    let mut db = Db::open(path)?;
    db.migrate()?;
    Ok(())
}
