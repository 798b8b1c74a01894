pub mod app;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod engine;
pub mod error;
pub mod services;
pub mod session;
pub mod startup;

pub use app::{AppConfig, AppState};
pub use config::{CounterConfig, TimingConfig};
pub use coordinator::{TriggerCoordinator, TriggerEvent};
pub use display::{LogDisplay, UsageDisplay, render_lines};
pub use engine::{AccountingEngine, PassOutcome, PassState};
pub use error::{AppError, Result};
pub use services::{AppServices, CounterService};
pub use session::SessionState;
pub use startup::{AppPaths, ensure_app_data_dir};
