mod args;
mod config;
mod dirs;

use std::io;
use std::sync::Arc;

use clap::Parser;
use counter_app::{
    AppPaths, AppState, TriggerCoordinator, TriggerEvent, ensure_app_data_dir, render_lines,
};
use counter_collector::{PageSession, PageSnapshot, StaticPage};
use counter_core::DEFAULT_MODEL;
use tracing_subscriber::EnvFilter;

use args::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = CliArgs::parse();

    let data_dir = dirs::resolve_data_dir(args.data_dir).map_err(io::Error::other)?;
    if data_dir.matched_existing {
        tracing::debug!(dir = %data_dir.dir.display(), "using existing data dir");
    } else {
        tracing::info!(dir = %data_dir.dir.display(), "using data dir");
    }
    let paths = AppPaths::new(data_dir.dir);
    ensure_app_data_dir(&paths).map_err(|err| io::Error::other(err.to_string()))?;

    let config = config::load_or_create(args.config, &paths.config_path).map_err(io::Error::other)?;
    if config.created {
        tracing::info!(file = %config.file.display(), "created default config");
    }

    let app_state = AppState::new(paths.db_path, config.config);
    if app_state.is_fresh_db() {
        tracing::info!("initializing counter database");
    }
    app_state
        .setup_db()
        .map_err(|err| io::Error::other(format!("failed to initialize database: {}", err)))?;

    match args.command.unwrap_or(Command::Status {
        model: None,
        json: false,
    }) {
        Command::Status { model, json } => status(&app_state, model, json),
        Command::Replay {
            snapshot,
            model,
            json,
        } => {
            let raw = std::fs::read_to_string(&snapshot)
                .map_err(|err| io::Error::other(format!("read {}: {}", snapshot.display(), err)))?;
            let mut page_snapshot = PageSnapshot::from_json(&raw)?;
            if model.is_some() {
                page_snapshot.model = model;
            }
            replay(&app_state, page_snapshot, json).await
        }
    }
}

fn status(
    app_state: &AppState,
    model: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let counter = &app_state.config.counter;
    let model = model
        .or_else(|| counter.tracked_models.first().cloned())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let counters = &app_state.services.counters;
    let snapshot = counters.snapshot(&model, 0)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }
    for line in render_lines(&snapshot, counters.now(), counter.warning_threshold) {
        println!("{line}");
    }
    Ok(())
}

async fn replay(
    app_state: &AppState,
    snapshot: PageSnapshot,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = snapshot
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let page: Arc<dyn PageSession> = Arc::new(StaticPage::new(snapshot));
    let engine = Arc::new(app_state.engine(app_state.log_display(), &model));
    let coordinator = Arc::new(TriggerCoordinator::new(
        engine,
        page,
        &app_state.config.counter,
    ));
    coordinator.initialize().await?;

    let pass = coordinator.handle(TriggerEvent::Send).await;
    let outcome = tokio::select! {
        result = pass => result??,
        _ = tokio::signal::ctrl_c() => {
            coordinator.cancel_pending().await;
            return Err(io::Error::new(io::ErrorKind::Interrupted, "replay interrupted").into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    println!(
        "Counted {} weighted tokens from {} units for {}",
        outcome.tally.tokens, outcome.tally.units, outcome.model
    );
    for issue in &outcome.issues {
        println!("  skipped {}: {}", issue.unit, issue.message);
    }
    let counter = &app_state.config.counter;
    let counters = &app_state.services.counters;
    let snapshot = counters.snapshot(&outcome.model, outcome.tally.tokens)?;
    for line in render_lines(&snapshot, counters.now(), counter.warning_threshold) {
        println!("{line}");
    }
    Ok(())
}
