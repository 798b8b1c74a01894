use chrono::{DateTime, Utc};
use counter_core::{UsageSnapshot, format_time_remaining};

const BAR_WIDTH: usize = 20;

/// Receives usage after every pass and model switch.
pub trait UsageDisplay: Send + Sync {
    fn render(&self, snapshot: &UsageSnapshot);
}

/// Writes the snapshot to the log.
#[derive(Debug, Clone, Copy)]
pub struct LogDisplay {
    pub warning_threshold: f64,
}

impl UsageDisplay for LogDisplay {
    fn render(&self, snapshot: &UsageSnapshot) {
        tracing::info!(
            model = %snapshot.active_model,
            last_turn = snapshot.last_turn_tokens,
            "last message: {} (weighted) tokens",
            snapshot.last_turn_tokens
        );
        for usage in &snapshot.models {
            tracing::info!(
                model = %usage.model,
                total = usage.total,
                quota = usage.quota,
                warning = usage.is_warning(self.warning_threshold),
                "{:.1}% used",
                usage.percent()
            );
        }
    }
}

/// Plain-text rendering: one header line, then three lines per model.
pub fn render_lines(snapshot: &UsageSnapshot, now: DateTime<Utc>, warning_threshold: f64) -> Vec<String> {
    let mut lines = vec![format!(
        "Last message: {} (weighted) tokens",
        snapshot.last_turn_tokens
    )];
    for usage in &snapshot.models {
        let marker = if usage.active { "*" } else { " " };
        lines.push(format!("{marker} {}", usage.model));
        let percent = usage.percent();
        let filled = ((percent.min(100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
        let fill = if usage.is_warning(warning_threshold) { '!' } else { '#' };
        lines.push(format!(
            "  [{}{}] {} / {} tokens ({:.1}%)",
            fill.to_string().repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            usage.total,
            usage.quota,
            percent
        ));
        lines.push(format!("  {}", format_time_remaining(usage.reset_at, now)));
    }
    lines
}
