use crate::model::ExecutionStatus;
use crate::output::{accent, format_duration_ms, info, muted, status};
use std::io::Write;
use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub script: String,
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub started_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
    pub message: Option<String>,
}

pub fn print_history(mut w: impl Write, rows: &[HistoryRow]) -> std::io::Result<()> {
    if rows.is_empty() {
        writeln!(w, "{} No executions recorded yet.", info("i"))?;
        return Ok(());
    }

    for (idx, row) in rows.iter().enumerate() {
        writeln!(w, "{} {}", accent(&row.script), status(row.status))?;
        writeln!(w, "  execution: {}", muted(&row.execution_id))?;
        writeln!(w, "  started (UTC): {}", timestamp(row.started_at))?;

        if let Some(completed_at) = row.completed_at {
            let elapsed = (completed_at - row.started_at).whole_milliseconds() as i64;
            writeln!(w, "  duration: {}", format_duration_ms(elapsed.max(0)))?;
        }

        if let Some(message) = &row.message {
            writeln!(w, "  message: {message}")?;
        }

        if idx + 1 < rows.len() {
            writeln!(w)?;
        }
    }

    Ok(())
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| "-".to_string())
}
