use crate::model::Outcome;
use crate::output::{failure, format_duration_ms, muted, success};
use crate::tracker::RunReport;
use std::io::Write;

#[derive(Debug, Clone)]
pub struct RunRow {
    pub name: String,
    pub report: RunReport,
}

pub fn print_runs(mut w: impl Write, rows: &[RunRow]) -> std::io::Result<()> {
    for row in rows {
        let report = &row.report;
        match report.outcome {
            Outcome::Completed => writeln!(
                w,
                "{} \"{}\" completed in {}",
                success("ok"),
                row.name,
                format_duration_ms(report.simulated_ms as i64)
            )?,
            Outcome::Failed => writeln!(
                w,
                "{} \"{}\" failed: {}",
                failure("x"),
                row.name,
                report.error.as_deref().unwrap_or("unknown error")
            )?,
        }

        if let Some(execution_id) = &report.execution_id {
            writeln!(w, "  execution: {}", muted(execution_id))?;
        }
    }

    let completed = rows
        .iter()
        .filter(|row| row.report.outcome == Outcome::Completed)
        .count();
    writeln!(
        w,
        "{}",
        muted(&format!("{completed} of {} runs completed", rows.len()))
    )
}
