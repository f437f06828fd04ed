mod catalog;
mod history;
mod runs;
mod style;

pub use catalog::print_catalog;
pub use history::{HistoryRow, print_history};
pub use runs::{RunRow, print_runs};
pub use style::{
    accent, bold, configure, failure, info, muted, state, status, success, warning,
};

pub fn format_duration_ms(ms: i64) -> String {
    if ms < 1000 {
        return format!("{ms}ms");
    }

    if ms.rem_euclid(1000) == 0 {
        return format!("{}s", ms / 1000);
    }

    format!("{:.3}s", ms as f64 / 1000.0)
}
