use crate::model::{ExecutionStatus, ScriptState};
use std::sync::atomic::{AtomicBool, Ordering};

static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Bold,
    Muted,
    Accent,
    Success,
    Failure,
    Warning,
    Info,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Tone::Bold => "1",
            Tone::Muted => "2",
            Tone::Accent => "36",
            Tone::Success => "32",
            Tone::Failure => "31",
            Tone::Warning => "33",
            Tone::Info => "96",
        }
    }
}

pub fn configure(no_color: bool) {
    COLORS_ENABLED.store(colors_wanted(no_color), Ordering::Relaxed);
}

fn colors_wanted(no_color: bool) -> bool {
    if std::env::var("CLICOLOR_FORCE").ok().as_deref() == Some("1") {
        return true;
    }

    if no_color || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    !matches!(std::env::var("TERM"), Ok(term) if term.eq_ignore_ascii_case("dumb"))
}

fn paint(tone: Tone, text: &str) -> String {
    if text.is_empty() || !COLORS_ENABLED.load(Ordering::Relaxed) {
        return text.to_string();
    }

    format!("\x1b[{}m{text}\x1b[0m", tone.code())
}

pub fn bold(text: &str) -> String {
    paint(Tone::Bold, text)
}

pub fn muted(text: &str) -> String {
    paint(Tone::Muted, text)
}

pub fn accent(text: &str) -> String {
    paint(Tone::Accent, text)
}

pub fn success(text: &str) -> String {
    paint(Tone::Success, text)
}

pub fn failure(text: &str) -> String {
    paint(Tone::Failure, text)
}

pub fn warning(text: &str) -> String {
    paint(Tone::Warning, text)
}

pub fn info(text: &str) -> String {
    paint(Tone::Info, text)
}

pub fn status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Completed => success("ok completed"),
        ExecutionStatus::Failed => failure("x failed"),
        ExecutionStatus::Running => warning("~ running"),
        ExecutionStatus::Pending => muted("- pending"),
    }
}

pub fn state(state: ScriptState) -> String {
    match state {
        ScriptState::Idle => muted("idle"),
        ScriptState::Running => warning("running"),
        ScriptState::Completed => success("completed"),
        ScriptState::Failed => failure("failed"),
    }
}
