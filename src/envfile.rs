use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

pub const DEFAULT_PATH: &str = ".env";

static KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

pub fn load(path: &Path) -> Result<HashMap<String, String>, io::Error> {
    let text = fs::read_to_string(path)?;
    parse(&text).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

pub fn parse(text: &str) -> Result<HashMap<String, String>, String> {
    let mut out = HashMap::new();

    for (index, raw) in text.lines().enumerate() {
        if let Some((key, value)) =
            parse_line(raw).map_err(|err| format!("line {}: {err}", index + 1))?
        {
            out.insert(key, value);
        }
    }

    Ok(out)
}

/// Returns the process environment layered over the `.env` file at `path`.
///
/// A missing file contributes nothing. Variables already set in the process
/// take precedence.
pub fn merged_env(path: &Path) -> Result<HashMap<String, String>, io::Error> {
    let mut vars = match load(path) {
        Ok(vars) => vars,
        Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
        Err(err) => return Err(err),
    };

    vars.extend(std::env::vars());
    Ok(vars)
}

fn parse_line(raw: &str) -> Result<Option<(String, String)>, String> {
    let line = raw.trim_end_matches('\r').trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let line = line.strip_prefix("export ").map(str::trim).unwrap_or(line);

    let (key, value) = match line.split_once('=') {
        Some((key, value)) if !key.is_empty() => (key.trim(), value.trim()),
        _ => return Err("expected KEY=VALUE".to_string()),
    };

    if !KEY_RE.is_match(key) {
        return Err(format!("invalid key {key:?}"));
    }

    Ok(Some((key.to_string(), unquote(value)?)))
}

fn unquote(value: &str) -> Result<String, String> {
    if let Some(rest) = value.strip_prefix('"') {
        if rest.is_empty() || !rest.ends_with('"') {
            return Err("unterminated double-quoted value".to_string());
        }
        return serde_json::from_str::<String>(value)
            .map_err(|_| "invalid double-quoted value".to_string());
    }

    if let Some(rest) = value.strip_prefix('\'') {
        return rest
            .strip_suffix('\'')
            .map(str::to_string)
            .ok_or_else(|| "unterminated single-quoted value".to_string());
    }

    let bare = match value.find(" #") {
        Some(idx) => value[..idx].trim(),
        None => value,
    };
    Ok(bare.to_string())
}
