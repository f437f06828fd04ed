use crate::simulation::{DEFAULT_MAX_DURATION, DEFAULT_MIN_DURATION, DEFAULT_SUCCESS_RATE, Simulation};
use crate::store::{DEFAULT_DIR, FileStore, RestStore, Store, StoreError};
use crate::tracker::OverlapPolicy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

pub const CURRENT_VERSION: i32 = 1;
pub const DEFAULT_API_KEY_ENV: &str = "DIRECTIT_API_KEY";

static ENV_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

const VALID_BACKENDS: &[&str] = &["file", "rest"];
const VALID_OVERLAP: &[&str] = &["reject", "allow"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub version: i32,
    pub store: StoreSection,
    pub simulation: SimulationSection,
    pub tracker: TrackerSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            store: StoreSection::default(),
            simulation: SimulationSection::default(),
            tracker: TrackerSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub backend: String,
    pub path: String,
    pub url: String,
    pub api_key: String,
    pub api_key_env: String,
    pub timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSection {
    pub min_duration: String,
    pub max_duration: String,
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerSection {
    pub overlap: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreSettings {
    File {
        dir: PathBuf,
    },
    Rest {
        url: String,
        api_key: String,
        timeout: Duration,
    },
}

impl StoreSettings {
    pub fn open(&self) -> Result<Arc<dyn Store>, StoreError> {
        match self {
            StoreSettings::File { dir } => Ok(Arc::new(FileStore::new(dir))),
            StoreSettings::Rest {
                url,
                api_key,
                timeout,
            } => Ok(Arc::new(RestStore::new(url, api_key, *timeout)?)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            StoreSettings::File { dir } => format!("file store {}", dir.display()),
            StoreSettings::Rest { url, .. } => format!("rest store {url}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store: StoreSettings,
    pub simulation: Simulation,
    pub overlap: OverlapPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    pub issues: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.issues.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.issues.first() {
            write!(
                f,
                "configuration validation failed: {}: {}",
                first.field, first.message
            )
        } else {
            write!(f, "configuration validation failed")
        }
    }
}

impl std::error::Error for ValidationErrors {}

pub fn load(path: &Path) -> Result<Config, String> {
    let cfg = parse(path)?;
    validate(&cfg).map_err(|e| e.to_string())?;
    Ok(cfg)
}

pub fn parse(path: &Path) -> Result<Config, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("read config: {e}"))?;
    let cfg: Config = serde_yaml::from_str(&text).map_err(|e| format!("parse config yaml: {e}"))?;
    Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<(), ValidationErrors> {
    let mut issues = ValidationErrors::new();

    if cfg.version != CURRENT_VERSION {
        issues.add("version", format!("must be {CURRENT_VERSION}"));
    }

    validate_store(&mut issues, &cfg.store);
    validate_simulation(&mut issues, &cfg.simulation);

    if !cfg.tracker.overlap.is_empty() && !VALID_OVERLAP.contains(&cfg.tracker.overlap.as_str()) {
        issues.add("tracker.overlap", "must be one of reject, allow");
    }

    if issues.has_issues() {
        Err(issues)
    } else {
        Ok(())
    }
}

impl Config {
    /// Resolves defaults and credentials into runtime settings.
    ///
    /// `env` supplies variables for `store.api_key_env`.
    pub fn resolve(&self, env: &HashMap<String, String>) -> Result<Settings, String> {
        let store = self.resolve_store(env)?;

        let min_duration = resolve_duration(&self.simulation.min_duration, DEFAULT_MIN_DURATION)
            .map_err(|e| format!("simulation.min_duration: {e}"))?;
        let max_duration = resolve_duration(&self.simulation.max_duration, DEFAULT_MAX_DURATION)
            .map_err(|e| format!("simulation.max_duration: {e}"))?;
        let success_rate = self.simulation.success_rate.unwrap_or(DEFAULT_SUCCESS_RATE);

        let overlap = if self.tracker.overlap.is_empty() {
            OverlapPolicy::default()
        } else {
            OverlapPolicy::parse(&self.tracker.overlap)
                .ok_or_else(|| "tracker.overlap: must be one of reject, allow".to_string())?
        };

        Ok(Settings {
            store,
            simulation: Simulation {
                min_duration,
                max_duration,
                success_rate,
            },
            overlap,
        })
    }

    fn resolve_store(&self, env: &HashMap<String, String>) -> Result<StoreSettings, String> {
        match self.store.backend.as_str() {
            "" | "file" => {
                let dir = if self.store.path.is_empty() {
                    DEFAULT_DIR
                } else {
                    self.store.path.as_str()
                };
                Ok(StoreSettings::File {
                    dir: PathBuf::from(dir),
                })
            }
            "rest" => {
                if self.store.url.is_empty() {
                    return Err("store.url: is required for the rest backend".to_string());
                }

                let key_env = if self.store.api_key_env.is_empty() {
                    DEFAULT_API_KEY_ENV
                } else {
                    self.store.api_key_env.as_str()
                };

                let api_key = if !self.store.api_key.is_empty() {
                    self.store.api_key.clone()
                } else {
                    env.get(key_env)
                        .filter(|value| !value.is_empty())
                        .cloned()
                        .ok_or_else(|| {
                            format!("store.api_key: not set and ${key_env} is empty")
                        })?
                };

                let timeout = resolve_duration(&self.store.timeout, Duration::from_secs(10))
                    .map_err(|e| format!("store.timeout: {e}"))?;

                Ok(StoreSettings::Rest {
                    url: self.store.url.clone(),
                    api_key,
                    timeout,
                })
            }
            other => Err(format!("store.backend: unknown backend {other:?}")),
        }
    }
}

fn validate_store(issues: &mut ValidationErrors, s: &StoreSection) {
    if !s.backend.is_empty() && !VALID_BACKENDS.contains(&s.backend.as_str()) {
        issues.add("store.backend", "must be one of file, rest");
    }

    if s.backend == "rest" {
        if s.url.is_empty() {
            issues.add("store.url", "is required for the rest backend");
        } else if reqwest::Url::parse(&s.url).is_err() {
            issues.add("store.url", "must be a valid URL");
        }
    } else if !s.url.is_empty() || !s.api_key.is_empty() {
        issues.add("store", "url and api_key are only used by the rest backend");
    }

    if !s.api_key_env.is_empty() && !ENV_NAME_RE.is_match(&s.api_key_env) {
        issues.add(
            "store.api_key_env",
            "must match ^[A-Za-z_][A-Za-z0-9_]*$",
        );
    }

    if !s.timeout.is_empty() && parse_duration(&s.timeout).is_err() {
        issues.add("store.timeout", "must be a valid duration");
    }
}

fn validate_simulation(issues: &mut ValidationErrors, s: &SimulationSection) {
    let min = if s.min_duration.is_empty() {
        Some(DEFAULT_MIN_DURATION)
    } else {
        parse_duration(&s.min_duration).ok()
    };
    let max = if s.max_duration.is_empty() {
        Some(DEFAULT_MAX_DURATION)
    } else {
        parse_duration(&s.max_duration).ok()
    };

    if min.is_none() {
        issues.add("simulation.min_duration", "must be a valid duration");
    }
    if max.is_none() {
        issues.add("simulation.max_duration", "must be a valid duration");
    }

    if let (Some(min), Some(max)) = (min, max)
        && min > max
    {
        issues.add(
            "simulation.max_duration",
            "must not be shorter than min_duration",
        );
    }

    if let Some(rate) = s.success_rate
        && !(0.0..=1.0).contains(&rate)
    {
        issues.add("simulation.success_rate", "must be between 0 and 1");
    }
}

fn parse_duration(text: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(text)
}

fn resolve_duration(value: &str, default_value: Duration) -> Result<Duration, String> {
    if value.is_empty() {
        return Ok(default_value);
    }

    parse_duration(value).map_err(|_| "must be a valid duration".to_string())
}
