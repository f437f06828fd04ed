mod file;
mod rest;

pub use file::{DEFAULT_DIR, FileStore, sample_catalog};
pub use rest::{RestStore, rejection_message};

use crate::model::{Category, Execution, ExecutionStatus, ExecutionUpdate, NewExecution, Script};
use rand::Rng;
use thiserror::Error;
use time::OffsetDateTime;

pub const CATEGORIES_TABLE: &str = "script_categories";
pub const SCRIPTS_TABLE: &str = "scripts";
pub const EXECUTIONS_TABLE: &str = "script_executions";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("decode {table}: {message}")]
    Decode { table: String, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("{table} record {id:?} not found")]
    NotFound { table: String, id: String },
    #[error("{table} record {id:?} is already settled")]
    Settled { table: String, id: String },
    #[error("store configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub limit: Option<usize>,
    pub status: Option<ExecutionStatus>,
    pub script_id: Option<String>,
}

impl ExecutionFilter {
    pub fn matches(&self, execution: &Execution) -> bool {
        if let Some(status) = self.status
            && execution.status != status
        {
            return false;
        }

        if let Some(script_id) = &self.script_id
            && &execution.script_id != script_id
        {
            return false;
        }

        true
    }
}

/// The table store holding categories, scripts and execution records.
///
/// Read queries return rows ordered by `display_order` ascending. Execution
/// listings are newest first.
pub trait Store: Send + Sync {
    fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    fn list_scripts(&self) -> Result<Vec<Script>, StoreError>;

    /// Inserts a new execution record and returns its identifier.
    fn create_execution(&self, new: &NewExecution) -> Result<String, StoreError>;

    fn update_execution(&self, id: &str, update: &ExecutionUpdate) -> Result<(), StoreError>;

    fn list_executions(&self, filter: &ExecutionFilter) -> Result<Vec<Execution>, StoreError>;
}

pub fn new_record_id() -> String {
    let mut random = [0_u8; 8];
    rand::rng().fill(&mut random);
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    format!("{millis}-{}", hex_encode(&random))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
