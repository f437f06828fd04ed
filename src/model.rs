use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub display_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub filename: String,
    #[serde(default)]
    pub description: Option<String>,
    pub display_order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A category together with the scripts it owns, in display order.
///
/// Only ever assembled in memory by the catalog loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryWithScripts {
    #[serde(flatten)]
    pub category: Category,
    pub scripts: Vec<Script>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "pending" => Some(ExecutionStatus::Pending),
            "running" => Some(ExecutionStatus::Running),
            "completed" => Some(ExecutionStatus::Completed),
            "failed" => Some(ExecutionStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub script_id: String,
    pub status: ExecutionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub output_log: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Insert payload for a new execution record.
#[derive(Debug, Clone, Serialize)]
pub struct NewExecution {
    pub script_id: String,
    pub status: ExecutionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

/// The single terminal write applied to an execution record.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionUpdate {
    pub status: ExecutionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecutionUpdate {
    pub fn completed(output_log: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Completed,
            completed_at: OffsetDateTime::now_utc(),
            output_log: Some(output_log.into()),
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            completed_at: OffsetDateTime::now_utc(),
            output_log: None,
            error_message: Some(error_message.into()),
        }
    }

    pub fn apply(&self, execution: &mut Execution) {
        execution.status = self.status;
        execution.completed_at = Some(self.completed_at);
        if self.output_log.is_some() {
            execution.output_log = self.output_log.clone();
        }
        if self.error_message.is_some() {
            execution.error_message = self.error_message.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl From<Outcome> for ScriptState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => ScriptState::Completed,
            Outcome::Failed => ScriptState::Failed,
        }
    }
}
