use crate::model::{ExecutionStatus, ExecutionUpdate, NewExecution, Outcome, ScriptState};
use crate::simulation::{FAILURE_MESSAGE, SUCCESS_OUTPUT, Simulation};
use crate::store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use time::OffsetDateTime;

/// What `start` does for a script that is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    #[default]
    Reject,
    /// Let the runs race; whichever settles last owns the final status.
    Allow,
}

impl OverlapPolicy {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "reject" => Some(OverlapPolicy::Reject),
            "allow" => Some(OverlapPolicy::Allow),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to create execution record: {0}")]
    Create(#[source] StoreError),
    #[error("failed to update execution: {0}")]
    Update(#[source] StoreError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("script {0:?} is already running")]
    AlreadyRunning(String),
}

#[derive(Debug, Default)]
struct StateTable {
    running: HashSet<String>,
    statuses: HashMap<String, Outcome>,
}

/// Point-in-time copy of the running set and the status map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub running: BTreeSet<String>,
    pub statuses: BTreeMap<String, Outcome>,
}

impl Snapshot {
    pub fn state(&self, script_id: &str) -> ScriptState {
        if self.running.contains(script_id) {
            return ScriptState::Running;
        }

        self.statuses
            .get(script_id)
            .map(|outcome| ScriptState::from(*outcome))
            .unwrap_or(ScriptState::Idle)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub script_id: String,
    pub execution_id: Option<String>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub simulated_ms: u64,
}

impl RunReport {
    fn pending(script_id: &str) -> Self {
        Self {
            script_id: script_id.to_string(),
            execution_id: None,
            outcome: Outcome::Failed,
            error: None,
            simulated_ms: 0,
        }
    }
}

#[derive(Debug)]
pub struct RunHandle {
    script_id: String,
    handle: JoinHandle<RunReport>,
}

impl RunHandle {
    /// Blocks until the run has settled.
    pub fn wait(self) -> RunReport {
        let script_id = self.script_id;
        self.handle.join().unwrap_or_else(|_| {
            let mut report = RunReport::pending(&script_id);
            report.error = Some("run worker panicked".to_string());
            report
        })
    }
}

/// Tracks simulated script runs and their per-script state.
///
/// Each `start` runs on its own thread. The running set and status map are
/// shared by every run started through clones of the same tracker.
#[derive(Clone)]
pub struct Tracker {
    store: Arc<dyn Store>,
    simulation: Simulation,
    overlap: OverlapPolicy,
    table: Arc<Mutex<StateTable>>,
}

impl Tracker {
    pub fn new(store: Arc<dyn Store>, simulation: Simulation, overlap: OverlapPolicy) -> Self {
        Self {
            store,
            simulation,
            overlap,
            table: Arc::new(Mutex::new(StateTable::default())),
        }
    }

    /// Marks the script running, clears its last outcome and hands the run
    /// to a worker thread.
    pub fn start(&self, script_id: &str) -> Result<RunHandle, StartError> {
        {
            let mut table = self.lock();
            if self.overlap == OverlapPolicy::Reject && table.running.contains(script_id) {
                return Err(StartError::AlreadyRunning(script_id.to_string()));
            }

            table.running.insert(script_id.to_string());
            table.statuses.remove(script_id);
        }

        tracing::info!(script_id, "run started");

        let worker = self.clone();
        let id = script_id.to_string();
        let handle = thread::spawn(move || worker.run(&id));

        Ok(RunHandle {
            script_id: script_id.to_string(),
            handle,
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        let table = self.lock();
        Snapshot {
            running: table.running.iter().cloned().collect(),
            statuses: table
                .statuses
                .iter()
                .map(|(id, outcome)| (id.clone(), *outcome))
                .collect(),
        }
    }

    pub fn state(&self, script_id: &str) -> ScriptState {
        let table = self.lock();
        if table.running.contains(script_id) {
            return ScriptState::Running;
        }

        table
            .statuses
            .get(script_id)
            .map(|outcome| ScriptState::from(*outcome))
            .unwrap_or(ScriptState::Idle)
    }

    pub fn is_running(&self, script_id: &str) -> bool {
        self.lock().running.contains(script_id)
    }

    pub fn status(&self, script_id: &str) -> Option<Outcome> {
        self.lock().statuses.get(script_id).copied()
    }

    fn lock(&self) -> MutexGuard<'_, StateTable> {
        self.table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn run(&self, script_id: &str) -> RunReport {
        let mut settle = Settle {
            table: Arc::clone(&self.table),
            script_id: script_id.to_string(),
            outcome: Outcome::Failed,
        };
        let mut report = RunReport::pending(script_id);

        match self.execute(script_id, &mut report) {
            Ok(true) => {
                settle.outcome = Outcome::Completed;
                report.outcome = Outcome::Completed;
                tracing::info!(
                    script_id,
                    execution_id = report.execution_id.as_deref(),
                    "run completed"
                );
            }
            Ok(false) => {
                report.error = Some(FAILURE_MESSAGE.to_string());
                tracing::warn!(
                    script_id,
                    execution_id = report.execution_id.as_deref(),
                    "script execution failed: {FAILURE_MESSAGE}"
                );
            }
            Err(err) => {
                report.error = Some(err.to_string());
                tracing::error!(
                    script_id,
                    execution_id = report.execution_id.as_deref(),
                    "script execution failed: {err}"
                );
            }
        }

        report
    }

    /// Returns whether the simulated run succeeded.
    fn execute(&self, script_id: &str, report: &mut RunReport) -> Result<bool, RunError> {
        let new = NewExecution {
            script_id: script_id.to_string(),
            status: ExecutionStatus::Running,
            started_at: OffsetDateTime::now_utc(),
        };
        let execution_id = self
            .store
            .create_execution(&new)
            .map_err(RunError::Create)?;
        report.execution_id = Some(execution_id.clone());

        let wait = self.simulation.draw_duration();
        thread::sleep(wait);
        report.simulated_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);

        let success = self.simulation.draw_success();
        let update = if success {
            ExecutionUpdate::completed(SUCCESS_OUTPUT)
        } else {
            ExecutionUpdate::failed(FAILURE_MESSAGE)
        };

        self.store
            .update_execution(&execution_id, &update)
            .map_err(RunError::Update)?;

        Ok(success)
    }
}

/// Records the outcome and leaves the running set when dropped, so a run
/// settles even if the worker unwinds.
struct Settle {
    table: Arc<Mutex<StateTable>>,
    script_id: String,
    outcome: Outcome,
}

impl Drop for Settle {
    fn drop(&mut self) {
        let mut table = self
            .table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        table.statuses.insert(self.script_id.clone(), self.outcome);
        table.running.remove(&self.script_id);
    }
}
