use super::{
    CATEGORIES_TABLE, EXECUTIONS_TABLE, ExecutionFilter, SCRIPTS_TABLE, Store, StoreError,
    new_record_id,
};
use crate::model::{Category, Execution, ExecutionUpdate, NewExecution, Script};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;

pub const DEFAULT_DIR: &str = ".directit";

/// Table store kept as one JSON-lines file per table inside a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.jsonl"))
    }

    /// Replaces the category and script tables.
    pub fn seed(&self, categories: &[Category], scripts: &[Script]) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.write_table(CATEGORIES_TABLE, categories)?;
        self.write_table(SCRIPTS_TABLE, scripts)
    }

    /// Writes the sample catalog unless a category table already exists.
    pub fn seed_sample(&self) -> Result<bool, StoreError> {
        if self.table_path(CATEGORIES_TABLE).exists() {
            return Ok(false);
        }

        let (categories, scripts) = sample_catalog();
        self.seed(&categories, &scripts)?;
        Ok(true)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raw non-blank lines of a table, undecoded.
    fn read_lines(&self, table: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        let bytes = match fs::read(self.table_path(table)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(format!("open {table} table"), err)),
        };

        Ok(bytes
            .split(|b| *b == b'\n')
            .filter(|line| !line.trim_ascii().is_empty())
            .map(<[u8]>::to_vec)
            .collect())
    }

    fn read_table<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, StoreError> {
        let rows = self
            .read_lines(table)?
            .iter()
            .filter_map(|line| serde_json::from_slice::<T>(line.trim_ascii()).ok())
            .collect();
        Ok(rows)
    }

    fn write_table<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<(), StoreError> {
        let lines = rows
            .iter()
            .map(|row| encode_row(table, row))
            .collect::<Result<Vec<_>, _>>()?;
        self.write_lines(table, &lines)
    }

    fn write_lines(&self, table: &str, lines: &[Vec<u8>]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::io("create store directory", e))?;

        let path = self.table_path(table);
        let tmp = path.with_extension("jsonl.tmp");

        {
            let file = File::create(&tmp)
                .map_err(|e| StoreError::io(format!("create {table} table"), e))?;
            let mut writer = BufWriter::new(file);
            for line in lines {
                writer
                    .write_all(line)
                    .and_then(|_| writer.write_all(b"\n"))
                    .map_err(|e| StoreError::io(format!("write {table} table"), e))?;
            }
            writer
                .flush()
                .map_err(|e| StoreError::io(format!("write {table} table"), e))?;
        }

        fs::rename(&tmp, &path).map_err(|e| StoreError::io(format!("replace {table} table"), e))
    }

    fn append_row<T: Serialize>(&self, table: &str, row: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::io("create store directory", e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.table_path(table))
            .map_err(|e| StoreError::io(format!("open {table} table"), e))?;

        let line = encode_row(table, row)?;
        file.write_all(&line)
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|e| StoreError::io(format!("write {table} table"), e))
    }
}

impl Store for FileStore {
    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut rows: Vec<Category> = self.read_table(CATEGORIES_TABLE)?;
        rows.sort_by_key(|row| row.display_order);
        Ok(rows)
    }

    fn list_scripts(&self) -> Result<Vec<Script>, StoreError> {
        let mut rows: Vec<Script> = self.read_table(SCRIPTS_TABLE)?;
        rows.sort_by_key(|row| row.display_order);
        Ok(rows)
    }

    fn create_execution(&self, new: &NewExecution) -> Result<String, StoreError> {
        let now = OffsetDateTime::now_utc();
        let execution = Execution {
            id: new_record_id(),
            script_id: new.script_id.clone(),
            status: new.status,
            started_at: new.started_at,
            completed_at: None,
            error_message: None,
            output_log: None,
            created_at: now,
        };

        let _guard = self.lock();
        self.append_row(EXECUTIONS_TABLE, &execution)?;
        Ok(execution.id)
    }

    /// Rewrites only the matching line; rows this store cannot decode are
    /// written back untouched.
    fn update_execution(&self, id: &str, update: &ExecutionUpdate) -> Result<(), StoreError> {
        let _guard = self.lock();
        let mut lines = self.read_lines(EXECUTIONS_TABLE)?;

        let mut target = None;
        for (index, line) in lines.iter().enumerate() {
            let Ok(row) = serde_json::from_slice::<Execution>(line.trim_ascii()) else {
                continue;
            };
            if row.id == id {
                target = Some((index, row));
                break;
            }
        }

        let Some((index, mut row)) = target else {
            return Err(StoreError::NotFound {
                table: EXECUTIONS_TABLE.to_string(),
                id: id.to_string(),
            });
        };

        if row.status.is_terminal() {
            return Err(StoreError::Settled {
                table: EXECUTIONS_TABLE.to_string(),
                id: id.to_string(),
            });
        }
        update.apply(&mut row);
        lines[index] = encode_row(EXECUTIONS_TABLE, &row)?;

        self.write_lines(EXECUTIONS_TABLE, &lines)
    }

    fn list_executions(&self, filter: &ExecutionFilter) -> Result<Vec<Execution>, StoreError> {
        let rows: Vec<Execution> = self.read_table(EXECUTIONS_TABLE)?;
        let mut rows: Vec<Execution> = rows.into_iter().filter(|row| filter.matches(row)).collect();

        rows.reverse();
        rows.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        if let Some(limit) = filter.limit
            && rows.len() > limit
        {
            rows.truncate(limit);
        }

        Ok(rows)
    }
}

fn encode_row<T: Serialize>(table: &str, row: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(row).map_err(|e| StoreError::Decode {
        table: table.to_string(),
        message: e.to_string(),
    })
}

pub fn sample_catalog() -> (Vec<Category>, Vec<Script>) {
    let now = OffsetDateTime::now_utc();

    let category = |id: &str, name: &str, order: i32| Category {
        id: id.to_string(),
        name: name.to_string(),
        display_order: order,
        created_at: now,
    };

    let script = |id: &str, category_id: &str, name: &str, filename: &str, order: i32| Script {
        id: id.to_string(),
        category_id: category_id.to_string(),
        name: name.to_string(),
        filename: filename.to_string(),
        description: None,
        display_order: order,
        created_at: now,
    };

    let categories = vec![
        category("backups", "Backups", 1),
        category("maintenance", "Maintenance", 2),
        category("reporting", "Reporting", 3),
    ];

    let mut scripts = vec![
        script("nightly-backup", "backups", "Nightly Backup", "backup.sh", 1),
        script("verify-backup", "backups", "Verify Backup", "verify_backup.sh", 2),
        script("clear-temp", "maintenance", "Clear Temp Files", "clear_temp.sh", 1),
        script("rotate-logs", "maintenance", "Rotate Logs", "rotate_logs.sh", 2),
        script("daily-report", "reporting", "Daily Report", "daily_report.py", 1),
    ];
    scripts[0].description = Some("Snapshot the primary database".to_string());
    scripts[4].description = Some("Email the daily usage summary".to_string());

    (categories, scripts)
}
