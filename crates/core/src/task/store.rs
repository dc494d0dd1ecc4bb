//! File-backed task status records
//!
//! One JSON document per task:
//! ```text
//! <data_dir>/
//!   tasks/
//!     <task_id>.json
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::event::Usage;
use crate::task::model::{Task, TaskRecord};
use crate::{Error, Result};

/// Store for persisting task status records
#[derive(Debug, Clone)]
pub struct TaskStore {
    base_dir: PathBuf,
}

impl TaskStore {
    /// Create a new task store rooted at a data directory
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: data_dir.as_ref().join("tasks"),
        }
    }

    fn record_path(&self, task_id: Uuid) -> PathBuf {
        self.base_dir.join(format!("{}.json", task_id))
    }

    /// Create the initial queued record (called by the submitting service)
    pub fn create(&self, record: &TaskRecord) -> Result<()> {
        self.save(record)
    }

    /// Persist a record, overwriting any previous version
    pub fn save(&self, record: &TaskRecord) -> Result<()> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir)?;
        }
        let path = self.record_path(record.task_id);
        let file = File::create(&path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, record)?;
        debug!("Saved task record: {}", path.display());
        Ok(())
    }

    /// Load a record by task id
    pub fn load(&self, task_id: Uuid) -> Result<Option<TaskRecord>> {
        let path = self.record_path(task_id);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let record: TaskRecord = serde_json::from_reader(reader)?;
        Ok(Some(record))
    }

    /// Transition a task to `running` unless it already reached a terminal
    /// state.
    ///
    /// Returns `None` for a terminal record: the queue delivered the task a
    /// second time and the caller must not re-spawn the subprocess. A missing
    /// record is tolerated (the queue payload is authoritative) and created
    /// on the spot.
    pub fn try_mark_running(&self, task: &Task) -> Result<Option<TaskRecord>> {
        let mut record = match self.load(task.task_id)? {
            Some(record) if record.is_terminal() => return Ok(None),
            Some(record) => record,
            None => TaskRecord::queued(task),
        };
        record.mark_running();
        self.save(&record)?;
        Ok(Some(record))
    }

    /// Persist the terminal status for a cleanly exited subprocess
    pub fn finish_completed(&self, task_id: Uuid, return_code: i32, usage: Usage) -> Result<()> {
        let mut record = self
            .load(task_id)?
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        record.mark_completed(return_code);
        record.usage = usage;
        self.save(&record)
    }

    /// Persist the terminal status for an aborted execution
    pub fn finish_failed(&self, task_id: Uuid, error: impl Into<String>) -> Result<()> {
        let mut record = self
            .load(task_id)?
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        record.mark_failed(error);
        self.save(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::TaskStatus;
    use tempfile::TempDir;

    fn create_test_store() -> (TaskStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = TaskStore::new(temp_dir.path());
        (store, temp_dir)
    }

    #[test]
    fn test_save_and_load_record() {
        let (store, _temp) = create_test_store();
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "test");
        let record = TaskRecord::queued(&task);

        store.create(&record).unwrap();

        let loaded = store.load(task.task_id).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_load_missing_record() {
        let (store, _temp) = create_test_store();
        assert!(store.load(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_try_mark_running_from_queued() {
        let (store, _temp) = create_test_store();
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "test");
        store.create(&TaskRecord::queued(&task)).unwrap();

        let record = store.try_mark_running(&task).unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Running);
        assert!(record.started_at.is_some());

        let persisted = store.load(task.task_id).unwrap().unwrap();
        assert_eq!(persisted.status, TaskStatus::Running);
    }

    #[test]
    fn test_try_mark_running_without_record() {
        let (store, _temp) = create_test_store();
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "test");

        let record = store.try_mark_running(&task).unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Running);
    }

    #[test]
    fn test_try_mark_running_rejects_terminal() {
        let (store, _temp) = create_test_store();
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "test");

        store.try_mark_running(&task).unwrap().unwrap();
        store
            .finish_completed(task.task_id, 0, Usage::default())
            .unwrap();

        // Duplicate delivery after a terminal state is fenced out.
        assert!(store.try_mark_running(&task).unwrap().is_none());
        let record = store.load(task.task_id).unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
    }

    #[test]
    fn test_finish_completed_records_usage() {
        let (store, _temp) = create_test_store();
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "test");
        store.try_mark_running(&task).unwrap();

        let usage = Usage {
            input_tokens: 12,
            output_tokens: 34,
        };
        store
            .finish_completed(task.task_id, 0, usage.clone())
            .unwrap();

        let record = store.load(task.task_id).unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.usage, usage);
        assert_eq!(record.result.unwrap().return_code, 0);
    }

    #[test]
    fn test_finish_failed_records_error() {
        let (store, _temp) = create_test_store();
        let task = Task::new(Uuid::new_v4(), Uuid::new_v4(), "test");
        store.try_mark_running(&task).unwrap();

        store.finish_failed(task.task_id, "spawn failed").unwrap();

        let record = store.load(task.task_id).unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error, Some("spawn failed".to_string()));
    }

    #[test]
    fn test_finish_on_missing_record_is_an_error() {
        let (store, _temp) = create_test_store();
        assert!(store
            .finish_failed(Uuid::new_v4(), "nope")
            .is_err());
    }
}
