// LMDB-backed task status records
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use heed::{Database, Env, EnvOpenOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const DB_TASKS: &str = "tasks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Success,
    Failure,
}

impl TaskStatus {
    /// Wire code: 1 success, 0 pending, -1 failure.
    #[inline]
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Success => 1,
            TaskStatus::Failure => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    /// Handle of the job executing the task.
    pub job_id: String,
    pub create_time: DateTime<Utc>,
    pub status: TaskStatus,
    pub message: String,
}

impl TaskRecord {
    #[must_use]
    pub fn pending(task_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            job_id: job_id.into(),
            create_time: Utc::now(),
            status: TaskStatus::Pending,
            message: String::new(),
        }
    }
}

/// Task records keyed by task id. The environment is opened once and closed
/// when the last clone is dropped.
#[derive(Clone)]
pub struct TaskStore {
    env: Arc<Env>,
    tasks_db: Database<heed::types::Str, heed::types::Bytes>,
}

impl TaskStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("cannot create task store at {}", path.as_ref().display()))?;

        let env = Arc::new(unsafe {
            EnvOpenOptions::new()
                .map_size(1024 * 1024 * 1024) // 1GB
                .max_dbs(1)
                .open(path.as_ref())?
        });

        let mut wtxn = env.write_txn()?;
        let tasks_db = env.create_database(&mut wtxn, Some(DB_TASKS))?;
        wtxn.commit()?;

        info!("Task store opened at {}", path.as_ref().display());
        Ok(Self { env, tasks_db })
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: &TaskRecord) -> Result<()> {
        let data = serde_json::to_vec(record)?;
        let mut wtxn = self.env.write_txn()?;
        self.tasks_db.put(&mut wtxn, &record.task_id, &data)?;
        wtxn.commit()?;
        debug!("Stored task {} ({:?})", record.task_id, record.status);
        Ok(())
    }

    pub fn get(&self, task_id: &str) -> Result<Option<TaskRecord>> {
        let rtxn = self.env.read_txn()?;
        match self.tasks_db.get(&rtxn, task_id)? {
            Some(data) => Ok(Some(serde_json::from_slice(data)?)),
            None => Ok(None),
        }
    }

    /// Update status and message of an existing record. Returns false if the
    /// task is unknown.
    pub fn set_status(&self, task_id: &str, status: TaskStatus, message: impl Into<String>) -> Result<bool> {
        let mut wtxn = self.env.write_txn()?;
        let Some(data) = self.tasks_db.get(&wtxn, task_id)? else {
            return Ok(false);
        };
        let mut record: TaskRecord = serde_json::from_slice(data)?;
        record.status = status;
        record.message = message.into();
        let data = serde_json::to_vec(&record)?;
        self.tasks_db.put(&mut wtxn, task_id, &data)?;
        wtxn.commit()?;
        Ok(true)
    }

    pub fn delete(&self, task_id: &str) -> Result<bool> {
        let mut wtxn = self.env.write_txn()?;
        let existed = self.tasks_db.delete(&mut wtxn, task_id)?;
        wtxn.commit()?;
        Ok(existed)
    }

    pub fn len(&self) -> Result<u64> {
        let rtxn = self.env.read_txn()?;
        Ok(self.tasks_db.len(&rtxn)?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every record.
    pub fn clear(&self) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        self.tasks_db.clear(&mut wtxn)?;
        wtxn.commit()?;
        info!("Task store cleared");
        Ok(())
    }
}
