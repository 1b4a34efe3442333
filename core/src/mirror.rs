//! Client-local mirror of tasks.
//!
//! A small key-indexed object store: rows are keyed by a numeric id and
//! indexed a second time by their `completed` flag. It is seeded with fixed
//! mock rows and never talks to the task API.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorTask {
    pub id: u64,
    pub title: String,
    pub completed: bool,
}

impl MirrorTask {
    pub fn new(id: u64, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id,
            title: title.into(),
            completed,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MirrorError {
    #[error("a row with key {0} already exists")]
    KeyExists(u64),
}

#[derive(Debug, Default, Clone)]
pub struct MirrorStore {
    rows: BTreeMap<u64, MirrorTask>,
    by_completed: BTreeMap<bool, BTreeSet<u64>>,
}

impl MirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new row keyed by the current epoch milliseconds.
    pub fn add(&mut self, title: impl Into<String>, completed: bool) -> Result<u64, MirrorError> {
        let id = Utc::now().timestamp_millis().max(0) as u64;
        self.add_row(MirrorTask::new(id, title, completed))
    }

    /// Insert `task` under its own key. Never overwrites.
    pub fn add_row(&mut self, task: MirrorTask) -> Result<u64, MirrorError> {
        if self.rows.contains_key(&task.id) {
            return Err(MirrorError::KeyExists(task.id));
        }
        Ok(self.put(task))
    }

    /// Insert or replace the row with `task.id`.
    pub fn put(&mut self, task: MirrorTask) -> u64 {
        let id = task.id;
        let completed = task.completed;
        if let Some(previous) = self.rows.insert(id, task) {
            if let Some(keys) = self.by_completed.get_mut(&previous.completed) {
                keys.remove(&id);
            }
        }
        self.by_completed.entry(completed).or_default().insert(id);
        id
    }

    pub fn get(&self, id: u64) -> Option<&MirrorTask> {
        self.rows.get(&id)
    }

    /// All rows in key order.
    pub fn get_all(&self) -> Vec<MirrorTask> {
        self.rows.values().cloned().collect()
    }

    pub fn get_all_by_completed(&self, completed: bool) -> Vec<MirrorTask> {
        self.by_completed
            .get(&completed)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rows.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Upsert the fixed mock rows. Safe to call repeatedly.
    pub fn insert_mock_data(&mut self) {
        for task in mock_tasks() {
            self.put(task);
        }
    }
}

pub fn mock_tasks() -> [MirrorTask; 4] {
    [
        MirrorTask::new(1, "Buy groceries", false),
        MirrorTask::new(2, "Complete project", true),
        MirrorTask::new(3, "Workout", false),
        MirrorTask::new(4, "Read a book", true),
    ]
}

/// Seed the mirror and read everything back, as the UI does on mount.
pub fn load_mirror(store: &mut MirrorStore) -> Vec<MirrorTask> {
    store.insert_mock_data();
    store.get_all()
}
