//! Bounded history of document snapshots used for rollback

use serde::Serialize;
use std::collections::VecDeque;

/// Document state captured before a stage runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Stage about to run when the snapshot was taken
    pub stage: String,

    /// Copy of the document text
    pub xml_data: String,

    /// Serialized copy of the parsed tree, if one existed
    pub xml_tree: Option<String>,
}

/// FIFO buffer of snapshots; the oldest entries are evicted first
#[derive(Debug, Clone, Default)]
pub struct SnapshotHistory {
    entries: VecDeque<Snapshot>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot, then evict from the front until at most `max` remain
    pub fn push(&mut self, snapshot: Snapshot, max: usize) {
        self.entries.push_back(snapshot);
        while self.entries.len() > max {
            self.entries.pop_front();
        }
    }

    /// Remove and return the most recent snapshot for `stage`, discarding
    /// every snapshot taken after it
    pub fn take_latest_for(&mut self, stage: &str) -> Option<Snapshot> {
        let index = self.entries.iter().rposition(|s| s.stage == stage)?;
        self.entries.truncate(index + 1);
        self.entries.pop_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    /// Stage names in capture order
    pub fn stage_names(&self) -> Vec<&str> {
        self.entries.iter().map(|s| s.stage.as_str()).collect()
    }
}
