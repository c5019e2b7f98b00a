//! Pending-batch bookkeeping for archive parts

use std::path::PathBuf;

/// Completed files waiting to be archived
///
/// Only the drain side of the orchestrator touches this; workers hand back
/// paths and never see the batch.
#[derive(Debug)]
pub(crate) struct PendingBatch {
    archive_name: String,
    threshold: usize,
    next_part: u32,
    files: Vec<PathBuf>,
}

impl PendingBatch {
    pub(crate) fn new(archive_name: impl Into<String>, threshold: usize) -> Self {
        Self {
            archive_name: archive_name.into(),
            threshold: threshold.max(1),
            next_part: 1,
            files: Vec::new(),
        }
    }

    /// Add a completed file; returns true once the batch is full
    pub(crate) fn push(&mut self, file: PathBuf) -> bool {
        self.files.push(file);
        self.files.len() >= self.threshold
    }

    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }

    /// Take the pending files together with the archive name for the next part
    ///
    /// Returns `None` for an empty batch, without consuming a part number.
    pub(crate) fn take(&mut self) -> Option<(String, Vec<PathBuf>)> {
        if self.files.is_empty() {
            return None;
        }
        let name = format!("{}_part_{}.zip", self.archive_name, self.next_part);
        self.next_part += 1;
        Some((name, std::mem::take(&mut self.files)))
    }
}
