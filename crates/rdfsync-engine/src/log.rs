//! The operation log: an ordered buffer of pending mutation intents.
//!
//! Recording never deduplicates. Draining takes a snapshot and removes the
//! selected operations under one lock scope, so concurrent `record` calls
//! are neither lost nor drained twice.
//!
//! [`OperationLog::take`] hands the batch out as a [`DrainedBatch`], which
//! puts its operations back if it is dropped before the flush settles.

use std::collections::HashSet;

use parking_lot::Mutex;

use rdfsync_core::{Operation, OperationId};

/// Instance-owned buffer of operations awaiting the next flush.
#[derive(Debug, Default)]
pub struct OperationLog {
    entries: Mutex<Vec<Operation>>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `op` and returns its identifier.
    pub fn record(&self, op: Operation) -> OperationId {
        let id = op.id;
        self.entries.lock().push(op);
        id
    }

    /// Removes and returns the operations named in `ids` (all of them when
    /// `ids` is `None`), in recording order. Unknown ids are ignored.
    pub fn drain(&self, ids: Option<&[OperationId]>) -> Vec<Operation> {
        let mut entries = self.entries.lock();
        match ids {
            None => std::mem::take(&mut *entries),
            Some(ids) => {
                let wanted: HashSet<OperationId> = ids.iter().copied().collect();
                let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *entries)
                    .into_iter()
                    .partition(|op| wanted.contains(&op.id));
                *entries = kept;
                taken
            }
        }
    }

    /// Like [`drain`](Self::drain), but the batch returns to the log unless
    /// it is [settled](DrainedBatch::settle).
    pub fn take(&self, ids: Option<&[OperationId]>) -> DrainedBatch<'_> {
        DrainedBatch {
            log: self,
            ops: Some(self.drain(ids)),
        }
    }

    /// Puts drained operations back at the front of the log, ahead of
    /// anything recorded since.
    pub fn requeue(&self, ops: Vec<Operation>) {
        if ops.is_empty() {
            return;
        }
        let mut entries = self.entries.lock();
        let newer = std::mem::replace(&mut *entries, ops);
        entries.extend(newer);
    }

    /// Identifiers of pending operations, in recording order.
    pub fn pending_ids(&self) -> Vec<OperationId> {
        self.entries.lock().iter().map(|op| op.id).collect()
    }

    /// Copies of pending operations, in recording order.
    pub fn pending(&self) -> Vec<Operation> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Operations out of the log for one flush.
#[derive(Debug)]
pub struct DrainedBatch<'a> {
    log: &'a OperationLog,
    ops: Option<Vec<Operation>>,
}

impl DrainedBatch<'_> {
    pub fn operations(&self) -> &[Operation] {
        self.ops.as_deref().unwrap_or_default()
    }

    /// Releases the operations to the caller; they no longer return to the
    /// log.
    pub fn settle(mut self) -> Vec<Operation> {
        self.ops.take().unwrap_or_default()
    }
}

impl Drop for DrainedBatch<'_> {
    fn drop(&mut self) {
        if let Some(ops) = self.ops.take() {
            if !ops.is_empty() {
                tracing::warn!(operations = ops.len(), "flush abandoned; requeueing batch");
                self.log.requeue(ops);
            }
        }
    }
}
