//! The to-play queue: an ordered, duplicate-free list of entries with
//! drag-style reindexing.
//!
//! Everything here is synchronous and in-memory. Persisting the order is the
//! caller's job.

use std::collections::HashSet;

use crate::game::{GameId, QueueEntry};

/// Errors from local queue manipulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    IndexOutOfRange { index: usize, len: usize },
    NoActiveMove,
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for queue of length {len}")
            },
            Self::NoActiveMove => write!(f, "no move in progress"),
        }
    }
}

impl std::error::Error for QueueError {}

/// Move the element at `from` to `to`, shifting everything in between by one.
///
/// Untouched elements keep their relative order. Both indices must be in
/// bounds.
pub fn splice_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Ordered to-play entries plus the source index of an in-progress move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queue {
    entries: Vec<QueueEntry>,
    moving: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<QueueEntry>) -> Self {
        let mut queue = Self::new();
        queue.replace(entries);
        queue
    }

    /// Replace the whole sequence, dropping duplicate ids (first occurrence
    /// wins) and cancelling any move in progress.
    pub fn replace(&mut self, entries: Vec<QueueEntry>) {
        let mut seen = HashSet::with_capacity(entries.len());
        let before = entries.len();
        self.entries = entries
            .into_iter()
            .filter(|e| seen.insert(e.id.clone()))
            .collect();
        if self.entries.len() != before {
            tracing::warn!(
                dropped = before - self.entries.len(),
                "Dropped duplicate queue entries"
            );
        }
        self.moving = None;
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Identifiers in queue order.
    pub fn ids(&self) -> Vec<GameId> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, id: &GameId) -> Option<usize> {
        self.entries.iter().position(|e| &e.id == id)
    }

    /// Index currently tracked as the moving entry, if a move is in progress.
    pub fn moving_index(&self) -> Option<usize> {
        self.moving
    }

    pub fn is_moving(&self) -> bool {
        self.moving.is_some()
    }

    /// Start relocating the entry at `source_index`.
    pub fn begin_move(&mut self, source_index: usize) -> Result<(), QueueError> {
        if source_index >= self.entries.len() {
            return Err(QueueError::IndexOutOfRange {
                index: source_index,
                len: self.entries.len(),
            });
        }
        self.moving = Some(source_index);
        Ok(())
    }

    /// Relocate the moving entry to `target_index` (clamped into range) and
    /// track it there. Returns the index the entry now occupies.
    ///
    /// Repeating the same call is a no-op.
    pub fn move_to(&mut self, target_index: usize) -> Result<usize, QueueError> {
        let source = self.moving.ok_or(QueueError::NoActiveMove)?;
        let target = target_index.min(self.entries.len().saturating_sub(1));
        if target != source {
            splice_move(&mut self.entries, source, target);
            self.moving = Some(target);
        }
        Ok(target)
    }

    /// Finish the move, returning the final index of the moved entry.
    pub fn end_move(&mut self) -> Option<usize> {
        self.moving.take()
    }

    /// Remove an entry by id. Cancels a move in progress, since indices shift.
    pub fn remove(&mut self, id: &GameId) -> Option<QueueEntry> {
        let index = self.position(id)?;
        self.moving = None;
        Some(self.entries.remove(index))
    }
}
