//! Iterable and iterator state over a shared snapshot.
//!
//! # Invariants
//! - `-1 <= index <= len` at all times.
//! - "Has current" holds exactly when `0 <= index < len`.
//! - Iterators only read the snapshot; all of them share one allocation.

use super::snapshot::{Item, Snapshot};
use crate::abi::Guid;
use crate::error::{InteropError, InteropResult};
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

const UNINITIALIZED: isize = -1;

/// Host state of an iterable object.
#[derive(Debug)]
pub struct ArrayIterable {
    snapshot: Arc<Snapshot>,
    item_signature: String,
    iterator_iid: Guid,
}

impl ArrayIterable {
    pub fn new(snapshot: Snapshot, item_signature: impl Into<String>, iterator_iid: Guid) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            item_signature: item_signature.into(),
            iterator_iid,
        }
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn item_signature(&self) -> &str {
        &self.item_signature
    }

    pub fn iterator_iid(&self) -> Guid {
        self.iterator_iid
    }

    /// A fresh, uninitialized iterator over the same snapshot.
    pub fn first(&self) -> ArrayIterator {
        ArrayIterator::new(Arc::clone(&self.snapshot))
    }
}

/// Where an iterator stands in its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    Uninitialized,
    Positioned(usize),
    Exhausted,
}

/// Host state of an iterator object.
#[derive(Debug)]
pub struct ArrayIterator {
    snapshot: Arc<Snapshot>,
    index: AtomicIsize,
}

impl ArrayIterator {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            index: AtomicIsize::new(UNINITIALIZED),
        }
    }

    fn len(&self) -> isize {
        self.snapshot.len() as isize
    }

    fn index(&self) -> isize {
        self.index.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> IteratorState {
        match self.index() {
            index if index < 0 => IteratorState::Uninitialized,
            index if index >= self.len() => IteratorState::Exhausted,
            index => IteratorState::Positioned(index as usize),
        }
    }

    pub fn has_current(&self) -> bool {
        matches!(self.state(), IteratorState::Positioned(_))
    }

    pub fn current(&self) -> InteropResult<Item> {
        match self.state() {
            IteratorState::Positioned(index) => self.snapshot.get(index).ok_or(
                InteropError::OutOfRange {
                    index: index as isize,
                    len: self.snapshot.len(),
                },
            ),
            _ => Err(InteropError::OutOfRange {
                index: self.index(),
                len: self.snapshot.len(),
            }),
        }
    }

    /// Advances one step, saturating at the end, and reports "has current".
    pub fn move_next(&self) -> bool {
        let next = (self.index() + 1).min(self.len());
        self.index.store(next, Ordering::Relaxed);
        self.has_current()
    }

    /// Takes up to `capacity` items from the current position on.
    ///
    /// An uninitialized iterator starts at the first item. The index ends
    /// just past the last returned item; an empty result leaves it as is.
    pub fn get_many(&self, capacity: usize) -> &[Item] {
        let start = self.index().max(0) as usize;
        let taken = self.snapshot.window(start, capacity);
        if !taken.is_empty() {
            self.index
                .store((start + taken.len()) as isize, Ordering::Relaxed);
        }
        taken
    }
}
