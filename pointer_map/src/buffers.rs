use std::{cell::RefCell, collections::HashMap};

use thread_local::ThreadLocal;

use crate::GlobalPointer;

/// Updates one worker has for one destination rank, kept as two parallel vectors so that
/// buffering an update is two pushes and no lookup.
pub(crate) struct RankBuffer<T, V> {
    pointers: Vec<GlobalPointer<T>>,
    values: Vec<V>,
}

impl<T, V> Default for RankBuffer<T, V> {
    fn default() -> Self {
        Self {
            pointers: Vec::new(),
            values: Vec::new(),
        }
    }
}

/// Pending updates grouped by destination rank, then by pointer.
pub(crate) type NonLocalMap<T, V> = HashMap<usize, HashMap<GlobalPointer<T>, Vec<V>>>;

type Slot<T, V> = RefCell<HashMap<usize, RankBuffer<T, V>>>;

/// One buffer slot per thread that ever buffered an update, rayon worker or not.
///
/// A thread only ever touches its own slot while assigning. Reading the slots of all threads
/// needs `&mut self`, so merging cannot overlap with buffering.
pub(crate) struct WorkerBuffers<T, V: Send> {
    slots: ThreadLocal<Slot<T, V>>,
}

impl<T, V: Send> WorkerBuffers<T, V> {
    pub(crate) fn new(num_workers: usize) -> Self {
        Self {
            // the extra slot is for the thread driving the pool
            slots: ThreadLocal::with_capacity(num_workers + 1),
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            slots: ThreadLocal::new(),
        }
    }

    #[inline]
    pub(crate) fn push(&self, pointer: GlobalPointer<T>, value: V) {
        let mut slot = self.slots.get_or_default().borrow_mut();
        let buffer = slot.entry(pointer.rank()).or_default();
        buffer.pointers.push(pointer);
        buffer.values.push(value);
    }

    pub(crate) fn pending(&mut self) -> usize {
        self.slots
            .iter_mut()
            .map(|slot| {
                slot.get_mut()
                    .values()
                    .map(|buffer| buffer.pointers.len())
                    .sum::<usize>()
            })
            .sum()
    }

    /// Empty every slot and merge the contents by destination rank and pointer.
    pub(crate) fn drain_merged(&mut self) -> NonLocalMap<T, V> {
        let mut merged: NonLocalMap<T, V> = HashMap::new();

        for slot in self.slots.iter_mut() {
            for (rank, buffer) in slot.get_mut().drain() {
                let per_rank = merged.entry(rank).or_default();
                for (pointer, value) in buffer.pointers.into_iter().zip(buffer.values) {
                    per_rank.entry(pointer).or_default().push(value);
                }
            }
        }

        merged
    }
}
