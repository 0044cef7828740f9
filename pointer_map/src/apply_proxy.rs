use communicator::{CommResult, MPIEngine};
use rayon::prelude::*;
use serdes::WireSerde;

use crate::{
    EntityStore, FlushStats, GlobalPointer, GlobalPointerMapCommunicator, GlobalPointersMap,
};

/// Entry point for updating entities through global pointers.
///
/// Updates of local entities go straight to the functor; updates of entities owned by other
/// ranks are buffered in the communicator until `send_and_apply_remotely`.
///
/// Example (three ranks, one node each, a summing functor):
///
/// | node | rank | initial | rank 0 assigns | rank 1 assigns | after flush |
/// |------|------|---------|----------------|----------------|-------------|
/// | 1    | 0    | 10      | 5              | 6              | 21          |
/// | 2    | 1    | 20      | 10             |                | 30          |
/// | 3    | 2    | 5       |                | 2              | 7           |
pub struct ApplyProxy<'a, 'c, T, V, C, F, S>
where
    V: Send,
    C: MPIEngine,
    S: EntityStore<T> + ?Sized,
{
    current_rank: usize,
    functor: F,
    store: &'a S,
    communicator: &'a mut GlobalPointerMapCommunicator<'c, T, V, C>,
    // bound once at construction: serial runs never look at the pointer's rank
    update: fn(&Self, &GlobalPointer<T>, &V),
}

impl<'a, 'c, T, V, C, F, S> ApplyProxy<'a, 'c, T, V, C, F, S>
where
    V: WireSerde + Clone + Send + Sync,
    C: MPIEngine,
    F: Fn(&T, &V) + Sync,
    S: EntityStore<T> + ?Sized,
{
    pub(crate) fn new(
        functor: F,
        store: &'a S,
        communicator: &'a mut GlobalPointerMapCommunicator<'c, T, V, C>,
    ) -> Self {
        let update: fn(&Self, &GlobalPointer<T>, &V) = if communicator.is_distributed() {
            Self::assign_local_and_remote
        } else {
            Self::assign_local
        };

        Self {
            current_rank: communicator.current_rank(),
            functor,
            store,
            communicator,
            update,
        }
    }

    #[inline(always)]
    pub fn current_rank(&self) -> usize {
        self.current_rank
    }

    #[inline(always)]
    pub fn is_distributed(&self) -> bool {
        self.communicator.is_distributed()
    }

    #[inline(always)]
    pub fn communicator(&self) -> &GlobalPointerMapCommunicator<'c, T, V, C> {
        &*self.communicator
    }

    /// Updates buffered for other ranks and not sent yet.
    pub fn pending_updates(&mut self) -> usize {
        self.communicator.pending_updates()
    }

    /// Apply `value` to the entity behind `pointer`, now if it is local, at the next
    /// `send_and_apply_remotely` otherwise. Safe to call from many threads at once.
    ///
    /// A flush borrows the proxy mutably, so assigning while one runs does not compile:
    ///
    /// ```compile_fail
    /// use communicator::ThreadCommunicator;
    /// use pointer_map::{GlobalPointer, GlobalPointerMapCommunicator};
    ///
    /// let comm = ThreadCommunicator::world(1).remove(0);
    /// let nodes = vec![0u64];
    /// let mut map_comm = GlobalPointerMapCommunicator::<u64, u64, _>::new(&comm);
    /// let mut proxy = map_comm.apply_proxy(|_: &u64, _: &u64| {}, &nodes);
    /// let assigner = &proxy;
    /// proxy.send_and_apply_remotely().unwrap();
    /// assigner.assign(&GlobalPointer::new(0, 0), &1);
    /// ```
    #[inline(always)]
    pub fn assign(&self, pointer: &GlobalPointer<T>, value: &V) {
        (self.update)(self, pointer, value)
    }

    /// Assign every entry of `map`, in parallel.
    pub fn assign_map(&self, map: &GlobalPointersMap<T, V>) {
        debug_assert!(
            rayon::current_thread_index().is_none(),
            "Assigning map of values in a parallel region is not allowed."
        );

        map.par_iter()
            .for_each(|(pointer, value)| self.assign(pointer, value));
    }

    /// Exchange the buffered updates with the other ranks and apply the ones received through
    /// the local path.
    ///
    /// Collective: all ranks must call it. Call it as rarely as possible, and never from a
    /// parallel region.
    pub fn send_and_apply_remotely(&mut self) -> CommResult<FlushStats> {
        let current_rank = self.current_rank;
        let functor = &self.functor;
        let store = self.store;

        self.communicator
            .send_and_apply_remotely(|pointer: &GlobalPointer<T>, value: &V| {
                functor(pointer.dereference(store, current_rank), value)
            })
    }

    #[inline]
    fn assign_local(&self, pointer: &GlobalPointer<T>, value: &V) {
        let entity = pointer.dereference(self.store, self.current_rank);
        (self.functor)(entity, value);
    }

    #[inline]
    fn assign_local_and_remote(&self, pointer: &GlobalPointer<T>, value: &V) {
        if pointer.is_local(self.current_rank) {
            self.assign_local(pointer, value);
        } else {
            self.communicator.buffers().push(*pointer, value.clone());
        }
    }
}
