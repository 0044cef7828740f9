use std::{collections::HashMap, fmt, hash::BuildHasher};

use communicator::{compute_communication_plan, CommResult, MPIEngine, Round};
use rayon::prelude::*;
use serdes::WireSerde;
use utils::timer::Timer;

use crate::{buffers::WorkerBuffers, ApplyProxy, EntityStore, GlobalPointer};

/// Counters of one `send_and_apply_remotely` call on one rank.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    /// Length of the communication plan, identical on every rank.
    pub rounds: usize,
    /// Rounds in which this rank met a partner.
    pub exchanges: usize,
    pub sent_updates: usize,
    pub received_updates: usize,
}

/// Buffers updates of entities owned by other ranks and ships them to their owners.
///
/// The communicator owns the staging buffers. An `ApplyProxy` borrows it mutably for one
/// assign/flush cycle: proxies assign (`Accumulating`), the flush drains and exchanges
/// (`Exchanging`), and the buffers are empty again once it returns. Since the flush needs the
/// proxy by `&mut`, no assign can run while it is in progress.
pub struct GlobalPointerMapCommunicator<'c, T, V: Send, C: MPIEngine> {
    comm: &'c C,
    current_rank: usize,
    buffers: WorkerBuffers<T, V>,
}

impl<'c, T, V, C> GlobalPointerMapCommunicator<'c, T, V, C>
where
    V: WireSerde + Clone + Send + Sync,
    C: MPIEngine,
{
    pub fn new(comm: &'c C) -> Self {
        debug_assert!(
            rayon::current_thread_index().is_none(),
            "Constructing a GlobalPointerMapCommunicator in a parallel region is not allowed."
        );

        let buffers = if comm.is_distributed() {
            WorkerBuffers::new(rayon::current_num_threads())
        } else {
            WorkerBuffers::empty()
        };

        Self {
            comm,
            current_rank: comm.world_rank(),
            buffers,
        }
    }

    /// Proxy applying `functor` to the entities of `store`, for one assign/flush cycle.
    pub fn apply_proxy<'a, F, S>(
        &'a mut self,
        functor: F,
        store: &'a S,
    ) -> ApplyProxy<'a, 'c, T, V, C, F, S>
    where
        F: Fn(&T, &V) + Sync,
        S: EntityStore<T> + ?Sized,
    {
        ApplyProxy::new(functor, store, self)
    }

    #[inline(always)]
    pub fn is_distributed(&self) -> bool {
        self.comm.is_distributed()
    }

    #[inline(always)]
    pub fn current_rank(&self) -> usize {
        self.current_rank
    }

    /// Number of buffered updates not yet sent, over all workers.
    pub fn pending_updates(&mut self) -> usize {
        self.buffers.pending()
    }

    #[inline(always)]
    pub(crate) fn buffers(&self) -> &WorkerBuffers<T, V> {
        &self.buffers
    }

    /// Ship every buffered update to its owning rank and hand the updates received from the
    /// other ranks to `apply`, which must resolve them locally.
    ///
    /// Collective over the world. On return all buffers are empty.
    pub(crate) fn send_and_apply_remotely<A>(&mut self, apply: A) -> CommResult<FlushStats>
    where
        A: Fn(&GlobalPointer<T>, &V) + Sync,
    {
        debug_assert!(
            rayon::current_thread_index().is_none(),
            "send_and_apply_remotely in a parallel region is not allowed."
        );

        if !self.is_distributed() {
            return Ok(FlushStats::default());
        }

        let timer = Timer::new("send_and_apply_remotely", self.comm.is_root());

        let mut non_local = self.buffers.drain_merged();
        let send_list = keys(&non_local);
        let plan = compute_communication_plan(self.comm, &send_list)?;
        timer.print(&format!("plan: {} rounds", plan.len()));

        let mut stats = FlushStats {
            rounds: plan.len(),
            ..Default::default()
        };

        for (round_index, round) in plan.iter().enumerate() {
            let partner = match *round {
                Round::Exchange(partner) => partner,
                Round::Idle => continue,
            };

            // the partner may expect data from us even if we have none for it
            let outgoing = non_local.remove(&partner).unwrap_or_default();
            stats.sent_updates += count_updates(&outgoing);

            let received: HashMap<GlobalPointer<T>, Vec<V>> =
                self.comm.send_recv(&outgoing, partner, round_index as i32)?;
            stats.received_updates += count_updates(&received);
            stats.exchanges += 1;

            log::trace!(
                "rank {}: round {} with rank {}: sent {} pointers, received {}",
                self.current_rank,
                round_index,
                partner,
                outgoing.len(),
                received.len()
            );

            self.apply_received(&apply, &received);
        }

        debug_assert!(
            non_local.is_empty(),
            "updates for ranks {:?} left unsent after the last round",
            keys(&non_local)
        );

        log::debug!(
            "rank {}: flushed in {} rounds, sent {} updates, received {}",
            self.current_rank,
            stats.rounds,
            stats.sent_updates,
            stats.received_updates
        );
        timer.stop();

        Ok(stats)
    }

    /// Keys of one received map are unique, so each entity is touched by a single task.
    fn apply_received<A>(&self, apply: &A, received: &HashMap<GlobalPointer<T>, Vec<V>>)
    where
        A: Fn(&GlobalPointer<T>, &V) + Sync,
    {
        received.par_iter().for_each(|(pointer, values)| {
            debug_assert!(
                pointer.is_local(self.current_rank),
                "received {} on rank {}",
                pointer,
                self.current_rank
            );
            values.iter().for_each(|value| apply(pointer, value));
        });
    }
}

fn count_updates<T, V>(map: &HashMap<GlobalPointer<T>, Vec<V>>) -> usize {
    map.values().map(Vec::len).sum()
}

/// Keys of a map, in the map's iteration order.
pub fn keys<K: Clone, X, H: BuildHasher>(map: &HashMap<K, X, H>) -> Vec<K> {
    map.keys().cloned().collect()
}

impl<T, V: Send, C: MPIEngine> fmt::Display for GlobalPointerMapCommunicator<'_, T, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GlobalPointerMapCommunicator(rank={}, size={})",
            self.current_rank,
            self.comm.world_size()
        )
    }
}
