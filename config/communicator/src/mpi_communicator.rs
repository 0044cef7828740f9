use std::{fmt::Debug, sync::Once};

use mpi::{
    datatype::PartitionMut,
    ffi,
    point_to_point::{send_receive_into_with_tags, send_receive_with_tags},
    topology::{Rank, SimpleCommunicator},
    traits::*,
    Count,
};

use crate::{
    common::{announced_count, check_pair_lengths, varcount_displacements},
    CommError, CommResult, Communicator, MPIEngine,
};

static MPI_INIT: Once = Once::new();

/// Rank context backed by `MPI_COMM_WORLD`.
///
/// Only the world's size and this process's rank are stored; the world handle is re-acquired
/// on every call so the struct stays `Send + Sync`. MPI calls are funneled: they are only made
/// from the thread driving the flush, never from rayon workers.
#[derive(Clone, PartialEq)]
pub struct MPICommunicator {
    pub world_size: i32,
    pub world_rank: i32,
}

impl Default for MPICommunicator {
    fn default() -> Self {
        Self {
            world_size: 1,
            world_rank: 0,
        }
    }
}

impl Debug for MPICommunicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MPICommunicator")
            .field("world_size", &self.world_size)
            .field("world_rank", &self.world_rank)
            .finish()
    }
}

impl MPICommunicator {
    // OK if already initialized, mpi::initialize() will return None
    fn init() {
        MPI_INIT.call_once(|| {
            if let Some(universe) = mpi::initialize() {
                // dropping the universe would finalize MPI; `finalize` does that explicitly
                std::mem::forget(universe);
            }
        });
    }

    #[inline]
    pub fn finalize() {
        unsafe { ffi::MPI_Finalize() };
    }

    pub fn new() -> Self {
        Self::init();
        let world = SimpleCommunicator::world();
        Self {
            world_size: world.size(),
            world_rank: world.rank(),
        }
    }

    #[inline(always)]
    fn world(&self) -> SimpleCommunicator {
        SimpleCommunicator::world()
    }
}

impl MPIEngine for MPICommunicator {
    const COMMUNICATOR: Communicator = Communicator::MPI;

    #[inline(always)]
    fn world_size(&self) -> usize {
        self.world_size as usize
    }

    #[inline(always)]
    fn world_rank(&self) -> usize {
        self.world_rank as usize
    }

    #[inline(always)]
    fn barrier(&self) {
        self.world().barrier();
    }

    fn all_gather_bytes(&self, local: &[u8]) -> CommResult<Vec<Vec<u8>>> {
        let world = self.world();

        let local_count: Count = announced_count(local.len());
        let mut counts = vec![0 as Count; self.world_size()];
        world.all_gather_into(&local_count, &mut counts[..]);

        let displs: Vec<Count> = varcount_displacements(self.world_rank(), &counts)?;
        let total = counts.iter().map(|&c| c as usize).sum::<usize>();

        let mut buffer = vec![0u8; total];
        {
            let mut partition = PartitionMut::new(&mut buffer[..], &counts[..], &displs[..]);
            world.all_gather_varcount_into(local, &mut partition);
        }

        Ok(counts
            .iter()
            .zip(displs.iter())
            .map(|(&count, &displ)| buffer[displ as usize..(displ + count) as usize].to_vec())
            .collect())
    }

    fn send_recv_bytes(&self, send: &[u8], partner: usize, tag: i32) -> CommResult<Vec<u8>> {
        if partner >= self.world_size() || partner == self.world_rank() {
            return Err(CommError::InvalidPartner {
                rank: self.world_rank(),
                partner,
                world_size: self.world_size(),
            });
        }
        let world = self.world();
        let process = world.process_at_rank(partner as Rank);

        // sizes first, so the receive buffer can be allocated exactly
        let send_len = send.len() as u64;
        let (recv_len, _status): (u64, _) =
            send_receive_with_tags(&send_len, &process, tag, &process, tag);
        check_pair_lengths(self.world_rank(), partner, send_len, recv_len)?;

        let mut buffer = vec![0u8; recv_len as usize];
        send_receive_into_with_tags(send, &process, tag, &mut buffer[..], &process, tag);

        log::trace!(
            "rank {} exchanged {} / {} bytes with rank {} (tag {})",
            self.world_rank,
            send.len(),
            recv_len,
            partner,
            tag
        );
        Ok(buffer)
    }
}
