use std::fmt::Debug;

use serdes::WireSerde;

use crate::{CommError, CommResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Communicator {
    Serial,
    Threads,
    MPI,
}

/// Rank context of a (possibly) distributed run.
///
/// Collectives must be entered by every rank of the world in the same order. None of the
/// methods may be called from inside a rayon parallel region.
pub trait MPIEngine: Debug + Send + Sync {
    const COMMUNICATOR: Communicator;

    const ROOT_RANK: usize = 0;

    /// Get the number of processes in the world
    fn world_size(&self) -> usize;

    /// Get the rank of the current process
    fn world_rank(&self) -> usize;

    #[inline(always)]
    /// Check if the current process is the root process
    fn is_root(&self) -> bool {
        self.world_rank() == Self::ROOT_RANK
    }

    #[inline(always)]
    /// Check if there is only one process in the world
    fn is_single_process(&self) -> bool {
        self.world_size() == 1
    }

    #[inline(always)]
    fn is_distributed(&self) -> bool {
        !self.is_single_process()
    }

    /// Barrier for all the processes
    fn barrier(&self);

    /// Every rank contributes a byte payload of arbitrary length and receives the payloads of
    /// all ranks, indexed by rank.
    fn all_gather_bytes(&self, local: &[u8]) -> CommResult<Vec<Vec<u8>>>;

    /// Blocking paired exchange: send `send` to `partner` and receive what `partner` sent to
    /// this rank with the same tag.
    fn send_recv_bytes(&self, send: &[u8], partner: usize, tag: i32) -> CommResult<Vec<u8>>;

    /// Typed variant of `all_gather_bytes`.
    fn all_gather_varlen<F: WireSerde>(&self, local: &F) -> CommResult<Vec<F>> {
        let mut bytes = Vec::new();
        local.serialize_into(&mut bytes)?;

        let gathered = self.all_gather_bytes(&bytes)?;
        if gathered.len() != self.world_size() {
            return Err(CommError::SizeMismatch {
                expected: self.world_size(),
                actual: gathered.len(),
            });
        }

        gathered
            .iter()
            .map(|b| F::deserialize_from(b.as_slice()).map_err(CommError::from))
            .collect()
    }

    /// Typed variant of `send_recv_bytes`.
    fn send_recv<S: WireSerde, R: WireSerde>(
        &self,
        data: &S,
        partner: usize,
        tag: i32,
    ) -> CommResult<R> {
        let mut bytes = Vec::new();
        data.serialize_into(&mut bytes)?;
        let received = self.send_recv_bytes(&bytes, partner, tag)?;
        Ok(R::deserialize_from(received.as_slice())?)
    }

    /// All ranks except the current one
    fn other_ranks(&self) -> Vec<usize> {
        (0..self.world_size())
            .filter(|rank| *rank != self.world_rank())
            .collect()
    }
}
