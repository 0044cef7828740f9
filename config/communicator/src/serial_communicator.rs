use crate::{CommError, CommResult, Communicator, MPIEngine};

/// Rank context of a run without MPI: one process, rank 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerialConfig;

impl SerialConfig {
    pub fn new() -> Self {
        Self
    }
}

impl MPIEngine for SerialConfig {
    const COMMUNICATOR: Communicator = Communicator::Serial;

    #[inline(always)]
    fn world_size(&self) -> usize {
        1
    }

    #[inline(always)]
    fn world_rank(&self) -> usize {
        0
    }

    #[inline(always)]
    fn barrier(&self) {}

    #[inline]
    fn all_gather_bytes(&self, local: &[u8]) -> CommResult<Vec<Vec<u8>>> {
        Ok(vec![local.to_vec()])
    }

    fn send_recv_bytes(&self, _send: &[u8], partner: usize, _tag: i32) -> CommResult<Vec<u8>> {
        Err(CommError::InvalidPartner {
            rank: 0,
            partner,
            world_size: 1,
        })
    }
}
