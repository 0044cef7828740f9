use serdes::SerdeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommError {
    #[error("wire serde error: {0:?}")]
    Serde(#[from] SerdeError),

    #[error("rank {rank} cannot exchange with partner {partner} in a world of size {world_size}")]
    InvalidPartner {
        rank: usize,
        partner: usize,
        world_size: usize,
    },

    #[error("rank {rank} lost its channel to rank {peer}")]
    Disconnected { rank: usize, peer: usize },

    #[error("rank {rank}: payload for rank {peer} exceeds the size limit of one call")]
    MessageTooLarge { rank: usize, peer: usize },

    #[error("collective returned {actual} payloads, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

pub type CommResult<T> = std::result::Result<T, CommError>;
