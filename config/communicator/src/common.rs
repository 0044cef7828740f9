use crate::{CommError, CommResult};

/// Largest payload one MPI call can carry: counts and displacements are `i32`.
pub(crate) const MAX_MESSAGE_BYTES: usize = i32::MAX as usize;

/// Count announced for a payload in a variable-length all-gather; `-1` if it does not fit.
#[cfg_attr(not(feature = "mpi"), allow(dead_code))]
pub(crate) fn announced_count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(-1)
}

/// Displacements of the payloads of a variable-length all-gather.
///
/// Every rank sees the same counts, so every rank fails together when one payload was too
/// large to announce or when the payloads do not fit one receive buffer.
#[cfg_attr(not(feature = "mpi"), allow(dead_code))]
pub(crate) fn varcount_displacements(rank: usize, counts: &[i32]) -> CommResult<Vec<i32>> {
    let mut offset: i64 = 0;
    counts
        .iter()
        .enumerate()
        .map(|(peer, &count)| {
            let displ = offset;
            offset += count as i64;
            if count < 0 || offset > MAX_MESSAGE_BYTES as i64 {
                return Err(CommError::MessageTooLarge { rank, peer });
            }
            Ok(displ as i32)
        })
        .collect()
}

/// Both ends of a paired exchange know both lengths and reject the exchange together.
#[cfg_attr(not(feature = "mpi"), allow(dead_code))]
pub(crate) fn check_pair_lengths(
    rank: usize,
    peer: usize,
    send_len: u64,
    recv_len: u64,
) -> CommResult<()> {
    if send_len.max(recv_len) > MAX_MESSAGE_BYTES as u64 {
        return Err(CommError::MessageTooLarge { rank, peer });
    }
    Ok(())
}

/// Print only on the root rank.
#[macro_export]
macro_rules! root_println {
    ($config: expr, $($arg:tt)*) => {
        if $crate::MPIEngine::is_root($config) {
            println!($($arg)*);
        }
    };
}

/// Print on every rank, prefixed with the rank.
#[macro_export]
macro_rules! rank_println {
    ($config: expr, $($arg:tt)*) => {
        println!("[rank {}] {}", $crate::MPIEngine::world_rank($config), format!($($arg)*));
    };
}
