//! Rank context used by the global pointer layer.
//!
//! - `MPIEngine`: the narrow interface every backend implements (rank, size, barrier,
//!   variable-length all-gather, paired send/receive)
//! - `SerialConfig`: single process run, all collectives degrade to identity
//! - `ThreadCommunicator`: several ranks simulated by threads of one process
//! - `MPICommunicator`: real MPI run, behind the `mpi` feature
//! - `compute_schedule` / `compute_communication_plan`: round based exchange plan

mod coloring;
mod common;
mod error;
mod serial_communicator;
mod thread_communicator;
mod traits;

#[cfg(feature = "mpi")]
mod mpi_communicator;

pub use coloring::{compute_communication_plan, compute_schedule, Round};
pub use error::{CommError, CommResult};
pub use serial_communicator::SerialConfig;
pub use thread_communicator::ThreadCommunicator;
pub use traits::{Communicator, MPIEngine};

#[cfg(feature = "mpi")]
pub use mpi_communicator::MPICommunicator;
