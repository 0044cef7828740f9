//! Cross-rank updates of entities addressed by global pointers.
//!
//! An entity lives on exactly one rank and is addressed everywhere by a `GlobalPointer`. Code
//! that computes contributions for entities it does not own hands them to an `ApplyProxy`:
//! contributions to local entities are applied at once, the others are buffered per worker
//! thread and per destination rank. `send_and_apply_remotely` then ships every buffer to the
//! owning rank, following a round based plan in which each rank meets at most one partner per
//! round, and applies what it received.
//!
//! The apply functor is called concurrently and in no particular order, so it has to be
//! thread safe and the combination it performs commutative and associative (a sum, a max, ...).
//!
//! ```ignore
//! let comm = SerialConfig::new();
//! let mut map_comm = GlobalPointerMapCommunicator::<Node, f64, _>::new(&comm);
//! let mut proxy = map_comm.apply_proxy(|node: &Node, v: &f64| node.add(*v), &nodes);
//! proxy.assign_map(&contributions);
//! proxy.send_and_apply_remotely()?;
//! ```

mod apply_proxy;
mod buffers;
mod global_pointer;
mod map_communicator;

pub use apply_proxy::ApplyProxy;
pub use global_pointer::{global_pointers, EntityStore, GlobalPointer, GlobalPointersMap};
pub use map_communicator::{keys, FlushStats, GlobalPointerMapCommunicator};
