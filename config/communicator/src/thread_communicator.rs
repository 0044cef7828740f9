use std::{
    fmt::Debug,
    sync::{mpsc, Arc, Barrier, Mutex},
};

use crate::{CommError, CommResult, Communicator, MPIEngine};

/// Tag reserved for the all-gather collective; user tags are non-negative like MPI tags.
const ALL_GATHER_TAG: i32 = -1;

#[derive(Debug)]
struct Envelope {
    source: usize,
    tag: i32,
    payload: Vec<u8>,
}

/// A world of ranks living in one process, one rank per OS thread.
///
/// Every rank owns a mailbox; sends never block. A receive waits for the first envelope with the
/// requested `(source, tag)`, parking envelopes that arrive out of order. A rank whose partner
/// never shows up blocks forever, like a real MPI run.
#[derive(Clone)]
pub struct ThreadCommunicator {
    pub world_size: usize,
    pub world_rank: usize,
    senders: Vec<mpsc::Sender<Envelope>>,
    receiver: Arc<Mutex<mpsc::Receiver<Envelope>>>,
    parked: Arc<Mutex<Vec<Envelope>>>,
    barrier: Arc<Barrier>,
}

impl Debug for ThreadCommunicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadCommunicator")
            .field("world_size", &self.world_size)
            .field("world_rank", &self.world_rank)
            .finish()
    }
}

// Note: equality does not compare mailboxes
impl PartialEq for ThreadCommunicator {
    fn eq(&self, other: &Self) -> bool {
        self.world_rank == other.world_rank && self.world_size == other.world_size
    }
}

impl ThreadCommunicator {
    /// Create the communicators of all ranks of a world of `world_size`. Entry `i` is rank `i`
    /// and is meant to be moved into the thread that plays that rank.
    pub fn world(world_size: usize) -> Vec<Self> {
        assert!(world_size > 0, "a world needs at least one rank");

        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..world_size).map(|_| mpsc::channel::<Envelope>()).unzip();
        let barrier = Arc::new(Barrier::new(world_size));

        receivers
            .into_iter()
            .enumerate()
            .map(|(world_rank, receiver)| Self {
                world_size,
                world_rank,
                senders: senders.clone(),
                receiver: Arc::new(Mutex::new(receiver)),
                parked: Arc::new(Mutex::new(Vec::new())),
                barrier: barrier.clone(),
            })
            .collect()
    }

    fn send(&self, destination: usize, tag: i32, payload: Vec<u8>) -> CommResult<()> {
        log::trace!(
            "rank {} -> rank {} tag {} ({} bytes)",
            self.world_rank,
            destination,
            tag,
            payload.len()
        );
        self.senders[destination]
            .send(Envelope {
                source: self.world_rank,
                tag,
                payload,
            })
            .map_err(|_| CommError::Disconnected {
                rank: self.world_rank,
                peer: destination,
            })
    }

    fn receive(&self, source: usize, tag: i32) -> CommResult<Vec<u8>> {
        let disconnected = || CommError::Disconnected {
            rank: self.world_rank,
            peer: source,
        };

        {
            let mut parked = self.parked.lock().map_err(|_| disconnected())?;
            if let Some(pos) = parked
                .iter()
                .position(|e| e.source == source && e.tag == tag)
            {
                return Ok(parked.remove(pos).payload);
            }
        }

        let receiver = self.receiver.lock().map_err(|_| disconnected())?;
        loop {
            let envelope = receiver.recv().map_err(|_| disconnected())?;
            if envelope.source == source && envelope.tag == tag {
                log::trace!(
                    "rank {} <- rank {} tag {} ({} bytes)",
                    self.world_rank,
                    source,
                    tag,
                    envelope.payload.len()
                );
                return Ok(envelope.payload);
            }
            self.parked
                .lock()
                .map_err(|_| disconnected())?
                .push(envelope);
        }
    }

    fn check_partner(&self, partner: usize) -> CommResult<()> {
        if partner >= self.world_size || partner == self.world_rank {
            return Err(CommError::InvalidPartner {
                rank: self.world_rank,
                partner,
                world_size: self.world_size,
            });
        }
        Ok(())
    }
}

impl MPIEngine for ThreadCommunicator {
    const COMMUNICATOR: Communicator = Communicator::Threads;

    #[inline(always)]
    fn world_size(&self) -> usize {
        self.world_size
    }

    #[inline(always)]
    fn world_rank(&self) -> usize {
        self.world_rank
    }

    fn barrier(&self) {
        self.barrier.wait();
    }

    fn all_gather_bytes(&self, local: &[u8]) -> CommResult<Vec<Vec<u8>>> {
        for peer in self.other_ranks() {
            self.send(peer, ALL_GATHER_TAG, local.to_vec())?;
        }

        (0..self.world_size)
            .map(|peer| {
                if peer == self.world_rank {
                    Ok(local.to_vec())
                } else {
                    self.receive(peer, ALL_GATHER_TAG)
                }
            })
            .collect()
    }

    fn send_recv_bytes(&self, send: &[u8], partner: usize, tag: i32) -> CommResult<Vec<u8>> {
        self.check_partner(partner)?;
        debug_assert!(tag >= 0, "negative tags are reserved for collectives");

        // mailboxes are unbounded, so sending first cannot deadlock the pair
        self.send(partner, tag, send.to_vec())?;
        self.receive(partner, tag)
    }
}
