#![allow(dead_code)]

use std::{
    sync::atomic::{AtomicI64, Ordering},
    thread,
};

use communicator::ThreadCommunicator;

/// Entity with a thread safe scalar field, like a mesh node carrying a temperature.
#[derive(Debug, Default)]
pub struct Node {
    pub value: AtomicI64,
}

impl Node {
    pub fn new(value: i64) -> Self {
        Self {
            value: AtomicI64::new(value),
        }
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}

pub fn add(node: &Node, value: &i64) {
    node.value.fetch_add(*value, Ordering::SeqCst);
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Runs `f` once per rank of a simulated world, each rank on its own thread, and returns the
/// results ordered by rank.
pub fn run_world<R, F>(world_size: usize, f: F) -> Vec<R>
where
    R: Send + 'static,
    F: Fn(ThreadCommunicator) -> R + Send + Sync + Clone + 'static,
{
    init_logger();
    let handles: Vec<_> = ThreadCommunicator::world(world_size)
        .into_iter()
        .map(|comm| {
            let f = f.clone();
            thread::spawn(move || f(comm))
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}
