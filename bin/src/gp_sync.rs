use std::{
    panic,
    sync::atomic::{AtomicI64, Ordering},
    thread,
};

use clap::{Parser, ValueEnum};
use communicator::{root_println, CommResult, MPIEngine, SerialConfig, ThreadCommunicator};
use pointer_map::{GlobalPointer, GlobalPointerMapCommunicator, GlobalPointersMap};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

#[cfg(feature = "mpi")]
use communicator::MPICommunicator;

/// Drives the global pointer layer on a toy mesh: every rank owns some nodes, computes
/// contributions for nodes anywhere in the world and synchronizes them.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Rank context to run on
    #[arg(short, long, value_enum, default_value_t = Backend::Threads)]
    backend: Backend,

    /// Number of simulated ranks, threads backend only
    #[arg(short, long, default_value_t = 3)]
    ranks: usize,

    /// What to run
    #[arg(short, long, value_enum, default_value_t = Scenario::Temperature)]
    scenario: Scenario,

    /// Nodes owned by each rank, random scenario only
    #[arg(short, long, default_value_t = 1000)]
    nodes: usize,

    /// Updates generated by each rank, random scenario only
    #[arg(short, long, default_value_t = 100_000)]
    updates: usize,

    /// Seed of the update generator
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Serial,
    Threads,
    /// Needs the `mpi` feature; launch with mpiexec
    Mpi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Three nodes spread round robin, contributions from two ranks
    Temperature,
    /// Random contributions to random nodes of every rank
    Random,
}

struct Node {
    temperature: AtomicI64,
}

impl Node {
    fn new(temperature: i64) -> Self {
        Self {
            temperature: AtomicI64::new(temperature),
        }
    }

    fn temperature(&self) -> i64 {
        self.temperature.load(Ordering::Relaxed)
    }
}

fn add_temperature(node: &Node, value: &i64) {
    node.temperature.fetch_add(*value, Ordering::Relaxed);
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    log::info!("{:?}", args);

    let result = match args.backend {
        Backend::Serial => run_rank(&SerialConfig::new(), &args),
        Backend::Threads => run_threads(&args),
        Backend::Mpi => run_mpi(&args),
    };

    if let Err(e) = result {
        log::error!("gp-sync failed: {}", e);
        std::process::exit(1);
    }
}

fn run_threads(args: &Args) -> CommResult<()> {
    let handles: Vec<_> = ThreadCommunicator::world(args.ranks.max(1))
        .into_iter()
        .map(|comm| {
            let args = args.clone();
            thread::spawn(move || run_rank(&comm, &args))
        })
        .collect();

    // join every rank before reporting the first failure
    let results: Vec<CommResult<()>> = handles
        .into_iter()
        .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
        .collect();
    results.into_iter().collect()
}

#[cfg(feature = "mpi")]
fn run_mpi(args: &Args) -> CommResult<()> {
    let result = run_rank(&MPICommunicator::new(), args);
    MPICommunicator::finalize();
    result
}

#[cfg(not(feature = "mpi"))]
fn run_mpi(_args: &Args) -> CommResult<()> {
    log::error!("gp-sync was built without the `mpi` feature");
    std::process::exit(1);
}

fn run_rank<C: MPIEngine>(comm: &C, args: &Args) -> CommResult<()> {
    match args.scenario {
        Scenario::Temperature => temperature(comm),
        Scenario::Random => random(comm, args),
    }
}

/// Nodes 1, 2, 3 start at 10, 20, 5. Logical rank 0 contributes {1: 5, 2: 10}, logical rank 1
/// contributes {1: 6, 3: 2}; logical ranks are folded onto the actual world. The result is
/// 21, 30, 7 whatever the world size.
fn temperature<C: MPIEngine>(comm: &C) -> CommResult<()> {
    const INITIAL: [i64; 3] = [10, 20, 5];
    const EXPECTED: [i64; 3] = [21, 30, 7];

    let world_size = comm.world_size();
    let rank = comm.world_rank();
    let pointer_of =
        |id: usize| GlobalPointer::<Node>::new((id - 1) % world_size, (id - 1) / world_size);

    let owned: Vec<usize> = (1..=3).filter(|id| (id - 1) % world_size == rank).collect();
    let nodes: Vec<Node> = owned.iter().map(|id| Node::new(INITIAL[id - 1])).collect();

    let contributions: [&[(usize, i64)]; 2] = [&[(1, 5), (2, 10)], &[(1, 6), (3, 2)]];
    let mut map_comm = GlobalPointerMapCommunicator::<Node, i64, _>::new(comm);
    let mut proxy = map_comm.apply_proxy(add_temperature, &nodes);

    for (logical_rank, updates) in contributions.iter().enumerate() {
        if logical_rank % world_size != rank {
            continue;
        }
        let updates: GlobalPointersMap<Node, i64> = updates
            .iter()
            .map(|(id, value)| (pointer_of(*id), *value))
            .collect();
        proxy.assign_map(&updates);
    }

    let pending = proxy.pending_updates();
    log::info!("{}: {} updates pending", proxy.communicator(), pending);
    let stats = proxy.send_and_apply_remotely()?;
    log::info!("{}: {:?}", proxy.communicator(), stats);

    let local: Vec<(usize, i64)> = owned
        .iter()
        .zip(nodes.iter())
        .map(|(id, node)| (*id, node.temperature()))
        .collect();
    let mut all: Vec<(usize, i64)> = comm
        .all_gather_varlen(&local)?
        .into_iter()
        .flatten()
        .collect();
    all.sort_unstable();

    for (id, temperature) in all.iter() {
        root_println!(
            comm,
            "node {}: TEMPERATURE = {} (expected {})",
            id,
            temperature,
            EXPECTED[id - 1]
        );
    }
    if all.iter().any(|(id, temperature)| *temperature != EXPECTED[id - 1]) {
        log::warn!("rank {}: temperatures differ from the expected values", rank);
    }
    Ok(())
}

/// Every rank sends `updates` random contributions to random nodes of the world; the total
/// temperature after the flush must equal the sum of all contributions.
fn random<C: MPIEngine>(comm: &C, args: &Args) -> CommResult<()> {
    let world_size = comm.world_size();
    let rank = comm.world_rank();

    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(rank as u64));
    let updates: Vec<(GlobalPointer<Node>, i64)> = (0..args.updates)
        .map(|_| {
            let pointer = GlobalPointer::new(
                rng.gen_range(0..world_size),
                rng.gen_range(0..args.nodes.max(1)),
            );
            (pointer, rng.gen_range(-1000..1000))
        })
        .collect();
    let contributed: i64 = updates.iter().map(|(_, value)| value).sum();

    let nodes: Vec<Node> = (0..args.nodes.max(1)).map(|_| Node::new(0)).collect();
    let mut map_comm = GlobalPointerMapCommunicator::<Node, i64, _>::new(comm);
    let mut proxy = map_comm.apply_proxy(add_temperature, &nodes);

    updates
        .par_iter()
        .for_each(|(pointer, value)| proxy.assign(pointer, value));
    let stats = proxy.send_and_apply_remotely()?;
    log::info!("{}: {:?}", proxy.communicator(), stats);

    let held: i64 = nodes.iter().map(Node::temperature).sum();
    let totals = comm.all_gather_varlen(&(contributed, held))?;
    let contributed_total: i64 = totals.iter().map(|(c, _)| c).sum();
    let held_total: i64 = totals.iter().map(|(_, h)| h).sum();

    root_println!(
        comm,
        "{} ranks, {} updates each: contributed {}, held {}",
        world_size,
        args.updates,
        contributed_total,
        held_total
    );
    if contributed_total != held_total {
        log::warn!("rank {}: lost or duplicated updates", rank);
    }
    Ok(())
}
