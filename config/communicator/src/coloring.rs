use std::collections::BTreeSet;

use crate::{CommResult, MPIEngine};

/// One color of a communication plan: exchange with a partner, or sit the round out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Round {
    Exchange(usize),
    Idle,
}

impl Round {
    #[inline]
    pub fn partner(&self) -> Option<usize> {
        match self {
            Round::Exchange(partner) => Some(*partner),
            Round::Idle => None,
        }
    }
}

/// Computes the plan of every rank from the directed send graph `send_lists[rank]`.
///
/// The graph is made undirected (a rank must take part in the rounds of the ranks that send to
/// it even when it has nothing to send back), then edges are colored greedily in lexicographic
/// order: each edge `(a, b)` with `a < b` gets the smallest color used neither at `a` nor at
/// `b`. Every color class is a matching, so each rank has at most one partner per round and
/// both ends of an edge meet in the same round. Greedy coloring needs at most `2 * max_degree - 1`
/// colors.
///
/// All rows have the same length. Self loops and ranks outside the world are ignored.
pub fn compute_schedule(world_size: usize, send_lists: &[Vec<usize>]) -> Vec<Vec<Round>> {
    debug_assert!(send_lists.len() <= world_size);

    let edges: BTreeSet<(usize, usize)> = send_lists
        .iter()
        .enumerate()
        .flat_map(|(source, destinations)| {
            destinations
                .iter()
                .filter(move |&&destination| destination != source && destination < world_size)
                .map(move |&destination| (source.min(destination), source.max(destination)))
        })
        .collect();

    // colors already taken at each rank
    let mut taken: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); world_size];
    let mut colored_edges = Vec::with_capacity(edges.len());
    let mut num_colors = 0;

    for (a, b) in edges {
        let mut color = 0;
        while taken[a].contains(&color) || taken[b].contains(&color) {
            color += 1;
        }
        taken[a].insert(color);
        taken[b].insert(color);
        num_colors = num_colors.max(color + 1);
        colored_edges.push((a, b, color));
    }

    let mut plans = vec![vec![Round::Idle; num_colors]; world_size];
    for (a, b, color) in colored_edges {
        plans[a][color] = Round::Exchange(b);
        plans[b][color] = Round::Exchange(a);
    }
    plans
}

/// Collective: computes this rank's plan from its destination ranks.
///
/// Every rank of the world must call this with its own list; the lists are all-gathered so
/// that all ranks run `compute_schedule` on identical input. A non-distributed run gets an empty
/// plan without communicating.
pub fn compute_communication_plan<C: MPIEngine>(
    comm: &C,
    send_list: &[usize],
) -> CommResult<Vec<Round>> {
    if !comm.is_distributed() {
        return Ok(Vec::new());
    }

    let mut send_list = send_list.to_vec();
    send_list.sort_unstable();
    send_list.dedup();

    let send_lists = comm.all_gather_varlen(&send_list)?;
    let plan = compute_schedule(comm.world_size(), &send_lists)
        .into_iter()
        .nth(comm.world_rank())
        .unwrap_or_default();

    log::debug!(
        "rank {}: communication plan with {} rounds, {} exchanges",
        comm.world_rank(),
        plan.len(),
        plan.iter().filter(|r| r.partner().is_some()).count()
    );
    Ok(plan)
}
