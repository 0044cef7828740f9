mod common;

use std::collections::HashMap;

use communicator::MPIEngine;
use pointer_map::{GlobalPointer, GlobalPointerMapCommunicator, GlobalPointersMap};
use rand::{rngs::StdRng, Rng, SeedableRng};

use common::{add, run_world, Node};

#[test]
fn test_temperature_on_three_ranks() {
    // node 1 on rank 0, node 2 on rank 1, node 3 on rank 2, one node per rank
    let temperatures = run_world(3, |comm| {
        let rank = comm.world_rank();
        let nodes = vec![Node::new([10, 20, 5][rank])];
        let node = |owner: usize| GlobalPointer::<Node>::new(owner, 0);

        let mut map_comm = GlobalPointerMapCommunicator::<Node, i64, _>::new(&comm);
        let mut proxy = map_comm.apply_proxy(add, &nodes);

        let updates: GlobalPointersMap<Node, i64> = match rank {
            0 => [(node(0), 5), (node(1), 10)].into_iter().collect(),
            1 => [(node(0), 6), (node(2), 2)].into_iter().collect(),
            _ => HashMap::new(),
        };
        proxy.assign_map(&updates);
        let stats = proxy.send_and_apply_remotely().unwrap();
        assert_eq!(proxy.pending_updates(), 0);

        (nodes[0].get(), stats)
    });

    let values: Vec<i64> = temperatures.iter().map(|(v, _)| *v).collect();
    assert_eq!(values, vec![21, 30, 7]);

    // rank 2 sends nothing but is still a partner of rank 1
    let rounds = temperatures[0].1.rounds;
    assert!(temperatures.iter().all(|(_, s)| s.rounds == rounds));
    assert_eq!(temperatures[2].1.sent_updates, 0);
    assert_eq!(temperatures[2].1.received_updates, 1);
    assert_eq!(temperatures[0].1.received_updates, 1);
    assert_eq!(temperatures[1].1.received_updates, 1);
}

#[test]
fn test_local_and_remote_updates_combine() {
    let values = run_world(2, |comm| {
        let nodes = vec![Node::new(0)];
        let mut map_comm = GlobalPointerMapCommunicator::<Node, i64, _>::new(&comm);
        let mut proxy = map_comm.apply_proxy(add, &nodes);

        let target = GlobalPointer::new(1, 0);
        if comm.world_rank() == 0 {
            proxy.assign(&target, &5);
        } else {
            proxy.assign(&target, &3);
            // local update is visible before the flush
            assert_eq!(nodes[0].get(), 3);
        }
        proxy.send_and_apply_remotely().unwrap();
        nodes[0].get()
    });

    assert_eq!(values, vec![0, 8]);
}

#[test]
fn test_random_sums_match_sequential() {
    const WORLD_SIZE: usize = 4;
    const NODES_PER_RANK: usize = 50;
    const UPDATES_PER_RANK: usize = 2000;

    let updates_of = |rank: usize| -> Vec<(usize, usize, i64)> {
        let mut rng = StdRng::seed_from_u64(rank as u64);
        (0..UPDATES_PER_RANK)
            .map(|_| {
                (
                    rng.gen_range(0..WORLD_SIZE),
                    rng.gen_range(0..NODES_PER_RANK),
                    rng.gen_range(-100..100),
                )
            })
            .collect()
    };

    let mut expected = vec![vec![0i64; NODES_PER_RANK]; WORLD_SIZE];
    for rank in 0..WORLD_SIZE {
        for (owner, index, value) in updates_of(rank) {
            expected[owner][index] += value;
        }
    }

    let results = run_world(WORLD_SIZE, move |comm| {
        let nodes: Vec<Node> = (0..NODES_PER_RANK).map(|_| Node::default()).collect();
        let mut map_comm = GlobalPointerMapCommunicator::<Node, i64, _>::new(&comm);
        let mut proxy = map_comm.apply_proxy(add, &nodes);

        // repeated pointers would collapse in a map, assign them one by one from the pool
        let updates = updates_of(comm.world_rank());
        rayon::scope(|s| {
            for chunk in updates.chunks(97) {
                let proxy = &proxy;
                s.spawn(move |_| {
                    for (owner, index, value) in chunk {
                        proxy.assign(&GlobalPointer::new(*owner, *index), value);
                    }
                });
            }
        });

        let stats = proxy.send_and_apply_remotely().unwrap();
        let values: Vec<i64> = nodes.iter().map(Node::get).collect();
        (values, stats)
    });

    let mut total_sent = 0;
    let mut total_received = 0;
    for (rank, (values, stats)) in results.iter().enumerate() {
        assert_eq!(values, &expected[rank], "rank {}", rank);
        assert_eq!(stats.exchanges, WORLD_SIZE - 1);
        total_sent += stats.sent_updates;
        total_received += stats.received_updates;
    }
    assert_eq!(total_sent, total_received);
}

#[test]
fn test_second_flush_is_a_no_op() {
    let results = run_world(3, |comm| {
        let nodes = vec![Node::new(0)];
        let mut map_comm = GlobalPointerMapCommunicator::<Node, i64, _>::new(&comm);
        let mut proxy = map_comm.apply_proxy(add, &nodes);

        for owner in comm.other_ranks() {
            proxy.assign(&GlobalPointer::new(owner, 0), &1);
        }
        let first = proxy.send_and_apply_remotely().unwrap();
        let after_first = nodes[0].get();
        let second = proxy.send_and_apply_remotely().unwrap();

        (first, second, after_first, nodes[0].get())
    });

    for (first, second, after_first, after_second) in results {
        assert_eq!(first.exchanges, 2);
        assert_eq!(first.received_updates, 2);
        assert_eq!(second.rounds, 0);
        assert_eq!(second.exchanges, 0);
        assert_eq!(second.received_updates, 0);
        assert_eq!(after_first, 2);
        assert_eq!(after_second, 2);
    }
}

#[test]
fn test_rank_without_updates_takes_part() {
    // only rank 3 has remote updates; everybody else must still answer it
    let values = run_world(4, |comm| {
        let nodes = vec![Node::new(100)];
        let mut map_comm = GlobalPointerMapCommunicator::<Node, i64, _>::new(&comm);
        let mut proxy = map_comm.apply_proxy(add, &nodes);

        if comm.world_rank() == 3 {
            for owner in 0..3 {
                proxy.assign(&GlobalPointer::new(owner, 0), &(owner as i64 + 1));
            }
        }
        let stats = proxy.send_and_apply_remotely().unwrap();
        (nodes[0].get(), stats.exchanges)
    });

    assert_eq!(values, vec![(101, 1), (102, 1), (103, 1), (100, 3)]);
}

#[test]
fn test_repeated_cycles() {
    const CYCLES: i64 = 5;

    let values = run_world(3, |comm| {
        let rank = comm.world_rank();
        let nodes: Vec<Node> = (0..2).map(|_| Node::default()).collect();
        let mut map_comm = GlobalPointerMapCommunicator::<Node, i64, _>::new(&comm);

        for cycle in 1..=CYCLES {
            // a fresh proxy each cycle, with a functor scaled by the cycle
            let mut proxy = map_comm.apply_proxy(
                move |node: &Node, value: &i64| add(node, &(value * cycle)),
                &nodes,
            );
            let right = (rank + 1) % comm.world_size();
            let updates: GlobalPointersMap<Node, i64> = [
                (GlobalPointer::new(right, 0), 1),
                (GlobalPointer::new(right, 1), 2),
            ]
            .into_iter()
            .collect();
            proxy.assign_map(&updates);
            proxy.send_and_apply_remotely().unwrap();
            assert_eq!(proxy.pending_updates(), 0);
        }

        nodes.iter().map(Node::get).collect::<Vec<_>>()
    });

    // sum of 1..=CYCLES
    let scale = CYCLES * (CYCLES + 1) / 2;
    for v in values {
        assert_eq!(v, vec![scale, 2 * scale]);
    }
}
