use std::collections::HashSet;

use proptest::prelude::*;
use tupledag::types::Status;
use tupledag_test_utils::builders::{TraintupleBuilder, model_output};
use tupledag_test_utils::fixtures::{ALGO, Harness, NODES};

/// Parents of each tuple, by index. Tuple N only depends on tuples 0..N-1,
/// which keeps the graph acyclic.
fn dag_strategy(max_tuples: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tuples).prop_flat_map(|num_tuples| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..3),
            num_tuples,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let parents: HashSet<usize> = if i == 0 {
                        HashSet::new()
                    } else {
                        potential.into_iter().map(|p| p % i).collect()
                    };
                    let mut parents: Vec<usize> = parents.into_iter().collect();
                    parents.sort_unstable();
                    parents
                })
                .collect()
        })
    })
}

fn key(i: usize) -> String {
    format!("tt-{i}")
}

fn build(h: &mut Harness, dag: &[Vec<usize>]) {
    for (i, parents) in dag.iter().enumerate() {
        let parent_keys: Vec<String> = parents.iter().map(|p| key(*p)).collect();
        let parent_refs: Vec<&str> = parent_keys.iter().map(String::as_str).collect();
        let req = TraintupleBuilder::new(&key(i), ALGO, NODES[i % NODES.len()])
            .parents(&parent_refs)
            .build();
        h.traintuple(NODES[0], req).unwrap();
    }
}

/// Run one worker report if the tuple can take it; returns whether it did.
fn act(h: &mut Harness, i: usize, succeed: bool) -> bool {
    let k = key(i);
    let worker = NODES[i % NODES.len()];
    let status = h.status(&k);
    if !matches!(status, Status::Todo | Status::Doing) {
        return false;
    }
    if succeed {
        if status == Status::Todo {
            h.start(worker, &k).unwrap();
        }
        h.succeed(worker, &k, model_output(&format!("model-{i}"))).unwrap();
    } else {
        h.fail(worker, &k).unwrap();
    }
    true
}

fn check_invariants(h: &mut Harness, dag: &[Vec<usize>]) -> Result<(), TestCaseError> {
    let statuses: Vec<Status> = (0..dag.len()).map(|i| h.status(&key(i))).collect();
    for (i, parents) in dag.iter().enumerate() {
        let status = statuses[i];
        let parent_statuses: Vec<Status> = parents.iter().map(|p| statuses[*p]).collect();
        let all_done = parent_statuses.iter().all(|s| *s == Status::Done);
        let any_failed = parent_statuses.contains(&Status::Failed);

        if matches!(status, Status::Todo | Status::Doing | Status::Done) {
            prop_assert!(all_done, "{} is {status} but parents are {parent_statuses:?}", key(i));
        }
        if any_failed {
            prop_assert_eq!(status, Status::Failed, "{} has a failed parent", key(i));
        }
        if all_done {
            prop_assert_ne!(status, Status::Waiting, "{} is ready but waiting", key(i));
        }
        prop_assert_ne!(status, Status::Aborted);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn statuses_stay_consistent_with_parents(
        dag in dag_strategy(8),
        actions in proptest::collection::vec((0..8usize, any::<bool>()), 1..24),
    ) {
        let mut h = Harness::new();
        build(&mut h, &dag);
        check_invariants(&mut h, &dag)?;

        for (i, succeed) in actions {
            if i >= dag.len() {
                continue;
            }
            act(&mut h, i, succeed);
            check_invariants(&mut h, &dag)?;
        }
    }

    #[test]
    fn succeeding_everything_in_order_finishes_the_dag(dag in dag_strategy(8)) {
        let mut h = Harness::new();
        build(&mut h, &dag);

        for i in 0..dag.len() {
            prop_assert!(act(&mut h, i, true), "{} was not runnable", key(i));
        }
        for i in 0..dag.len() {
            prop_assert_eq!(h.status(&key(i)), Status::Done);
        }
    }
}
