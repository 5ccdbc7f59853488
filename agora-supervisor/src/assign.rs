//! Round-robin spawn-list assignment: each worker process hosts a subset
//! of agents chosen by round-robin over the spawn list.

use agora_core::ids::EndpointId;

/// Select the subset of `spawn_list` assigned to `process_index` out of
/// `num_processes` total worker processes: item `i` goes to process
/// `i % num_processes`.
pub fn assign_round_robin(
    spawn_list: &[EndpointId],
    num_processes: usize,
    process_index: usize,
) -> Vec<EndpointId> {
    assert!(num_processes > 0, "num_processes must be at least 1");
    assert!(process_index < num_processes, "process_index out of range");
    spawn_list
        .iter()
        .enumerate()
        .filter(|(i, _)| i % num_processes == process_index)
        .map(|(_, id)| id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<EndpointId> {
        (0..n).map(|i| EndpointId::new(format!("agent-{i}"))).collect()
    }

    #[test]
    fn splits_evenly_without_overlap_or_gaps() {
        let spawn_list = ids(10);
        let assigned: Vec<Vec<EndpointId>> = (0..3)
            .map(|p| assign_round_robin(&spawn_list, 3, p))
            .collect();

        let total: usize = assigned.iter().map(Vec::len).sum();
        assert_eq!(total, spawn_list.len());

        let mut seen = std::collections::HashSet::new();
        for group in &assigned {
            for id in group {
                assert!(seen.insert(id.clone()), "agent assigned to more than one process");
            }
        }

        assert_eq!(assigned[0].len(), 4);
        assert_eq!(assigned[1].len(), 3);
        assert_eq!(assigned[2].len(), 3);
    }

    #[test]
    fn single_process_gets_everything() {
        let spawn_list = ids(5);
        assert_eq!(assign_round_robin(&spawn_list, 1, 0), spawn_list);
    }
}
