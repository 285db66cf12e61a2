use csrshard::{CsrGraph, Dataset, PrepareOptions, symmetrize};

/// The directed graph used throughout: 0->1, 0->2, 1->2, 3->0, 3->1, 4->0.
fn directed_five() -> (Vec<u64>, Vec<u64>) {
    (vec![0, 2, 3, 3, 5, 6], vec![1, 2, 2, 0, 1, 0])
}

#[test]
fn directed_graph_becomes_undirected() {
    let (indptr, indices) = directed_five();
    let sym = symmetrize(&indptr, &indices, None).unwrap();
    let graph = CsrGraph::new(sym.indptr, sym.indices).unwrap();

    let n0 = graph.neighbors(0).unwrap();
    assert!(n0.contains(&1) && n0.contains(&2));
    assert_eq!(graph.neighbors(2).unwrap(), &[0, 1]);

    for v in 0..graph.vertex_count() {
        for &u in graph.neighbors(v).unwrap() {
            assert_ne!(u, v as u64);
            assert!(graph.neighbors(u as usize).unwrap().contains(&(v as u64)));
        }
    }
}

#[test]
fn symmetrization_is_idempotent() {
    let (indptr, indices) = directed_five();
    let once = symmetrize(&indptr, &indices, Some(&[1, 2, 3, 4, 5, 6])).unwrap();
    let twice = symmetrize(&once.indptr, &once.indices, None).unwrap();
    assert_eq!(once.indptr, twice.indptr);
    assert_eq!(once.indices, twice.indices);
}

#[test]
fn dataset_with_pruning_and_symmetrization() {
    let (indptr, indices) = directed_five();
    let dataset = Dataset {
        indptr,
        indices,
        node_weight: vec![1, 2, 3, 4, 5],
        edge_weight: vec![1, 0, 1, 0, 1, 1],
    };
    let graph = dataset.prepare(PrepareOptions { symmetrize: true, prune_zero_weights: true }).unwrap();

    // 0->2 and 3->0 are pruned; 0-1, 1-2, 1-3 and 0-4 remain.
    assert_eq!(graph.neighbors(0).unwrap(), &[1, 4]);
    assert_eq!(graph.neighbors(1).unwrap(), &[0, 2, 3]);
    assert_eq!(graph.edge_count(), 8);
    assert_eq!(graph.ncon(), 1);
    assert!(graph.edge_weights().unwrap().iter().all(|&w| w == 1));
}
