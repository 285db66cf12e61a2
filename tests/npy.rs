use csrshard::io::npy::{NpyArray, load_array, save_array};
use csrshard::{Dataset, DatasetPaths, PrepareOptions, export_symmetrized, save_partition};

#[test]
fn arrays_survive_a_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.npy");
    save_array(&path, &[1i64, 2, 3, 4, 5, 6], &[3, 2]).unwrap();

    let array: NpyArray<i64> = load_array(&path).unwrap();
    assert_eq!(array.shape, vec![3, 2]);
    assert_eq!(array.columns(), 2);
    assert_eq!(array.data, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn two_dimensional_node_weights_set_ncon() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DatasetPaths {
        indptr: dir.path().join("indptr.npy"),
        indices: dir.path().join("indices.npy"),
        node_weight: Some(dir.path().join("node_weight.npy")),
        edge_weight: None,
    };
    save_array(&paths.indptr, &[0i64, 1, 2, 2], &[4]).unwrap();
    save_array(&paths.indices, &[1i32, 2], &[2]).unwrap();
    save_array(paths.node_weight.as_ref().unwrap(), &[1i64, 10, 2, 20, 3, 30], &[3, 2]).unwrap();

    let graph = Dataset::load(&paths).unwrap()
        .prepare(PrepareOptions { symmetrize: true, prune_zero_weights: false })
        .unwrap();
    assert_eq!(graph.ncon(), 2);
    assert_eq!(graph.node_weights().unwrap().column_sums(), vec![6, 60]);
    assert_eq!(graph.indptr(), &[0, 1, 3, 4]);
}

#[test]
fn symmetrize_export_writes_expected_files() {
    let dir = tempfile::tempdir().unwrap();
    let graph = csrshard::CsrGraph::with_weights(vec![0, 1, 1], vec![1], None, Some(vec![5])).unwrap()
        .symmetrized().unwrap();
    export_symmetrized(&graph, dir.path()).unwrap();

    let indptr: NpyArray<u64> = load_array(dir.path().join("indptr_sym.npy")).unwrap();
    let indices: NpyArray<u64> = load_array(dir.path().join("indices_sym.npy")).unwrap();
    let weights: NpyArray<i64> = load_array(dir.path().join("edge_weight_sym.npy")).unwrap();
    assert_eq!(indptr.data, vec![0, 1, 2]);
    assert_eq!(indices.data, vec![1, 0]);
    assert_eq!(weights.data, vec![5, 5]);
}

#[test]
fn partition_maps_are_int64() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parts.npy");
    save_partition(&path, &[2, 0, 1]).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("'descr': '<i8'"));
}
