//! End-to-end jobs: load arrays, prepare the graph, partition, write results.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::dist::{Balance, Communicator, LocalGroup, LocalShard, ROOT, VertexDistribution, gather_partition, scatter_graph};
use crate::graph::{CsrGraph, Dataset, EdgeOffset, VertexId, Weight};
use crate::io::npy::{load_array, save_array};
use crate::partition::{PartId, PartitionEngine, PartitionOptions, PartitionReport, PartitionRequest, check_assignment};

/// Names of the arrays written by [`export_symmetrized`].
pub const INDPTR_SYM: &str = "indptr_sym.npy";
pub const INDICES_SYM: &str = "indices_sym.npy";
pub const EDGE_WEIGHT_SYM: &str = "edge_weight_sym.npy";

/// Locations of the `.npy` arrays making up a dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetPaths {
    pub indptr: PathBuf,
    pub indices: PathBuf,
    pub node_weight: Option<PathBuf>,
    pub edge_weight: Option<PathBuf>,
}

impl Dataset {
    /// Read the raw arrays. Node weights may be `(V,)` or `(V, ncon)` and are flattened;
    /// a 2-D array must have one row per vertex.
    pub fn load(paths: &DatasetPaths) -> Result<Self> {
        let start = Instant::now();
        let indptr = load_array::<EdgeOffset>(&paths.indptr)?.data;
        let indices = load_array::<VertexId>(&paths.indices)?.data;
        let node_weight = match &paths.node_weight {
            Some(path) => {
                let array = load_array::<Weight>(path)?;
                let num_nodes = indptr.len().saturating_sub(1);
                if array.shape.len() == 2 && array.shape[0] != num_nodes {
                    bail!(
                        "[pipeline] Node weights {} have shape {:?}, expected ({num_nodes}, ncon)",
                        path.display(), array.shape
                    );
                }
                array.data
            }
            None => Vec::new(),
        };
        let edge_weight = match &paths.edge_weight {
            Some(path) => load_array::<Weight>(path)?.data,
            None => Vec::new(),
        };
        info!(
            "[pipeline] loaded {} offsets, {} indices, {} node weights, {} edge weights in {:.3} secs",
            indptr.len(), indices.len(), node_weight.len(), edge_weight.len(), start.elapsed().as_secs_f64()
        );
        Ok(Self { indptr, indices, node_weight, edge_weight })
    }
}

/// Create the directory if it doesn't exist; error if a non-directory exists there.
fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("[pipeline] Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("[pipeline] Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

fn ensure_parent_exists(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir_exists(parent),
        _ => Ok(()),
    }
}

fn to_i64(values: &[u64], what: &str) -> Result<Vec<i64>> {
    values.iter()
        .map(|&v| i64::try_from(v).with_context(|| format!("[pipeline] {what} value {v} exceeds i64")))
        .collect()
}

/// Partition the whole graph in this process.
pub fn partition_local(graph: &CsrGraph, engine: &dyn PartitionEngine, options: &PartitionOptions) -> Result<Vec<PartId>> {
    options.validate()?;
    let start = Instant::now();

    let num_nodes = graph.vertex_count();
    let vtxdist = VertexDistribution::from_bounds(vec![0, num_nodes as VertexId], num_nodes)?;
    let shard = LocalShard::whole(graph)?;
    let parts = engine.assign(&PartitionRequest { options, vtxdist: &vtxdist, shard: &shard })?;
    check_assignment(&parts, num_nodes, options.num_partitions)?;

    info!(
        "[pipeline] {} partitioned {num_nodes} vertices into {} parts in {:.3} secs",
        engine.name(), options.num_partitions, start.elapsed().as_secs_f64()
    );
    Ok(parts)
}

/// Partition the graph over `world_size` in-process ranks.
///
/// Rank 0 scatters the graph, every rank runs `engine` on its shard, and the
/// per-rank results are gathered back into one map ordered by vertex id.
pub fn partition_distributed(
    graph: &CsrGraph,
    world_size: usize,
    balance: Balance,
    engine: &dyn PartitionEngine,
    options: &PartitionOptions,
) -> Result<Vec<PartId>> {
    options.validate()?;
    let start = Instant::now();

    let maps = LocalGroup::run(world_size, |comm| {
        let global = (comm.rank() == ROOT).then_some(graph);
        partition_on_rank(comm, global, balance, engine, options)
    })?;

    let parts = maps.into_iter().next().flatten()
        .context("[pipeline] Root rank returned no partition map")?;
    info!(
        "[pipeline] {} partitioned {} vertices into {} parts on {world_size} ranks in {:.3} secs",
        engine.name(), parts.len(), options.num_partitions, start.elapsed().as_secs_f64()
    );
    Ok(parts)
}

/// One rank's share of a distributed run: receive a shard, partition it,
/// and send the ids back. Rank 0 passes the graph and gets the full map.
pub fn partition_on_rank(
    comm: &impl Communicator,
    graph: Option<&CsrGraph>,
    balance: Balance,
    engine: &dyn PartitionEngine,
    options: &PartitionOptions,
) -> crate::Result<Option<Vec<PartId>>> {
    let (shard, layout) = scatter_graph(comm, graph, balance)?;

    let parts = engine.assign(&PartitionRequest { options, vtxdist: &layout.vtxdist, shard: &shard })?;
    check_assignment(&parts, shard.vertex_count(), options.num_partitions)?;
    debug!("[pipeline] rank {} assigned {} vertices", comm.rank(), parts.len());

    gather_partition(comm, &layout.vtxdist, parts)
}

/// Write the CSR arrays of `graph` as `indptr_sym.npy`, `indices_sym.npy`
/// and, when weighted, `edge_weight_sym.npy` under `dir`.
pub fn export_symmetrized(graph: &CsrGraph, dir: &Path) -> Result<()> {
    ensure_dir_exists(dir)?;

    let indptr = to_i64(graph.indptr(), "indptr")?;
    save_array(dir.join(INDPTR_SYM), &indptr, &[indptr.len()])?;
    let indices = to_i64(graph.indices(), "indices")?;
    save_array(dir.join(INDICES_SYM), &indices, &[indices.len()])?;
    if let Some(weights) = graph.edge_weights() {
        save_array(dir.join(EDGE_WEIGHT_SYM), weights, &[weights.len()])?;
    }

    info!("[pipeline] wrote symmetrized graph to {}", dir.display());
    Ok(())
}

/// Write a partition map as a one-dimensional `<i8` array.
pub fn save_partition(path: &Path, parts: &[PartId]) -> Result<()> {
    ensure_parent_exists(path)?;
    let values: Vec<i64> = parts.iter().map(|&p| p as i64).collect();
    save_array(path, &values, &[values.len()])?;
    info!("[pipeline] wrote {} part ids to {}", values.len(), path.display());
    Ok(())
}

/// Write a partition report as pretty-printed JSON.
pub fn save_report(path: &Path, report: &PartitionReport) -> Result<()> {
    ensure_parent_exists(path)?;
    let json = report.to_json().context("[pipeline] Failed to serialize report")?;
    fs::write(path, json)
        .with_context(|| format!("[pipeline] Failed to write report {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::graph::PrepareOptions;
    use crate::io::npy::NpyArray;
    use crate::partition::BlockEngine;

    fn make_test_graph() -> CsrGraph {
        Dataset {
            indptr: vec![0, 2, 3, 3, 5, 6],
            indices: vec![1, 2, 2, 0, 1, 0],
            node_weight: vec![],
            edge_weight: vec![1, 1, 1, 1, 1, 1],
        }
        .prepare(PrepareOptions { symmetrize: true, prune_zero_weights: false })
        .unwrap()
    }

    #[test]
    fn local_and_distributed_agree() {
        let graph = make_test_graph();
        let options = PartitionOptions { num_partitions: 2, ..Default::default() };
        let local = partition_local(&graph, &BlockEngine, &options).unwrap();
        assert_eq!(local, vec![0, 0, 0, 1, 1]);
        for world_size in 1..=4 {
            for balance in [Balance::Vertices, Balance::Edges] {
                let distributed = partition_distributed(&graph, world_size, balance, &BlockEngine, &options).unwrap();
                assert_eq!(distributed, local);
            }
        }
    }

    #[test]
    fn engine_errors_surface() {
        let graph = make_test_graph();
        let options = PartitionOptions { num_partitions: 5, imbalance: 1.0, ..Default::default() };
        let ok = partition_distributed(&graph, 2, Balance::Vertices, &BlockEngine, &options);
        assert!(ok.is_ok());

        let options = PartitionOptions { num_partitions: 6, ..Default::default() };
        let err = partition_distributed(&graph, 3, Balance::Vertices, &BlockEngine, &options).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::PartitionerInput(_))));
    }

    #[test]
    fn export_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let graph = make_test_graph();
        let out = dir.path().join("sym");
        export_symmetrized(&graph, &out).unwrap();

        let paths = DatasetPaths {
            indptr: out.join(INDPTR_SYM),
            indices: out.join(INDICES_SYM),
            node_weight: None,
            edge_weight: Some(out.join(EDGE_WEIGHT_SYM)),
        };
        let reloaded = Dataset::load(&paths).unwrap().prepare(PrepareOptions::default()).unwrap();
        assert_eq!(reloaded, graph);
    }

    #[test]
    fn node_weight_rows_must_match_vertices() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths {
            indptr: dir.path().join("indptr.npy"),
            indices: dir.path().join("indices.npy"),
            node_weight: Some(dir.path().join("node_weight.npy")),
            edge_weight: None,
        };
        save_array(&paths.indptr, &[0i64, 1, 2, 2], &[4]).unwrap();
        save_array(&paths.indices, &[1i64, 0], &[2]).unwrap();

        // (ncon, V) instead of (V, ncon); same element count as the right shape.
        save_array(dir.path().join("node_weight.npy"), &[1i64, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        let err = Dataset::load(&paths).unwrap_err();
        assert!(err.to_string().contains("shape [2, 3]"));

        save_array(dir.path().join("node_weight.npy"), &[1i64, 2, 3, 4, 5, 6], &[3, 2]).unwrap();
        let graph = Dataset::load(&paths).unwrap().prepare(PrepareOptions::default()).unwrap();
        assert_eq!(graph.ncon(), 2);
    }

    #[test]
    fn partition_map_is_written_as_i64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("parts.npy");
        save_partition(&path, &[0, 1, 1, 3]).unwrap();
        let array: NpyArray<i64> = load_array(&path).unwrap();
        assert_eq!(array, NpyArray { shape: vec![4], data: vec![0, 1, 1, 3] });
    }

    #[test]
    fn report_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let graph = make_test_graph();
        let report = PartitionReport::evaluate(&graph, &[0, 0, 0, 1, 1], 2).unwrap();
        let path = dir.path().join("report.json");
        save_report(&path, &report).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(serde_json::from_str::<PartitionReport>(&text).unwrap(), report);
    }

    #[test]
    fn missing_files_are_reported() {
        let paths = DatasetPaths {
            indptr: PathBuf::from("/nonexistent/indptr.npy"),
            indices: PathBuf::from("/nonexistent/indices.npy"),
            ..Default::default()
        };
        let err = Dataset::load(&paths).unwrap_err();
        assert!(format!("{err:#}").contains("[io::npy]"));
    }
}
