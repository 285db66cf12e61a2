pub mod distribute;
#[cfg(feature = "mpi")]
pub mod mpi_run;
pub mod partition;
pub mod symmetrize;

use anyhow::Result;
use csrshard::{
    CsrGraph, Dataset, DatasetPaths, Objective, PartId, PartitionOptions, PartitionReport,
    PrepareOptions, save_partition, save_report,
};

use crate::cli::{GraphArgs, PartitionArgs};

/// Load and prepare the input graph.
pub(crate) fn load_graph(args: &GraphArgs, symmetrize: bool) -> Result<CsrGraph> {
    let paths = DatasetPaths {
        indptr: args.indptr.clone(),
        indices: args.indices.clone(),
        node_weight: args.node_weight.clone(),
        edge_weight: args.edge_weight.clone(),
    };
    let options = PrepareOptions { symmetrize, prune_zero_weights: args.prune };
    Ok(Dataset::load(&paths)?.prepare(options)?)
}

pub(crate) fn partition_options(args: &PartitionArgs) -> Result<PartitionOptions> {
    let options = PartitionOptions {
        num_partitions: args.num_partition,
        num_iterations: args.num_iteration,
        num_init_parts: args.num_init_part,
        imbalance: args.unbalance_val,
        objective: if args.use_cut { Objective::EdgeCut } else { Objective::CommunicationVolume },
        ..Default::default()
    };
    options.validate()?;
    Ok(options)
}

/// Write the partition map and, if requested, its report.
pub(crate) fn write_outputs(args: &PartitionArgs, graph: &CsrGraph, parts: &[PartId]) -> Result<()> {
    save_partition(&args.output, parts)?;
    if let Some(path) = &args.report {
        let report = PartitionReport::evaluate(graph, parts, args.num_partition)?;
        tracing::info!(
            "[report] edge cut {}, communication volume {}, imbalance {:.3}",
            report.edge_cut, report.communication_volume, report.imbalance
        );
        save_report(path, &report)?;
    }
    Ok(())
}
