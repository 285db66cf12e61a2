use anyhow::Result;
use csrshard::{BlockEngine, partition_local};
use tracing::info;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::PartitionArgs) -> Result<()> {
    let options = super::partition_options(args)?;

    info!("[partition] loading graph from {}", args.graph.indptr.display());
    let graph = super::load_graph(&args.graph, args.symmetrize)?;

    info!("[partition] splitting {} vertices into {} parts", graph.vertex_count(), options.num_partitions);
    let parts = partition_local(&graph, &BlockEngine, &options)?;

    info!("[partition] writing partition map to {}", args.output.display());
    super::write_outputs(args, &graph, &parts)
}
