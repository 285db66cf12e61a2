use anyhow::{Result, ensure};
use csrshard::{Balance, BlockEngine, partition_distributed};
use tracing::info;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::DistributeArgs) -> Result<()> {
    ensure!(args.ranks > 0, "[distribute] --ranks must be at least 1");
    let options = super::partition_options(&args.partition)?;
    let balance = if args.balance_edges { Balance::Edges } else { Balance::Vertices };

    info!("[distribute] loading graph from {}", args.partition.graph.indptr.display());
    let graph = super::load_graph(&args.partition.graph, args.partition.symmetrize)?;

    info!("[distribute] scattering {} vertices over {} ranks ({balance:?} balance)", graph.vertex_count(), args.ranks);
    let parts = partition_distributed(&graph, args.ranks, balance, &BlockEngine, &options)?;

    info!("[distribute] writing partition map to {}", args.partition.output.display());
    super::write_outputs(&args.partition, &graph, &parts)
}
