use anyhow::{Context, Result};
use csrshard::{Balance, BlockEngine, Communicator, MpiComm, ROOT, partition_on_rank};
use tracing::info;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::MpiArgs) -> Result<()> {
    let universe = mpi::initialize().context("[mpi] MPI is unavailable or already initialized")?;
    let comm = MpiComm::new(universe.world());
    let options = super::partition_options(&args.partition)?;
    let balance = if args.balance_edges { Balance::Edges } else { Balance::Vertices };

    // Only the root reads the dataset; the others receive their shard.
    let graph = match comm.rank() == ROOT {
        true => {
            info!("[mpi] loading graph from {}", args.partition.graph.indptr.display());
            Some(super::load_graph(&args.partition.graph, args.partition.symmetrize)?)
        }
        false => None,
    };

    info!("[mpi] rank {} of {} joining ({balance:?} balance)", comm.rank(), comm.size());
    let parts = partition_on_rank(&comm, graph.as_ref(), balance, &BlockEngine, &options)?;

    if let (Some(graph), Some(parts)) = (graph, parts) {
        info!("[mpi] writing partition map to {}", args.partition.output.display());
        super::write_outputs(&args.partition, &graph, &parts)?;
    }
    Ok(())
}
