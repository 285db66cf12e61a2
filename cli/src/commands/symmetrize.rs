use anyhow::Result;
use csrshard::export_symmetrized;
use tracing::info;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::SymmetrizeArgs) -> Result<()> {
    info!("[symmetrize] loading graph from {}", args.graph.indptr.display());
    let graph = super::load_graph(&args.graph, true)?;

    info!("[symmetrize] writing {} vertices, {} edges to {}", graph.vertex_count(), graph.edge_count(), args.output.display());
    export_symmetrized(&graph, &args.output)?;

    Ok(())
}
