use std::path::PathBuf;

/// CSR graph preparation and partitioning CLI
#[derive(clap::Parser, Debug)]
#[command(name = "csrshard", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv); CSRSHARD_LOG overrides it
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Convert a directed graph to an undirected one and write the result
    Symmetrize(SymmetrizeArgs),

    /// Partition a graph in a single process
    Partition(PartitionArgs),

    /// Partition a graph after distributing it over in-process ranks
    Distribute(DistributeArgs),

    /// Partition a graph distributed over the ranks of an MPI job (run under mpirun)
    #[cfg(feature = "mpi")]
    Mpi(MpiArgs),
}

/// Input arrays of a graph dataset.
#[derive(clap::Args, Debug)]
pub struct GraphArgs {
    /// CSR offsets (.npy)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub indptr: PathBuf,

    /// CSR neighbor ids (.npy)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub indices: PathBuf,

    /// Node weights, shape (V,) or (V, ncon) (.npy)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub node_weight: Option<PathBuf>,

    /// Edge weights aligned with indices (.npy)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub edge_weight: Option<PathBuf>,

    /// Drop edges with non-positive weight before anything else
    #[arg(long)]
    pub prune: bool,
}

#[derive(clap::Args, Debug)]
pub struct SymmetrizeArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Output directory for indptr_sym.npy, indices_sym.npy and edge_weight_sym.npy
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct PartitionArgs {
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Output partition map (.npy)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Number of parts
    #[arg(long, default_value_t = 4)]
    pub num_partition: u32,

    /// Refinement iterations
    #[arg(long, default_value_t = 10)]
    pub num_iteration: u32,

    /// Initial partitionings to try
    #[arg(long, default_value_t = 1)]
    pub num_init_part: u32,

    /// Allowed load imbalance, between 1 and the number of parts
    #[arg(long, default_value_t = 1.05)]
    pub unbalance_val: f64,

    /// Minimize edge cut instead of communication volume
    #[arg(long)]
    pub use_cut: bool,

    /// Symmetrize the graph before partitioning
    #[arg(long)]
    pub symmetrize: bool,

    /// Write a JSON quality report
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub report: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct DistributeArgs {
    #[command(flatten)]
    pub partition: PartitionArgs,

    /// Number of ranks
    #[arg(short = 'n', long, default_value_t = 2)]
    pub ranks: usize,

    /// Balance ranks by edge count instead of vertex count
    #[arg(long)]
    pub balance_edges: bool,
}

#[cfg(feature = "mpi")]
#[derive(clap::Args, Debug)]
pub struct MpiArgs {
    #[command(flatten)]
    pub partition: PartitionArgs,

    /// Balance ranks by edge count instead of vertex count
    #[arg(long)]
    pub balance_edges: bool,
}
