mod cli;
mod commands;
mod logging;

use cli::{Cli, Commands};
use commands::{distribute, partition, symmetrize};
#[cfg(feature = "mpi")]
use commands::mpi_run;

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    logging::init(cli.verbose);
    match &cli.command {
        Commands::Symmetrize(args) => symmetrize::run(&cli, args),
        Commands::Partition(args) => partition::run(&cli, args),
        Commands::Distribute(args) => distribute::run(&cli, args),
        #[cfg(feature = "mpi")]
        Commands::Mpi(args) => mpi_run::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
