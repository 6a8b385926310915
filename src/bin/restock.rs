//! Restock CLI binary.

use std::process;

use clap::Parser;

use restock::cli::args::*;
use restock::cli::commands::*;
use restock::logging;

fn main() {
    // Parse command line arguments using clap
    let args = RestockArgs::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: &RestockArgs) -> restock::Result<()> {
    let config = args.pipeline_config()?;

    // Verbosity flags override the configured level
    logging::init(&config.logging.clone().with_verbosity(args.verbosity()))?;

    execute_command(args, config)
}
