//! Command implementations for the restock CLI.

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::{self, Preparer, Reporter, Trainer};

/// Execute a CLI command against an already resolved configuration.
pub fn execute_command(args: &RestockArgs, config: PipelineConfig) -> Result<()> {
    match &args.command {
        Command::Prepare => prepare(config, args),
        Command::Train(_) => train(config, args),
        Command::Report => report(config, args),
        Command::Run(_) => run(config, args),
    }
}

fn prepare(config: PipelineConfig, cli_args: &RestockArgs) -> Result<()> {
    let summary = Preparer::new(config).run()?;
    output_result("Data prepared successfully", &summary, cli_args)
}

fn train(config: PipelineConfig, cli_args: &RestockArgs) -> Result<()> {
    let summary = Trainer::new(config).run()?;
    output_result("Model trained successfully", &summary, cli_args)
}

fn report(config: PipelineConfig, cli_args: &RestockArgs) -> Result<()> {
    let summary = Reporter::new(config).run()?;
    output_result("Report generated successfully", &summary, cli_args)
}

fn run(config: PipelineConfig, cli_args: &RestockArgs) -> Result<()> {
    let summary = pipeline::run(&config)?;
    output_result("Pipeline completed successfully", &summary, cli_args)
}
