//! cloudless CLI entrypoint.
//!
//! Thin wrapper over the `cli` module: parse args, run the pipeline and exit
//! with an appropriate status. For programmatic use, prefer the library API
//! (`cloudless::api`).

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
