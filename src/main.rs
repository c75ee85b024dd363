//! Provides the main entry point to the program.
use anyhow::Result;
use human_panic::setup_panic;

fn main() -> Result<()> {
    setup_panic!();

    femtosim::cli::run_cli()
}
