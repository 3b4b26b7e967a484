//! Bootstrap Embedding Command-Line Interface
//!
//! This is the main entry point for running bootstrap calculations with YAML configuration.

use bootstrap::app::BootstrapApplication;
use color_eyre::eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;
    BootstrapApplication::from_cli()?.run()
}
