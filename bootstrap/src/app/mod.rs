mod report;
mod runner;

pub use runner::{build_problem, build_solvers, resolve_settings, run_bootstrap};

use self::report::{report_densities, report_history, report_summary};
use crate::config::{Args, Config};
use crate::io::{setup_output, write_summary_file};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use tracing::info;

pub struct BootstrapApplication {
    args: Args,
    config: Config,
}

impl BootstrapApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.output.as_ref());
        info!("Configuration loaded:\n{:?}", self.config);

        let result = run_bootstrap(&self.args, &self.config).wrap_err("Bootstrap calculation failed")?;
        report_history(&result);
        report_summary(&result);
        report_densities(&result);

        if let Some(path) = &self.args.summary {
            write_summary_file(path, &result.summary())?;
        }
        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;

    let config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults();

    Ok(config)
}
