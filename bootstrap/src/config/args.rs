//! Command-line argument parsing for bootstrap calculations

use clap::Parser;

/// Bootstrap embedding with YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write a YAML summary of the converged run to this file
    #[arg(long)]
    pub summary: Option<String>,

    /// Chemical potential strategy (newton, bisection or secant)
    #[arg(long)]
    pub mu_strategy: Option<String>,

    /// Line search for the site potentials (none, scan or quadratic)
    #[arg(long)]
    pub line_search: Option<String>,

    /// Override particle-number tolerance
    #[arg(long)]
    pub mu_tol: Option<f64>,

    /// Override matching tolerance
    #[arg(long)]
    pub lambda_tol: Option<f64>,

    /// Override maximum outer iterations
    #[arg(long)]
    pub max_outer_iterations: Option<usize>,

    /// Solve every fragment even when translational symmetry is configured
    #[arg(long)]
    pub no_symmetry: bool,

    /// Evaluate fragment energies at zero site potentials without optimizing
    #[arg(long)]
    pub one_shot: bool,
}
