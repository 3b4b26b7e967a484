//! Chemical-potential search
//!
//! Finds the per-spin chemical potential that makes the center orbitals
//! hold the target number of electrons. Three interchangeable strategies
//! solve the same two-variable problem:
//!
//! - **Newton**: `mu -= J⁻¹ f` with a one-sided finite-difference Jacobian
//! - **Bisection**: expand a bracket per spin until the residual changes
//!   sign, then halve it
//! - **Secant**: secant steps per spin until the residual changes sign, then
//!   false position (Illinois) inside the bracket
//!
//! The residual increases with `mu`, since `-mu` is added to every impurity
//! orbital.

mod bisection;
mod newton;
mod secant;

use crate::cost::{particle_rms, CostFunctions};
use crate::error::{BootstrapError, Result};
use crate::potential::{ChemicalPotential, PotentialVector};
use crate::solver_impl::FragmentSolver;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuStrategy {
    Newton,
    Bisection,
    Secant,
}

impl FromStr for MuStrategy {
    type Err = BootstrapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newton" => Ok(Self::Newton),
            "bisection" => Ok(Self::Bisection),
            "secant" => Ok(Self::Secant),
            _ => Err(BootstrapError::Config(format!("unknown chemical potential strategy: {}", s))),
        }
    }
}

impl fmt::Display for MuStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MuStrategy::Newton => "newton",
            MuStrategy::Bisection => "bisection",
            MuStrategy::Secant => "secant",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuSettings {
    /// RMS particle-number residual at which the search stops
    pub tol: f64,
    /// Finite-difference step for the Newton Jacobian
    pub d_mu: f64,
    /// Maximum number of residual evaluations
    pub max_iterations: usize,
    /// Initial bracket expansion (bisection) and second trial offset (secant)
    pub bracket_step: f64,
    /// Bracket width below which the root is considered degenerate
    pub bracket_floor: f64,
    /// Accept a degenerate root with a warning instead of failing
    pub accept_degenerate_bracket: bool,
    pub singular_threshold: f64,
}

impl Default for MuSettings {
    fn default() -> Self {
        MuSettings {
            tol: 1e-6,
            d_mu: 1e-6,
            max_iterations: 100,
            bracket_step: 0.1,
            bracket_floor: 1e-12,
            accept_degenerate_bracket: true,
            singular_threshold: 1e-12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuOutcome {
    pub mu: ChemicalPotential,
    pub residual: (f64, f64),
    /// Residual evaluations spent
    pub iterations: usize,
    /// Stopped on a collapsed bracket rather than on the tolerance
    pub degenerate: bool,
}

impl MuOutcome {
    fn converged(mu: ChemicalPotential, residual: (f64, f64), iterations: usize) -> Self {
        MuOutcome {
            mu,
            residual,
            iterations,
            degenerate: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChemicalPotentialSolver {
    pub strategy: MuStrategy,
    pub settings: MuSettings,
}

impl ChemicalPotentialSolver {
    pub fn new(strategy: MuStrategy, settings: MuSettings) -> Self {
        ChemicalPotentialSolver { strategy, settings }
    }

    /// Converge the chemical potential at fixed site potentials `x`
    pub fn solve<S: FragmentSolver>(
        &self,
        cost: &CostFunctions<'_, S>,
        x: &PotentialVector,
        mu0: ChemicalPotential,
    ) -> Result<MuOutcome> {
        info!("Chemical potential search ({}), tolerance {:.1e}", self.strategy, self.settings.tol);
        let outcome = match self.strategy {
            MuStrategy::Newton => newton::solve(cost, x, mu0, &self.settings)?,
            MuStrategy::Bisection => bisection::solve(cost, x, mu0, &self.settings)?,
            MuStrategy::Secant => secant::solve(cost, x, mu0, &self.settings)?,
        };
        info!(
            "Chemical potential: alpha = {:+.10}, beta = {:+.10} (rms {:.3e}, {} evaluations)",
            outcome.mu.alpha,
            outcome.mu.beta,
            particle_rms(outcome.residual),
            outcome.iterations
        );
        Ok(outcome)
    }
}

fn log_evaluation(iteration: usize, mu: ChemicalPotential, residual: (f64, f64)) {
    info!(
        "  mu step {:>3}: mu_a = {:+.10} mu_b = {:+.10} dN_a = {:+.3e} dN_b = {:+.3e}",
        iteration, mu.alpha, mu.beta, residual.0, residual.1
    );
}

/// Stop on a collapsed bracket: a warning or a `DegenerateRoot` error,
/// depending on the settings.
fn degenerate_exit(
    settings: &MuSettings,
    width: f64,
    mu: ChemicalPotential,
    residual: (f64, f64),
    iterations: usize,
) -> Result<MuOutcome> {
    let rms = particle_rms(residual);
    if settings.accept_degenerate_bracket {
        warn!(
            "Chemical potential bracket collapsed to {:.3e} with residual {:.3e}; accepting degenerate root",
            width, rms
        );
        Ok(MuOutcome {
            mu,
            residual,
            iterations,
            degenerate: true,
        })
    } else {
        Err(BootstrapError::DegenerateRoot { width, residual: rms })
    }
}
