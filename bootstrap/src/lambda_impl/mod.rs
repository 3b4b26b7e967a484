//! Newton-Raphson on the site potentials
//!
//! Each iteration evaluates the global matching residual, stops if its RMS
//! is below tolerance, and otherwise takes the step `dx = -J⁻¹ f` scaled by a
//! line-search factor. The Jacobian only holds each fragment's response to
//! its own potentials, so full steps can overshoot; damping makes up for the
//! missing cross-fragment feedback.

mod line_search;

pub use line_search::LineSearch;

use crate::cost::{rms, CostFunctions};
use crate::error::{BootstrapError, Result};
use crate::jacobian::JacobianAssembler;
use crate::linalg::solve_checked;
use crate::potential::{ChemicalPotential, PotentialVector};
use crate::solver_impl::FragmentSolver;
use fci::RdmBundle;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaSettings {
    /// RMS matching residual at which the loop stops
    pub tol: f64,
    /// Centered finite-difference step
    pub d_lambda: f64,
    pub max_iterations: usize,
    pub line_search: LineSearch,
    pub singular_threshold: f64,
}

impl Default for LambdaSettings {
    fn default() -> Self {
        LambdaSettings {
            tol: 1e-6,
            d_lambda: 1e-6,
            max_iterations: 100,
            line_search: LineSearch::Scan,
            singular_threshold: 1e-12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LambdaOutcome {
    pub potentials: PotentialVector,
    /// RDMs solved at `potentials`
    pub rdms: Vec<RdmBundle>,
    pub residual_rms: f64,
    /// Residual evaluations, including the final converged one
    pub iterations: usize,
}

/// Iterate being carried through the Newton loop
#[derive(Debug, Clone)]
pub(crate) struct Trial {
    pub factor: f64,
    pub potentials: PotentialVector,
    pub rdms: Vec<RdmBundle>,
    pub rms: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PotentialSolver {
    pub settings: LambdaSettings,
}

impl PotentialSolver {
    pub fn new(settings: LambdaSettings) -> Self {
        PotentialSolver { settings }
    }

    /// Converge the site potentials at fixed `mu`.
    ///
    /// `rdms` must be the RDMs of every slot solved at `(x0, mu)`. When the
    /// starting point is already converged, `x0` is returned untouched after
    /// a single residual evaluation.
    pub fn solve<S: FragmentSolver>(
        &self,
        cost: &CostFunctions<'_, S>,
        x0: PotentialVector,
        mu: ChemicalPotential,
        rdms: Vec<RdmBundle>,
    ) -> Result<LambdaOutcome> {
        let jac = JacobianAssembler::new(0.0, self.settings.d_lambda);
        let mut x = x0;
        let mut rdms = rdms;
        let mut last = f64::INFINITY;

        info!(
            "Site potential search: {} conditions, tolerance {:.1e}, line search {}",
            x.len(),
            self.settings.tol,
            self.settings.line_search
        );

        for it in 1..=self.settings.max_iterations {
            let f = cost.residual_vector(&rdms);
            last = rms(&f);
            info!("  lambda step {:>3}: rms = {:.6e}", it, last);
            if last < self.settings.tol {
                return Ok(LambdaOutcome {
                    potentials: x,
                    rdms,
                    residual_rms: last,
                    iterations: it,
                });
            }

            let j = jac.site_potential(cost, &x, mu, &rdms)?;
            let dx = solve_checked(&j, &(-&f), self.settings.singular_threshold, "site potential Newton")?;
            let best = self.settings.line_search.search(cost, &x, &dx, mu)?;
            info!("    step factor {:.4}, trial rms {:.6e}", best.factor, best.rms);
            x = best.potentials;
            rdms = best.rdms;
        }

        Err(BootstrapError::NotConverged {
            stage: "site potentials",
            iterations: self.settings.max_iterations,
            residual: last,
        })
    }

    /// Same as [`PotentialSolver::solve`], solving the starting RDMs first
    pub fn solve_from<S: FragmentSolver>(
        &self,
        cost: &CostFunctions<'_, S>,
        x0: PotentialVector,
        mu: ChemicalPotential,
    ) -> Result<LambdaOutcome> {
        let rdms = cost.solve_fragments(&x0, mu)?;
        self.solve(cost, x0, mu, rdms)
    }
}
