use super::{log_evaluation, MuOutcome, MuSettings};
use crate::cost::{particle_rms, CostFunctions};
use crate::error::{BootstrapError, Result};
use crate::jacobian::JacobianAssembler;
use crate::linalg::solve_checked;
use crate::potential::{ChemicalPotential, PotentialVector};
use crate::solver_impl::FragmentSolver;
use nalgebra::{DMatrix, DVector};

pub(super) fn solve<S: FragmentSolver>(
    cost: &CostFunctions<'_, S>,
    x: &PotentialVector,
    mu0: ChemicalPotential,
    settings: &MuSettings,
) -> Result<MuOutcome> {
    let jac = JacobianAssembler::new(settings.d_mu, 0.0);
    let mut mu = mu0;
    let mut last = f64::INFINITY;

    for it in 1..=settings.max_iterations {
        let f = cost.particle_number_residual(x, mu)?;
        log_evaluation(it, mu, f);
        last = particle_rms(f);
        if last < settings.tol {
            return Ok(MuOutcome::converged(mu, f, it));
        }

        let j = jac.chemical_potential(cost, x, mu, f)?;
        let j = DMatrix::from_iterator(2, 2, j.iter().copied());
        let rhs = DVector::from_vec(vec![-f.0, -f.1]);
        let step = solve_checked(&j, &rhs, settings.singular_threshold, "chemical potential Newton")?;
        mu = ChemicalPotential::new(mu.alpha + step[0], mu.beta + step[1]);
    }

    Err(BootstrapError::NotConverged {
        stage: "chemical potential (Newton)",
        iterations: settings.max_iterations,
        residual: last,
    })
}
