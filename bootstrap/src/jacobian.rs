//! Finite-difference Jacobians of the two residual functions

use crate::cost::CostFunctions;
use crate::error::Result;
use crate::potential::{ChemicalPotential, PotentialVector};
use crate::solver_impl::FragmentSolver;
use fci::{RdmBundle, Spin};
use nalgebra::{DMatrix, Matrix2};
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobianAssembler {
    pub d_mu: f64,
    pub d_lambda: f64,
}

impl JacobianAssembler {
    pub fn new(d_mu: f64, d_lambda: f64) -> Self {
        JacobianAssembler { d_mu, d_lambda }
    }

    /// One-sided 2x2 Jacobian of the particle-number residual. Column `j` is
    /// the response of both spin residuals to a shift of spin `j`'s potential.
    pub fn chemical_potential<S: FragmentSolver>(
        &self,
        cost: &CostFunctions<'_, S>,
        x: &PotentialVector,
        mu: ChemicalPotential,
        f0: (f64, f64),
    ) -> Result<Matrix2<f64>> {
        let (fa, fb) = rayon::join(
            || cost.particle_number_residual(x, mu.shifted(Spin::Alpha, self.d_mu)),
            || cost.particle_number_residual(x, mu.shifted(Spin::Beta, self.d_mu)),
        );
        let (fa, fb) = (fa?, fb?);
        Ok(Matrix2::new(
            (fa.0 - f0.0) / self.d_mu,
            (fb.0 - f0.0) / self.d_mu,
            (fa.1 - f0.1) / self.d_mu,
            (fb.1 - f0.1) / self.d_mu,
        ))
    }

    /// Centered-difference Jacobian of the matching residuals.
    ///
    /// A column belonging to slot `x` only re-solves slot `x`; reference
    /// values stay fixed at `references`, so only `x`'s own row block is
    /// filled and all cross-slot blocks are zero.
    pub fn site_potential<S: FragmentSolver>(
        &self,
        cost: &CostFunctions<'_, S>,
        x: &PotentialVector,
        mu: ChemicalPotential,
        references: &[RdmBundle],
    ) -> Result<DMatrix<f64>> {
        let problem = cost.problem();
        let n = problem.num_conditions();
        let h = self.d_lambda;

        let columns = (0..n)
            .into_par_iter()
            .map(|col| {
                let slot = problem.slot_of(col);
                let range = problem.condition_range(slot);
                let plus = x.perturbed(col, h);
                let minus = x.perturbed(col, -h);
                let rdm_plus = cost.adapter().solve(problem, slot, plus.segment(range.clone()), mu)?;
                let rdm_minus = cost.adapter().solve(problem, slot, minus.segment(range), mu)?;
                let r_plus = cost.matching_residual(slot, references, &rdm_plus);
                let r_minus = cost.matching_residual(slot, references, &rdm_minus);
                Ok((col, slot, (r_plus - r_minus) / (2.0 * h)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut jacobian = DMatrix::zeros(n, n);
        for (col, slot, block) in columns {
            let start = problem.condition_range(slot).start;
            jacobian.view_mut((start, col), (block.len(), 1)).copy_from(&block);
        }
        debug!("site-potential Jacobian assembled ({}x{})", n, n);
        Ok(jacobian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver_impl::FragmentSolverAdapter;
    use crate::symmetry::SymmetryReducer;
    use crate::testing::{ring_model, LinearStub};
    use approx::assert_abs_diff_eq;
    use nalgebra::DVector;

    #[test]
    fn test_site_jacobian_is_block_local() {
        let (chi, leak) = (0.8, 0.1);
        let model = ring_model(4);
        let problem = SymmetryReducer::identity(&model, false).unwrap();
        let bases = (0..4)
            .map(|i| LinearStub::new(vec![0.4 + 0.05 * i as f64, 0.5, 0.45], chi, leak))
            .collect();
        let adapter = FragmentSolverAdapter::new(bases);
        let cost = CostFunctions::new(&problem, &adapter, (2.0, 2.0));
        let mu = ChemicalPotential::default();
        let x = PotentialVector::from_values(DVector::from_fn(8, |i, _| 0.01 * i as f64));
        let references = cost.solve_fragments(&x, mu).unwrap();

        let jac = JacobianAssembler::new(1e-6, 1e-6);
        let j = jac.site_potential(&cost, &x, mu, &references).unwrap();

        for col in 0..8 {
            let owner = problem.slot_of(col);
            for row in 0..8 {
                let same_block = problem.slot_of(row) == owner;
                if !same_block {
                    assert_eq!(j[(row, col)], 0.0);
                } else if row == col {
                    // raising an edge potential empties that edge
                    assert_abs_diff_eq!(j[(row, col)], chi, epsilon = 1e-6);
                } else {
                    assert_abs_diff_eq!(j[(row, col)], leak, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_perturbation_leaves_other_fragments_unchanged() {
        let model = ring_model(4);
        let problem = SymmetryReducer::identity(&model, false).unwrap();
        let bases = (0..4).map(|_| LinearStub::new(vec![0.3, 0.6, 0.4], 1.0, 0.2)).collect();
        let adapter = FragmentSolverAdapter::new(bases);
        let cost = CostFunctions::new(&problem, &adapter, (2.0, 2.0));
        let mu = ChemicalPotential::new(0.1, 0.0);
        let x = PotentialVector::zeros(8);
        let references = cost.solve_fragments(&x, mu).unwrap();

        for col in 0..8 {
            let owner = problem.slot_of(col);
            let perturbed = cost.solve_fragments(&x.perturbed(col, 1e-3), mu).unwrap();
            for slot in (0..4).filter(|&s| s != owner) {
                let before = cost.matching_residual(slot, &references, &references[slot]);
                let after = cost.matching_residual(slot, &references, &perturbed[slot]);
                assert_eq!(before, after);
            }
        }
    }

    #[test]
    fn test_chemical_potential_jacobian() {
        let model = ring_model(3);
        let problem = SymmetryReducer::identity(&model, false).unwrap();
        let bases = (0..3).map(|_| LinearStub::new(vec![0.5; 3], 0.5, 0.1)).collect();
        let adapter = FragmentSolverAdapter::new(bases);
        let cost = CostFunctions::new(&problem, &adapter, (1.0, 1.0));
        let x = PotentialVector::zeros(6);
        let mu = ChemicalPotential::default();
        let f0 = cost.particle_number_residual(&x, mu).unwrap();

        let j = JacobianAssembler::new(1e-6, 1e-6)
            .chemical_potential(&cost, &x, mu, f0)
            .unwrap();
        // each center gains chi + 2 * leak per unit of mu, over three fragments
        assert_abs_diff_eq!(j[(0, 0)], 3.0 * 0.7, epsilon = 1e-6);
        assert_abs_diff_eq!(j[(1, 1)], 3.0 * 0.7, epsilon = 1e-6);
        assert_abs_diff_eq!(j[(0, 1)], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(j[(1, 0)], 0.0, epsilon = 1e-12);
    }
}
