//! Residuals of the two self-consistency conditions

use crate::error::Result;
use crate::potential::{ChemicalPotential, PotentialVector};
use crate::solver_impl::{FragmentSolver, FragmentSolverAdapter};
use crate::symmetry::{EmbeddingProblem, ResolvedKind};
use fci::{RdmBundle, Spin};
use nalgebra::DVector;

pub struct CostFunctions<'a, S: FragmentSolver> {
    problem: &'a EmbeddingProblem,
    adapter: &'a FragmentSolverAdapter<S>,
    electrons: (f64, f64),
}

impl<'a, S: FragmentSolver> CostFunctions<'a, S> {
    /// `electrons` is the target count per spin for the whole system
    pub fn new(problem: &'a EmbeddingProblem, adapter: &'a FragmentSolverAdapter<S>, electrons: (f64, f64)) -> Self {
        CostFunctions {
            problem,
            adapter,
            electrons,
        }
    }

    pub fn problem(&self) -> &EmbeddingProblem {
        self.problem
    }

    pub fn adapter(&self) -> &FragmentSolverAdapter<S> {
        self.adapter
    }

    pub fn electrons(&self) -> (f64, f64) {
        self.electrons
    }

    /// Fresh RDMs of every slot at `(x, mu)`
    pub fn solve_fragments(&self, x: &PotentialVector, mu: ChemicalPotential) -> Result<Vec<RdmBundle>> {
        self.adapter.solve_all(self.problem, x, mu)
    }

    /// Electrons per spin on the center orbitals, scaled by the multiplicity
    pub fn particle_number(&self, rdms: &[RdmBundle]) -> (f64, f64) {
        let mut n = (0.0, 0.0);
        for (frag, rdm) in self.problem.fragments().iter().zip(rdms) {
            for &c in &frag.centers {
                n.0 += rdm.one_alpha[(c, c)];
                n.1 += rdm.one_beta[(c, c)];
            }
        }
        let m = self.problem.multiplicity() as f64;
        (n.0 * m, n.1 * m)
    }

    pub fn particle_number_residual_from(&self, rdms: &[RdmBundle]) -> (f64, f64) {
        let (na, nb) = self.particle_number(rdms);
        (na - self.electrons.0, nb - self.electrons.1)
    }

    /// Solve all fragments at `(x, mu)` and return the particle-number residual
    pub fn particle_number_residual(&self, x: &PotentialVector, mu: ChemicalPotential) -> Result<(f64, f64)> {
        let rdms = self.solve_fragments(x, mu)?;
        Ok(self.particle_number_residual_from(&rdms))
    }

    /// Residuals of one slot's conditions: reference value minus the value in
    /// `iterate`. References are read from `references`, indexed by slot.
    pub fn matching_residual(&self, slot: usize, references: &[RdmBundle], iterate: &RdmBundle) -> DVector<f64> {
        let frag = self.problem.fragment(slot);
        let full = self.problem.full_density();
        DVector::from_iterator(
            frag.conditions.len(),
            frag.conditions.iter().map(|cond| {
                let reference = &references[cond.reference_slot];
                match cond.kind {
                    ResolvedKind::OneBody {
                        spin,
                        own: [p, q],
                        reference: [rp, rq],
                    } => {
                        if full {
                            reference.total_one_body(rp, rq) - iterate.total_one_body(p, q)
                        } else {
                            reference.one_body_element(spin, rp, rq) - iterate.one_body_element(spin, p, q)
                        }
                    }
                    ResolvedKind::TwoBody {
                        spins,
                        own: [p, q, r, s],
                        reference: [rp, rq, rr, rs],
                    } => {
                        if full {
                            reference.total_two_body(rp, rq, rr, rs) - iterate.total_two_body(p, q, r, s)
                        } else {
                            reference.two_body_element(spins, rp, rq, rr, rs)
                                - iterate.two_body_element(spins, p, q, r, s)
                        }
                    }
                }
            }),
        )
    }

    /// Global residual vector with every slot's own RDMs as the iterate
    pub fn residual_vector(&self, rdms: &[RdmBundle]) -> DVector<f64> {
        let mut f = DVector::zeros(self.problem.num_conditions());
        for slot in 0..self.problem.num_slots() {
            let range = self.problem.condition_range(slot);
            let r = self.matching_residual(slot, rdms, &rdms[slot]);
            f.rows_mut(range.start, range.len()).copy_from(&r);
        }
        f
    }
}

/// `sqrt(|v|² / len)`, zero for an empty vector
pub fn rms(v: &DVector<f64>) -> f64 {
    if v.is_empty() {
        0.0
    } else {
        (v.norm_squared() / v.len() as f64).sqrt()
    }
}

pub fn particle_rms(residual: (f64, f64)) -> f64 {
    ((residual.0 * residual.0 + residual.1 * residual.1) / 2.0).sqrt()
}

pub fn spin_residual(residual: (f64, f64), spin: Spin) -> f64 {
    match spin {
        Spin::Alpha => residual.0,
        Spin::Beta => residual.1,
    }
}
