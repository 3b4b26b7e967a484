use super::FragmentSolver;
use crate::error::{BootstrapError, Result};
use crate::potential::{ChemicalPotential, PotentialVector};
use crate::symmetry::{EmbeddingProblem, ResolvedKind};
use fci::{PotentialTerm, RdmBundle, Spin};
use rayon::prelude::*;
use tracing::debug;

/// Potential-free base solvers, one per problem slot.
///
/// Every evaluation works on a clone, so the bases stay valid for the next
/// finite-difference probe or line-search trial.
#[derive(Debug, Clone)]
pub struct FragmentSolverAdapter<S: FragmentSolver> {
    bases: Vec<S>,
}

impl<S: FragmentSolver> FragmentSolverAdapter<S> {
    pub fn new(bases: Vec<S>) -> Self {
        FragmentSolverAdapter { bases }
    }

    pub fn num_slots(&self) -> usize {
        self.bases.len()
    }

    pub fn base(&self, slot: usize) -> Result<&S> {
        self.bases.get(slot).ok_or(BootstrapError::UnknownFragment(slot))
    }

    /// Chemical potential on every impurity orbital plus one term per
    /// matching condition with its current potential value.
    pub fn potential_terms(
        &self,
        problem: &EmbeddingProblem,
        slot: usize,
        potentials: &[f64],
        mu: ChemicalPotential,
    ) -> Vec<PotentialTerm> {
        let frag = problem.fragment(slot);
        let mut terms = Vec::new();

        for p in frag.impurity() {
            for spin in Spin::BOTH {
                terms.push(PotentialTerm::OneBody {
                    p,
                    q: p,
                    spin,
                    value: -mu.get(spin),
                });
            }
        }

        for (cond, &value) in frag.conditions.iter().zip(potentials) {
            match cond.kind {
                ResolvedKind::OneBody { spin, own: [p, q], .. } => {
                    let spins = if problem.full_density() {
                        Spin::BOTH.to_vec()
                    } else {
                        vec![spin]
                    };
                    for spin in spins {
                        terms.push(PotentialTerm::OneBody { p, q, spin, value });
                    }
                }
                ResolvedKind::TwoBody {
                    spins,
                    own: [p, q, r, s],
                    ..
                } => {
                    let channels: Vec<[Spin; 2]> = if problem.full_density() {
                        Spin::BOTH
                            .iter()
                            .flat_map(|&a| Spin::BOTH.iter().map(move |&b| [a, b]))
                            .collect()
                    } else {
                        vec![spins]
                    };
                    for spins in channels {
                        terms.push(PotentialTerm::TwoBody {
                            p,
                            q,
                            r,
                            s,
                            spins,
                            value,
                        });
                    }
                }
            }
        }
        terms
    }

    /// Clone of the slot's base solver with `terms` added
    pub fn apply(&self, slot: usize, terms: &[PotentialTerm]) -> Result<S> {
        let mut solver = self.base(slot)?.clone();
        for &term in terms {
            solver
                .add_potential_term(term)
                .map_err(|source| BootstrapError::Solver { fragment: slot, source })?;
        }
        Ok(solver)
    }

    /// Solve one slot under the given potentials and return its target-state RDMs
    pub fn solve(
        &self,
        problem: &EmbeddingProblem,
        slot: usize,
        potentials: &[f64],
        mu: ChemicalPotential,
    ) -> Result<RdmBundle> {
        let terms = self.potential_terms(problem, slot, potentials, mu);
        let mut solver = self.apply(slot, &terms)?;
        let wrap = |source| BootstrapError::Solver { fragment: slot, source };
        solver.solve().map_err(wrap)?;
        let rdm = solver.rdm(problem.fragment(slot).state).map_err(wrap)?;
        debug!(
            "slot {} solved with {} potential terms, impurity electrons {:.8}",
            slot,
            terms.len(),
            problem
                .fragment(slot)
                .impurity()
                .map(|p| rdm.total_one_body(p, p))
                .sum::<f64>()
        );
        Ok(rdm)
    }

    /// Solve every slot concurrently
    pub fn solve_all(
        &self,
        problem: &EmbeddingProblem,
        x: &PotentialVector,
        mu: ChemicalPotential,
    ) -> Result<Vec<RdmBundle>> {
        (0..problem.num_slots())
            .into_par_iter()
            .map(|slot| self.solve(problem, slot, x.segment(problem.condition_range(slot)), mu))
            .collect()
    }

    /// Eigenvalue of the slot's target state, potentials included
    pub fn total_energy(
        &self,
        problem: &EmbeddingProblem,
        slot: usize,
        potentials: &[f64],
        mu: ChemicalPotential,
    ) -> Result<f64> {
        let terms = self.potential_terms(problem, slot, potentials, mu);
        let mut solver = self.apply(slot, &terms)?;
        let wrap = |source| BootstrapError::Solver { fragment: slot, source };
        solver.solve().map_err(wrap)?;
        solver.energy(problem.fragment(slot).state).map_err(wrap)
    }

    /// Center-orbital energy of a slot from RDMs it produced
    pub fn fragment_energy(&self, problem: &EmbeddingProblem, slot: usize, rdm: &RdmBundle) -> Result<f64> {
        Ok(self.base(slot)?.partitioned_energy(rdm, &problem.fragment(slot).centers))
    }
}
