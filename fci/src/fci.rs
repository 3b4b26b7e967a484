//! Determinant-based full configuration interaction solver

use crate::davidson::{davidson, exact_lowest, DavidsonParams, SparseSymmetric};
use crate::determinant::{Excitation, StringSpace};
use crate::error::{FciError, Result};
use crate::hamiltonian::{ActiveSpaceHamiltonian, PotentialTerm};
use crate::rdm::RdmBundle;
use crate::tensor::Tensor4;
use crate::Spin;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// Eigensolver used for the CI matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagonalizationMethod {
    /// Dense symmetric eigendecomposition
    Exact,
    /// Iterative lowest-root solver
    Davidson(DavidsonParams),
}

#[derive(Debug)]
struct Solution {
    energies: DVector<f64>,
    vectors: DMatrix<f64>,
}

/// FCI solver for one active space
///
/// Cloning is cheap for the fixed parts (integrals and string spaces are
/// shared) and copies the list of applied potentials, so potentials added to
/// a clone never reach the original.
#[derive(Debug, Clone)]
pub struct FCI {
    hamiltonian: Arc<ActiveSpaceHamiltonian>,
    alpha: Arc<StringSpace>,
    beta: Arc<StringSpace>,
    potentials: Vec<PotentialTerm>,
    method: DiagonalizationMethod,
    num_states: usize,
    solution: Option<Arc<Solution>>,
}

impl FCI {
    pub fn new(
        hamiltonian: ActiveSpaceHamiltonian,
        num_states: usize,
        method: DiagonalizationMethod,
    ) -> Result<Self> {
        let alpha = StringSpace::new(hamiltonian.n_orb, hamiltonian.n_alpha)?;
        let beta = StringSpace::new(hamiltonian.n_orb, hamiltonian.n_beta)?;
        let dim = alpha.len() * beta.len();
        if num_states == 0 || num_states > dim {
            return Err(FciError::StateOutOfRange {
                state: num_states.saturating_sub(1),
                available: dim,
            });
        }

        info!(
            "FCI space: {} orbitals, {} alpha / {} beta electrons, {} determinants",
            hamiltonian.n_orb, hamiltonian.n_alpha, hamiltonian.n_beta, dim
        );

        Ok(FCI {
            hamiltonian: Arc::new(hamiltonian),
            alpha: Arc::new(alpha),
            beta: Arc::new(beta),
            potentials: Vec::new(),
            method,
            num_states,
            solution: None,
        })
    }

    pub fn hamiltonian(&self) -> &ActiveSpaceHamiltonian {
        &self.hamiltonian
    }

    pub fn potentials(&self) -> &[PotentialTerm] {
        &self.potentials
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn dimension(&self) -> usize {
        self.alpha.len() * self.beta.len()
    }

    pub fn is_solved(&self) -> bool {
        self.solution.is_some()
    }

    /// Add a potential term; invalidates any previous solution
    pub fn add_potential(&mut self, term: PotentialTerm) -> Result<()> {
        let n = self.hamiltonian.n_orb;
        if term.max_orbital() >= n {
            return Err(FciError::OrbitalOutOfRange {
                index: term.max_orbital(),
                orbitals: n,
            });
        }
        self.potentials.push(term);
        self.solution = None;
        Ok(())
    }

    #[inline]
    fn index(&self, ia: usize, ib: usize) -> usize {
        ia * self.beta.len() + ib
    }

    fn operator_terms(&self) -> Vec<(Excitation, f64)> {
        let mut terms = self.hamiltonian.excitations();
        for pot in &self.potentials {
            terms.extend(pot.excitations());
        }
        terms
    }

    fn build_matrix(&self) -> SparseSymmetric {
        let terms = self.operator_terms();
        let nb = self.beta.len();
        let core = self.hamiltonian.core_energy;

        let columns = (0..self.dimension())
            .into_par_iter()
            .map(|col| {
                let (ia, ib) = (col / nb, col % nb);
                let (sa, sb) = (self.alpha.string(ia), self.beta.string(ib));
                let mut entries = vec![(col, core)];
                for (exc, coeff) in &terms {
                    if let Some((ta, tb, sign)) = exc.apply(sa, sb) {
                        if let (Some(ja), Some(jb)) = (self.alpha.position(ta), self.beta.position(tb)) {
                            entries.push((self.index(ja, jb), sign * coeff));
                        }
                    }
                }
                entries
            })
            .collect();
        SparseSymmetric::from_columns(columns)
    }

    /// Diagonalize the Hamiltonian with all applied potentials
    pub fn solve(&mut self) -> Result<()> {
        let matrix = self.build_matrix();
        let (energies, vectors) = match self.method {
            DiagonalizationMethod::Exact => exact_lowest(&matrix, self.num_states),
            DiagonalizationMethod::Davidson(params) => davidson(&matrix, self.num_states, &params)?,
        };
        debug!(
            "FCI solved: dimension {}, {} potential terms, lowest energy {:.10}",
            matrix.dim(),
            self.potentials.len(),
            energies[0]
        );
        self.solution = Some(Arc::new(Solution { energies, vectors }));
        Ok(())
    }

    fn solution(&self) -> Result<&Solution> {
        self.solution.as_deref().ok_or(FciError::NotSolved)
    }

    fn state_vector(&self, state: usize) -> Result<DVector<f64>> {
        let sol = self.solution()?;
        if state >= sol.energies.len() {
            return Err(FciError::StateOutOfRange {
                state,
                available: sol.energies.len(),
            });
        }
        Ok(sol.vectors.column(state).into_owned())
    }

    /// Eigenvalue of the Hamiltonian including applied potentials
    pub fn energy(&self, state: usize) -> Result<f64> {
        let sol = self.solution()?;
        sol.energies
            .get(state)
            .copied()
            .ok_or(FciError::StateOutOfRange {
                state,
                available: sol.energies.len(),
            })
    }

    /// `<Ψ|exc|Ψ>` accumulated over all determinants
    fn expectation(&self, c: &DVector<f64>, exc: &Excitation) -> f64 {
        let nb = self.beta.len();
        let mut acc = 0.0;
        for (col, &ci) in c.iter().enumerate() {
            if ci == 0.0 {
                continue;
            }
            let (sa, sb) = (self.alpha.string(col / nb), self.beta.string(col % nb));
            if let Some((ta, tb, sign)) = exc.apply(sa, sb) {
                if let (Some(ja), Some(jb)) = (self.alpha.position(ta), self.beta.position(tb)) {
                    acc += c[self.index(ja, jb)] * sign * ci;
                }
            }
        }
        acc
    }

    fn one_rdm(&self, c: &DVector<f64>, spin: Spin) -> DMatrix<f64> {
        let n = self.hamiltonian.n_orb;
        DMatrix::from_fn(n, n, |p, q| self.expectation(c, &Excitation::One { spin, p, q }))
    }

    fn two_rdm(&self, c: &DVector<f64>, spins: [Spin; 2]) -> Tensor4 {
        let n = self.hamiltonian.n_orb;
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|p| {
                let mut row = Vec::with_capacity(n * n * n);
                for q in 0..n {
                    for r in 0..n {
                        for s in 0..n {
                            row.push(self.expectation(c, &Excitation::Two { spins, p, q, r, s }));
                        }
                    }
                }
                row
            })
            .collect();

        let mut t = Tensor4::zeros(n);
        for (p, row) in rows.into_iter().enumerate() {
            let mut it = row.into_iter();
            for q in 0..n {
                for r in 0..n {
                    for s in 0..n {
                        t[(p, q, r, s)] = it.next().unwrap_or(0.0);
                    }
                }
            }
        }
        t
    }

    /// One- and two-body RDMs of a solved state
    pub fn rdm(&self, state: usize) -> Result<RdmBundle> {
        let c = self.state_vector(state)?;
        Ok(RdmBundle {
            one_alpha: self.one_rdm(&c, Spin::Alpha),
            one_beta: self.one_rdm(&c, Spin::Beta),
            two_aa: self.two_rdm(&c, [Spin::Alpha, Spin::Alpha]),
            two_ab: self.two_rdm(&c, [Spin::Alpha, Spin::Beta]),
            two_bb: self.two_rdm(&c, [Spin::Beta, Spin::Beta]),
        })
    }

    /// Partitioned energy of the `centers` orbitals, evaluated with the
    /// potential-free Hamiltonian
    pub fn impurity_energy(&self, state: usize, centers: &[usize]) -> Result<f64> {
        let n = self.hamiltonian.n_orb;
        if let Some(&bad) = centers.iter().find(|&&p| p >= n) {
            return Err(FciError::OrbitalOutOfRange { index: bad, orbitals: n });
        }
        let rdm = self.rdm(state)?;
        Ok(self.hamiltonian.partitioned_energy(&rdm, centers))
    }
}
