//! Fragment solver boundary
//!
//! The engine only needs to add potential terms to a copy of a fragment's
//! base solver, run it, and read back RDMs and energies. `FragmentSolver`
//! captures exactly that; `fci::FCI` is the production implementation.

mod adapter;

pub use adapter::FragmentSolverAdapter;

use fci::{FciError, PotentialTerm, RdmBundle, FCI};

pub trait FragmentSolver: Clone + Send + Sync {
    /// Add a term to this instance's Hamiltonian only
    fn add_potential_term(&mut self, term: PotentialTerm) -> Result<(), FciError>;

    fn solve(&mut self) -> Result<(), FciError>;

    fn rdm(&self, state: usize) -> Result<RdmBundle, FciError>;

    fn energy(&self, state: usize) -> Result<f64, FciError>;

    /// Energy attributed to the `centers` positions, evaluated with the
    /// potential-free Hamiltonian
    fn partitioned_energy(&self, rdm: &RdmBundle, centers: &[usize]) -> f64;
}

impl FragmentSolver for FCI {
    fn add_potential_term(&mut self, term: PotentialTerm) -> Result<(), FciError> {
        self.add_potential(term)
    }

    fn solve(&mut self) -> Result<(), FciError> {
        FCI::solve(self)
    }

    fn rdm(&self, state: usize) -> Result<RdmBundle, FciError> {
        FCI::rdm(self, state)
    }

    fn energy(&self, state: usize) -> Result<f64, FciError> {
        FCI::energy(self, state)
    }

    fn partitioned_energy(&self, rdm: &RdmBundle, centers: &[usize]) -> f64 {
        self.hamiltonian().partitioned_energy(rdm, centers)
    }
}
