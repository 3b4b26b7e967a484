use thiserror::Error;

#[derive(Debug, Error)]
pub enum FciError {
    #[error("cannot place {electrons} electrons in {orbitals} orbitals")]
    TooManyElectrons { electrons: usize, orbitals: usize },

    #[error("{0} orbitals exceed the 64-orbital limit of the determinant strings")]
    TooManyOrbitals(usize),

    #[error("orbital index {index} out of range for {orbitals} active orbitals")]
    OrbitalOutOfRange { index: usize, orbitals: usize },

    #[error("state {state} requested but only {available} states are available")]
    StateOutOfRange { state: usize, available: usize },

    #[error("Davidson did not converge after {iterations} iterations (residual {residual:.3e})")]
    NotConverged { iterations: usize, residual: f64 },

    #[error("solve() must be called before querying the solution")]
    NotSolved,

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
}

pub type Result<T> = std::result::Result<T, FciError>;
