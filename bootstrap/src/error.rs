use fci::FciError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("fragment {fragment} does not contain orbital {orbital}")]
    UnknownOrbital { fragment: usize, orbital: usize },

    #[error("fragment {0} does not exist")]
    UnknownFragment(usize),

    #[error("fragment solver failed on fragment {fragment}")]
    Solver {
        fragment: usize,
        #[source]
        source: FciError,
    },

    #[error("singular Jacobian in {context} (reciprocal condition number {rcond:.3e})")]
    SingularJacobian { context: &'static str, rcond: f64 },

    #[error("{stage} did not converge after {iterations} iterations (residual {residual:.3e})")]
    NotConverged {
        stage: &'static str,
        iterations: usize,
        residual: f64,
    },

    #[error("chemical potential bracket collapsed to width {width:.3e} at residual {residual:.3e}")]
    DegenerateRoot { width: f64, residual: f64 },

    #[error("fragments are not translationally equivalent: {0}")]
    NotEquivalent(String),
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
