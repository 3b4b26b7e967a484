//! Bootstrap embedding self-consistency
//!
//! A lattice is split into overlapping fragments. Each fragment is solved as
//! an embedded many-body problem, and two kinds of potentials are converged:
//! a global chemical potential per spin that fixes the electron count, and
//! per-condition site potentials that make density-matrix elements agree
//! wherever fragments overlap.

pub mod app;
pub mod config;
pub mod cost;
pub mod driver;
pub mod embedding;
mod error;
pub mod io;
pub mod jacobian;
pub mod lambda_impl;
mod linalg;
pub mod matching;
pub mod mu_impl;
pub mod potential;
pub mod solver_impl;
pub mod symmetry;
#[cfg(test)]
mod testing;

pub use cost::CostFunctions;
pub use driver::{BootstrapResult, BootstrapSettings, SelfConsistency};
pub use error::{BootstrapError, Result};
pub use jacobian::JacobianAssembler;
pub use lambda_impl::{LineSearch, PotentialSolver};
pub use matching::{Fragment, MatchingCondition, MatchingModel};
pub use mu_impl::{ChemicalPotentialSolver, MuStrategy};
pub use potential::{ChemicalPotential, PotentialVector};
pub use solver_impl::{FragmentSolver, FragmentSolverAdapter};
pub use symmetry::{EmbeddingProblem, OrbitalAnalog, SymmetryReducer};
