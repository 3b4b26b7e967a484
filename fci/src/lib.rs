//! Full configuration interaction for small embedded active spaces
//!
//! The crate solves the many-body problem of a single fragment: an
//! active-space Hamiltonian (impurity + bath orbitals on top of a frozen
//! core) plus any number of one- and two-body potential terms. Solutions are
//! reported as energies and spin-resolved one- and two-body reduced density
//! matrices.
//!
//! Determinants are stored as pairs of 64-bit occupation strings, with every
//! alpha creator ordered before every beta creator.

pub mod davidson;
pub mod determinant;
mod error;
pub mod fci;
pub mod hamiltonian;
pub mod rdm;
pub mod tensor;
#[cfg(test)]
mod tests;

pub use davidson::DavidsonParams;
pub use error::{FciError, Result};
pub use fci::{DiagonalizationMethod, FCI};
pub use hamiltonian::{ActiveSpaceHamiltonian, PotentialTerm};
pub use rdm::RdmBundle;
pub use tensor::Tensor4;

use serde::{Deserialize, Serialize};

/// Electron spin channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spin {
    Alpha,
    Beta,
}

impl Spin {
    pub const BOTH: [Spin; 2] = [Spin::Alpha, Spin::Beta];
}
