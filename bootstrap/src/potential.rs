//! Potential values, kept apart from the matching topology
//!
//! Every update returns a new `PotentialVector` with an incremented version,
//! so a vector handed to a fragment solve is never changed underneath it.

use fci::Spin;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Global chemical potential, one value per spin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChemicalPotential {
    pub alpha: f64,
    pub beta: f64,
}

impl ChemicalPotential {
    pub fn new(alpha: f64, beta: f64) -> Self {
        ChemicalPotential { alpha, beta }
    }

    pub fn get(&self, spin: Spin) -> f64 {
        match spin {
            Spin::Alpha => self.alpha,
            Spin::Beta => self.beta,
        }
    }

    pub fn shifted(&self, spin: Spin, delta: f64) -> Self {
        match spin {
            Spin::Alpha => Self::new(self.alpha + delta, self.beta),
            Spin::Beta => Self::new(self.alpha, self.beta + delta),
        }
    }
}

/// Site potentials, one per matching condition in fragment order
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialVector {
    values: DVector<f64>,
    version: u64,
}

impl PotentialVector {
    pub fn zeros(len: usize) -> Self {
        PotentialVector {
            values: DVector::zeros(len),
            version: 0,
        }
    }

    pub fn from_values(values: DVector<f64>) -> Self {
        PotentialVector { values, version: 0 }
    }

    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Potentials of one fragment's conditions
    pub fn segment(&self, range: Range<usize>) -> &[f64] {
        &self.values.as_slice()[range]
    }

    pub fn with_values(&self, values: DVector<f64>) -> Self {
        PotentialVector {
            values,
            version: self.version + 1,
        }
    }

    /// `x + a * dx`
    pub fn stepped(&self, dx: &DVector<f64>, a: f64) -> Self {
        self.with_values(&self.values + dx * a)
    }

    /// Copy with a single entry shifted by `delta`
    pub fn perturbed(&self, index: usize, delta: f64) -> Self {
        let mut values = self.values.clone();
        values[index] += delta;
        self.with_values(values)
    }

    /// Repeat the vector `copies` times
    pub fn tiled(&self, copies: usize) -> Self {
        let n = self.values.len();
        let values = DVector::from_fn(n * copies, |i, _| self.values[i % n.max(1)]);
        self.with_values(values)
    }
}
