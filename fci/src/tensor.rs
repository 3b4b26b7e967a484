//! Dense rank-4 tensors for two-electron integrals and two-body RDMs

use crate::error::{FciError, Result};
use nalgebra::DMatrix;
use std::ops::{Index, IndexMut};

/// Dense `dim^4` tensor indexed as `(p, q, r, s)`.
///
/// Integrals use chemists' notation `(pq|rs)`; two-body RDMs use the
/// matching order `Γ_pqrs = <a†p a†r a_s a_q>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor4 {
    dim: usize,
    data: Vec<f64>,
}

impl Tensor4 {
    pub fn zeros(dim: usize) -> Self {
        Tensor4 {
            dim,
            data: vec![0.0; dim.pow(4)],
        }
    }

    /// On-site interaction `(pp|pp) = u` for every orbital
    pub fn hubbard(dim: usize, u: f64) -> Self {
        let mut t = Self::zeros(dim);
        for p in 0..dim {
            t[(p, p, p, p)] = u;
        }
        t
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    fn offset(&self, p: usize, q: usize, r: usize, s: usize) -> usize {
        ((p * self.dim + q) * self.dim + r) * self.dim + s
    }

    pub fn get(&self, p: usize, q: usize, r: usize, s: usize) -> f64 {
        self.data[self.offset(p, q, r, s)]
    }

    pub fn set(&mut self, p: usize, q: usize, r: usize, s: usize, value: f64) {
        let idx = self.offset(p, q, r, s);
        self.data[idx] = value;
    }

    pub fn add(&mut self, p: usize, q: usize, r: usize, s: usize, value: f64) {
        let idx = self.offset(p, q, r, s);
        self.data[idx] += value;
    }

    /// Iterate over all entries whose magnitude exceeds `threshold`
    pub fn nonzero(&self, threshold: f64) -> impl Iterator<Item = ((usize, usize, usize, usize), f64)> + '_ {
        let n = self.dim;
        self.data
            .iter()
            .enumerate()
            .filter(move |(_, v)| v.abs() > threshold)
            .map(move |(idx, &v)| {
                let s = idx % n;
                let r = (idx / n) % n;
                let q = (idx / (n * n)) % n;
                let p = idx / (n * n * n);
                ((p, q, r, s), v)
            })
    }

    /// Four-index transformation `(ab|cd) = Σ C_pa C_qb C_rc C_sd (pq|rs)`.
    ///
    /// `c` has one row per old orbital and one column per new orbital.
    pub fn transform(&self, c: &DMatrix<f64>) -> Result<Self> {
        self.transform_pairs(c, c)
    }

    /// Transformation with separate bases for the two index pairs,
    /// `(ab|cd) = Σ B_pa B_qb K_rc K_sd (pq|rs)`, as needed for
    /// opposite-spin integrals between spin-dependent orbitals.
    ///
    /// Done as two pair transformations, bra pair first.
    pub fn transform_pairs(&self, bra: &DMatrix<f64>, ket: &DMatrix<f64>) -> Result<Self> {
        let n = self.dim;
        for c in [bra, ket] {
            if c.nrows() != n {
                return Err(FciError::DimensionMismatch(format!(
                    "transformation has {} rows, tensor dimension is {}",
                    c.nrows(),
                    n
                )));
            }
        }
        if bra.ncols() != ket.ncols() {
            return Err(FciError::DimensionMismatch(format!(
                "bra basis has {} orbitals, ket basis has {}",
                bra.ncols(),
                ket.ncols()
            )));
        }
        let m = bra.ncols();
        let bra_t = bra.transpose();
        let ket_t = ket.transpose();

        let mut half = vec![0.0; m * m * n * n];
        for r in 0..n {
            for s in 0..n {
                let block = DMatrix::from_fn(n, n, |p, q| self[(p, q, r, s)]);
                let t = &bra_t * block * bra;
                for a in 0..m {
                    for b in 0..m {
                        half[((a * m + b) * n + r) * n + s] = t[(a, b)];
                    }
                }
            }
        }

        let mut out = Tensor4::zeros(m);
        for a in 0..m {
            for b in 0..m {
                let block = DMatrix::from_fn(n, n, |r, s| half[((a * m + b) * n + r) * n + s]);
                let t = &ket_t * block * ket;
                for i in 0..m {
                    for j in 0..m {
                        out[(a, b, i, j)] = t[(i, j)];
                    }
                }
            }
        }
        Ok(out)
    }
}

impl Index<(usize, usize, usize, usize)> for Tensor4 {
    type Output = f64;

    fn index(&self, (p, q, r, s): (usize, usize, usize, usize)) -> &f64 {
        &self.data[self.offset(p, q, r, s)]
    }
}

impl IndexMut<(usize, usize, usize, usize)> for Tensor4 {
    fn index_mut(&mut self, (p, q, r, s): (usize, usize, usize, usize)) -> &mut f64 {
        let idx = self.offset(p, q, r, s);
        &mut self.data[idx]
    }
}
