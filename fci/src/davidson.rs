//! Sparse Hamiltonian storage and the Davidson eigensolver

use crate::error::{FciError, Result};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Davidson convergence controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DavidsonParams {
    pub max_iterations: usize,
    pub convergence_threshold: f64,
    pub max_subspace: usize,
}

impl Default for DavidsonParams {
    fn default() -> Self {
        DavidsonParams {
            max_iterations: 200,
            convergence_threshold: 1e-9,
            max_subspace: 40,
        }
    }
}

/// Real symmetric matrix stored by columns
#[derive(Debug, Clone)]
pub struct SparseSymmetric {
    columns: Vec<Vec<(usize, f64)>>,
}

impl SparseSymmetric {
    /// Columns may contain repeated row indices; they are merged here.
    pub fn from_columns(columns: Vec<Vec<(usize, f64)>>) -> Self {
        let columns = columns
            .into_par_iter()
            .map(|mut col| {
                col.sort_by_key(|&(row, _)| row);
                let mut merged: Vec<(usize, f64)> = Vec::with_capacity(col.len());
                for (row, v) in col {
                    match merged.last_mut() {
                        Some((last, acc)) if *last == row => *acc += v,
                        _ => merged.push((row, v)),
                    }
                }
                merged.retain(|&(_, v)| v != 0.0);
                merged
            })
            .collect();
        SparseSymmetric { columns }
    }

    pub fn dim(&self) -> usize {
        self.columns.len()
    }

    pub fn diagonal(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.dim(),
            self.columns.iter().enumerate().map(|(i, col)| {
                col.iter()
                    .find(|&&(row, _)| row == i)
                    .map(|&(_, v)| v)
                    .unwrap_or(0.0)
            }),
        )
    }

    /// `H v`, using symmetry to compute each row from the stored column
    pub fn multiply(&self, v: &DVector<f64>) -> DVector<f64> {
        let values: Vec<f64> = self
            .columns
            .par_iter()
            .map(|col| col.iter().map(|&(j, h)| h * v[j]).sum())
            .collect();
        DVector::from_vec(values)
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.dim();
        let mut m = DMatrix::zeros(n, n);
        for (j, col) in self.columns.iter().enumerate() {
            for &(i, v) in col {
                m[(i, j)] = v;
            }
        }
        m
    }
}

/// Symmetric eigendecomposition with eigenvalues in ascending order
pub fn sorted_symmetric_eigen(matrix: DMatrix<f64>) -> (DVector<f64>, DMatrix<f64>) {
    let eig = matrix.symmetric_eigen();
    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

    let values = DVector::from_iterator(order.len(), order.iter().map(|&i| eig.eigenvalues[i]));
    let mut vectors = DMatrix::zeros(eig.eigenvectors.nrows(), order.len());
    for (k, &i) in order.iter().enumerate() {
        vectors.set_column(k, &eig.eigenvectors.column(i));
    }
    (values, vectors)
}

/// Lowest `nroots` eigenpairs of a dense matrix
pub fn exact_lowest(h: &SparseSymmetric, nroots: usize) -> (DVector<f64>, DMatrix<f64>) {
    let (values, vectors) = sorted_symmetric_eigen(h.to_dense());
    let k = nroots.min(values.len());
    (values.rows(0, k).into_owned(), vectors.columns(0, k).into_owned())
}

fn orthogonalize(t: &mut DVector<f64>, basis: &[DVector<f64>]) {
    // twice for numerical stability
    for _ in 0..2 {
        for b in basis {
            let overlap = b.dot(t);
            t.axpy(-overlap, b, 1.0);
        }
    }
}

/// Lowest `nroots` eigenpairs by the Davidson method with a diagonal
/// preconditioner. Problems that fit in the subspace are solved exactly.
pub fn davidson(
    h: &SparseSymmetric,
    nroots: usize,
    params: &DavidsonParams,
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let dim = h.dim();
    let max_subspace = params.max_subspace.max(2 * nroots);
    if dim <= max_subspace {
        return Ok(exact_lowest(h, nroots));
    }

    let diag = h.diagonal();
    let mut order: Vec<usize> = (0..dim).collect();
    order.sort_by(|&a, &b| diag[a].total_cmp(&diag[b]));

    let mut basis: Vec<DVector<f64>> = Vec::new();
    let mut sigma: Vec<DVector<f64>> = Vec::new();
    for &i in order.iter().take(nroots) {
        let mut v = DVector::zeros(dim);
        v[i] = 1.0;
        sigma.push(h.multiply(&v));
        basis.push(v);
    }

    let mut residual_norm = f64::INFINITY;
    for iter in 0..params.max_iterations {
        let k = basis.len();
        let sub = DMatrix::from_fn(k, k, |i, j| 0.5 * (basis[i].dot(&sigma[j]) + basis[j].dot(&sigma[i])));
        let (theta, y) = sorted_symmetric_eigen(sub);

        let mut ritz = Vec::with_capacity(nroots);
        let mut ritz_sigma = Vec::with_capacity(nroots);
        let mut residuals = Vec::with_capacity(nroots);
        for root in 0..nroots {
            let mut x = DVector::zeros(dim);
            let mut hx = DVector::zeros(dim);
            for j in 0..k {
                x.axpy(y[(j, root)], &basis[j], 1.0);
                hx.axpy(y[(j, root)], &sigma[j], 1.0);
            }
            let r = &hx - theta[root] * &x;
            residuals.push(r);
            ritz.push(x);
            ritz_sigma.push(hx);
        }

        residual_norm = residuals.iter().map(|r| r.norm()).fold(0.0, f64::max);
        debug!("Davidson iteration {}: subspace {}, max residual {:.3e}", iter, k, residual_norm);
        if residual_norm < params.convergence_threshold {
            let values = theta.rows(0, nroots).into_owned();
            let mut vectors = DMatrix::zeros(dim, nroots);
            for (root, x) in ritz.iter().enumerate() {
                vectors.set_column(root, &x.normalize());
            }
            return Ok((values, vectors));
        }

        if k + nroots > max_subspace {
            basis.clear();
            sigma.clear();
            for (x, hx) in ritz.iter().zip(ritz_sigma.iter()) {
                let mut v = x.clone();
                let mut hv = hx.clone();
                for (b, hb) in basis.iter().zip(sigma.iter()) {
                    let overlap = b.dot(&v);
                    v.axpy(-overlap, b, 1.0);
                    hv.axpy(-overlap, hb, 1.0);
                }
                let norm = v.norm();
                if norm > 1e-10 {
                    basis.push(v / norm);
                    sigma.push(hv / norm);
                }
            }
        }

        let mut added = 0;
        for (root, r) in residuals.iter().enumerate() {
            if r.norm() < params.convergence_threshold {
                continue;
            }
            let mut t = DVector::from_fn(dim, |i, _| {
                let denom = theta[root] - diag[i];
                let denom = if denom.abs() < 1e-8 { 1e-8_f64.copysign(denom) } else { denom };
                r[i] / denom
            });
            orthogonalize(&mut t, &basis);
            let norm = t.norm();
            if norm > 1e-10 {
                let t = t / norm;
                sigma.push(h.multiply(&t));
                basis.push(t);
                added += 1;
            }
        }
        if added == 0 {
            return Err(FciError::NotConverged {
                iterations: iter + 1,
                residual: residual_norm,
            });
        }
    }

    Err(FciError::NotConverged {
        iterations: params.max_iterations,
        residual: residual_norm,
    })
}
