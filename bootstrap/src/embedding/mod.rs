//! Embedded fragment Hamiltonians
//!
//! A fragment's impurity orbitals are completed with Schmidt bath orbitals
//! taken from a mean-field density of the whole lattice. The remaining
//! environment is split into frozen occupied core and empty virtual orbitals,
//! separately for each spin, and the lattice Hamiltonian is projected onto
//! impurity + bath.

mod lattice;
mod schmidt;

pub use lattice::LatticeModel;
pub use schmidt::{schmidt_decompose, SchmidtRotation};

use crate::error::{BootstrapError, Result};
use crate::matching::Fragment;
use fci::{ActiveSpaceHamiltonian, Spin};
use nalgebra::DMatrix;
use tracing::info;

/// Occupation window used to classify environment natural orbitals
pub const DEFAULT_SCHMIDT_THRESHOLD: f64 = 1e-10;

/// Coulomb matrix `J_pq = Σ (pq|rs) D_rs`
fn coulomb(lattice: &LatticeModel, density: &DMatrix<f64>) -> DMatrix<f64> {
    let n = lattice.num_sites();
    DMatrix::from_fn(n, n, |p, q| {
        let mut jpq = 0.0;
        for r in 0..n {
            for s in 0..n {
                jpq += lattice.eri[(p, q, r, s)] * density[(r, s)];
            }
        }
        jpq
    })
}

/// Exchange matrix `K_pq = Σ (pr|qs) D_rs`
fn exchange(lattice: &LatticeModel, density: &DMatrix<f64>) -> DMatrix<f64> {
    let n = lattice.num_sites();
    DMatrix::from_fn(n, n, |p, q| {
        let mut kpq = 0.0;
        for r in 0..n {
            for s in 0..n {
                kpq += lattice.eri[(p, r, q, s)] * density[(r, s)];
            }
        }
        kpq
    })
}

/// Active-space Hamiltonian of `fragment` embedded in `lattice`
///
/// Each spin gets its own Schmidt rotation of its mean-field density. When
/// the two baths differ in size the smaller one is padded so both spins share
/// one active-space dimension.
pub fn build_active_space(lattice: &LatticeModel, fragment: &Fragment, eps: f64) -> Result<ActiveSpaceHamiltonian> {
    if fragment.bath_state != 0 {
        return Err(BootstrapError::Config(format!(
            "bath state {} requested, only the mean-field ground state (0) is available",
            fragment.bath_state
        )));
    }
    let n = lattice.num_sites();
    if let Some(&orb) = fragment.orbitals.iter().find(|&&o| o >= n) {
        return Err(BootstrapError::Config(format!(
            "fragment orbital {} outside a lattice of {} sites",
            orb, n
        )));
    }

    let mut alpha = schmidt_decompose(&lattice.noninteracting_density(Spin::Alpha), &fragment.orbitals, eps);
    let mut beta = schmidt_decompose(&lattice.noninteracting_density(Spin::Beta), &fragment.orbitals, eps);
    if alpha.n_bath < beta.n_bath {
        alpha.pad_bath(beta.n_bath, &beta.bath());
    } else if beta.n_bath < alpha.n_bath {
        beta.pad_bath(alpha.n_bath, &alpha.bath());
    }

    let core_alpha = alpha.core();
    let core_beta = beta.core();
    let density_alpha = &core_alpha * core_alpha.transpose();
    let density_beta = &core_beta * core_beta.transpose();
    let j = coulomb(lattice, &(&density_alpha + &density_beta));
    let fock_alpha = &lattice.h + &j - exchange(lattice, &density_alpha);
    let fock_beta = &lattice.h + &j - exchange(lattice, &density_beta);
    let core_energy = lattice.constant
        + 0.5
            * (density_alpha.component_mul(&(&lattice.h + &fock_alpha)).sum()
                + density_beta.component_mul(&(&lattice.h + &fock_beta)).sum());

    let electrons = |total: usize, schmidt: &SchmidtRotation| {
        total
            .checked_sub(schmidt.n_core)
            .filter(|&m| m <= schmidt.n_active())
            .ok_or_else(|| {
                BootstrapError::Config(format!(
                    "{} electrons cannot fill {} core and {} active orbitals",
                    total,
                    schmidt.n_core,
                    schmidt.n_active()
                ))
            })
    };
    let n_alpha = electrons(lattice.n_alpha, &alpha)?;
    let n_beta = electrons(lattice.n_beta, &beta)?;

    info!(
        "Fragment {:?}: {} impurity + {} bath orbitals, core {}/{}, active electrons {}/{}",
        fragment.orbitals, alpha.n_impurity, alpha.n_bath, alpha.n_core, beta.n_core, n_alpha, n_beta
    );

    let active_alpha = alpha.active();
    let active_beta = beta.active();
    let project = |fock: &DMatrix<f64>, active: &DMatrix<f64>| active.transpose() * fock * active;
    let transform = |bra: &DMatrix<f64>, ket: &DMatrix<f64>| {
        lattice
            .eri
            .transform_pairs(bra, ket)
            .map_err(|e| BootstrapError::Config(format!("integral transformation failed: {}", e)))
    };

    let hamiltonian = ActiveSpaceHamiltonian::unrestricted(
        core_energy,
        project(&fock_alpha, &active_alpha),
        project(&fock_beta, &active_beta),
        transform(&active_alpha, &active_alpha)?,
        transform(&active_alpha, &active_beta)?,
        transform(&active_beta, &active_beta)?,
        n_alpha,
        n_beta,
    )
    .map_err(|e| BootstrapError::Config(format!("invalid active space: {}", e)))?;
    Ok(hamiltonian.with_bare_one_body(
        project(&lattice.h, &active_alpha),
        project(&lattice.h, &active_beta),
    ))
}
