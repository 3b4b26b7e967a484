use crate::error::{BootstrapError, Result};
use fci::davidson::sorted_symmetric_eigen;
use fci::{Spin, Tensor4};
use nalgebra::DMatrix;
use tracing::{info, warn};

const DEGENERACY_THRESHOLD: f64 = 1e-8;

/// Whole-system Hamiltonian in an orthonormal site basis
#[derive(Debug, Clone)]
pub struct LatticeModel {
    pub h: DMatrix<f64>,
    pub eri: Tensor4,
    pub constant: f64,
    pub n_alpha: usize,
    pub n_beta: usize,
}

impl LatticeModel {
    pub fn new(h: DMatrix<f64>, eri: Tensor4, constant: f64, n_alpha: usize, n_beta: usize) -> Result<Self> {
        let n = h.nrows();
        if h.ncols() != n || eri.dim() != n {
            return Err(BootstrapError::Config(format!(
                "lattice one-body is {}x{} but two-body dimension is {}",
                h.nrows(),
                h.ncols(),
                eri.dim()
            )));
        }
        if n_alpha > n || n_beta > n {
            return Err(BootstrapError::Config(format!(
                "{} alpha / {} beta electrons do not fit on {} sites",
                n_alpha, n_beta, n
            )));
        }
        Ok(LatticeModel {
            h,
            eri,
            constant,
            n_alpha,
            n_beta,
        })
    }

    /// One-band Hubbard chain or ring with nearest-neighbor hopping `-t`
    pub fn hubbard(
        sites: usize,
        hopping: f64,
        interaction: f64,
        periodic: bool,
        n_alpha: usize,
        n_beta: usize,
    ) -> Result<Self> {
        if sites == 0 {
            return Err(BootstrapError::Config("hubbard model needs at least one site".to_string()));
        }
        let mut h = DMatrix::zeros(sites, sites);
        for i in 0..sites - 1 {
            h[(i, i + 1)] = -hopping;
            h[(i + 1, i)] = -hopping;
        }
        if periodic && sites > 2 {
            h[(sites - 1, 0)] = -hopping;
            h[(0, sites - 1)] = -hopping;
        }
        info!(
            "Hubbard model: {} sites, t = {}, U = {}, periodic = {}",
            sites, hopping, interaction, periodic
        );
        Self::new(h, Tensor4::hubbard(sites, interaction), 0.0, n_alpha, n_beta)
    }

    pub fn num_sites(&self) -> usize {
        self.h.nrows()
    }

    pub fn electrons(&self) -> (f64, f64) {
        (self.n_alpha as f64, self.n_beta as f64)
    }

    fn electrons_of(&self, spin: Spin) -> usize {
        match spin {
            Spin::Alpha => self.n_alpha,
            Spin::Beta => self.n_beta,
        }
    }

    /// Ground-state density of the one-body part for one spin
    pub fn noninteracting_density(&self, spin: Spin) -> DMatrix<f64> {
        let n_occ = self.electrons_of(spin);
        let (levels, orbitals) = sorted_symmetric_eigen(self.h.clone());
        if n_occ > 0 && n_occ < levels.len() && levels[n_occ] - levels[n_occ - 1] < DEGENERACY_THRESHOLD {
            warn!(
                "Degenerate Fermi level for {:?} electrons ({:.8} vs {:.8}), bath density is not unique",
                spin,
                levels[n_occ - 1],
                levels[n_occ]
            );
        }
        let occ = orbitals.columns(0, n_occ);
        &occ * occ.transpose()
    }
}
