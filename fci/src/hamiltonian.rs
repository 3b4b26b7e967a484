//! Active-space Hamiltonians and the potential terms added on top of them

use crate::determinant::Excitation;
use crate::error::{FciError, Result};
use crate::rdm::RdmBundle;
use crate::tensor::Tensor4;
use crate::Spin;
use nalgebra::DMatrix;

const INTEGRAL_THRESHOLD: f64 = 1e-14;

/// Embedded Hamiltonian of one fragment
///
/// `h_alpha`/`h_beta` are the effective one-body operators (bare one-body
/// plus frozen-core mean field). The bare parts are kept separately because
/// the democratic energy partition averages bare and effective one-body
/// contributions.
#[derive(Debug, Clone)]
pub struct ActiveSpaceHamiltonian {
    pub n_orb: usize,
    pub n_alpha: usize,
    pub n_beta: usize,
    pub core_energy: f64,
    pub h_alpha: DMatrix<f64>,
    pub h_beta: DMatrix<f64>,
    pub h_bare_alpha: DMatrix<f64>,
    pub h_bare_beta: DMatrix<f64>,
    pub eri_aa: Tensor4,
    pub eri_ab: Tensor4,
    pub eri_bb: Tensor4,
}

impl ActiveSpaceHamiltonian {
    /// Spin-restricted Hamiltonian: the same one-body matrix and integrals for
    /// every spin channel, with no frozen-core correction.
    pub fn restricted(
        core_energy: f64,
        h: DMatrix<f64>,
        eri: Tensor4,
        n_alpha: usize,
        n_beta: usize,
    ) -> Result<Self> {
        let n_orb = h.nrows();
        if h.ncols() != n_orb || eri.dim() != n_orb {
            return Err(FciError::DimensionMismatch(format!(
                "one-body {}x{}, two-body dimension {}",
                h.nrows(),
                h.ncols(),
                eri.dim()
            )));
        }
        Ok(ActiveSpaceHamiltonian {
            n_orb,
            n_alpha,
            n_beta,
            core_energy,
            h_alpha: h.clone(),
            h_beta: h.clone(),
            h_bare_alpha: h.clone(),
            h_bare_beta: h,
            eri_aa: eri.clone(),
            eri_ab: eri.clone(),
            eri_bb: eri,
        })
    }

    /// Spin-unrestricted Hamiltonian. `eri_ab` carries alpha orbitals on the
    /// first index pair and beta orbitals on the second.
    #[allow(clippy::too_many_arguments)]
    pub fn unrestricted(
        core_energy: f64,
        h_alpha: DMatrix<f64>,
        h_beta: DMatrix<f64>,
        eri_aa: Tensor4,
        eri_ab: Tensor4,
        eri_bb: Tensor4,
        n_alpha: usize,
        n_beta: usize,
    ) -> Result<Self> {
        let n_orb = h_alpha.nrows();
        let square = |h: &DMatrix<f64>| h.nrows() == n_orb && h.ncols() == n_orb;
        if !square(&h_alpha) || !square(&h_beta) {
            return Err(FciError::DimensionMismatch(format!(
                "one-body alpha {}x{}, beta {}x{}",
                h_alpha.nrows(),
                h_alpha.ncols(),
                h_beta.nrows(),
                h_beta.ncols()
            )));
        }
        if [&eri_aa, &eri_ab, &eri_bb].iter().any(|t| t.dim() != n_orb) {
            return Err(FciError::DimensionMismatch(format!(
                "two-body dimensions {}/{}/{} for {} orbitals",
                eri_aa.dim(),
                eri_ab.dim(),
                eri_bb.dim(),
                n_orb
            )));
        }
        Ok(ActiveSpaceHamiltonian {
            n_orb,
            n_alpha,
            n_beta,
            core_energy,
            h_bare_alpha: h_alpha.clone(),
            h_bare_beta: h_beta.clone(),
            h_alpha,
            h_beta,
            eri_aa,
            eri_ab,
            eri_bb,
        })
    }

    /// Replace the bare one-body matrices used by the energy partition
    pub fn with_bare_one_body(mut self, h_alpha: DMatrix<f64>, h_beta: DMatrix<f64>) -> Self {
        self.h_bare_alpha = h_alpha;
        self.h_bare_beta = h_beta;
        self
    }

    pub fn one_body(&self, spin: Spin) -> &DMatrix<f64> {
        match spin {
            Spin::Alpha => &self.h_alpha,
            Spin::Beta => &self.h_beta,
        }
    }

    fn bare_one_body(&self, spin: Spin) -> &DMatrix<f64> {
        match spin {
            Spin::Alpha => &self.h_bare_alpha,
            Spin::Beta => &self.h_bare_beta,
        }
    }

    /// Second-quantized terms of the electronic Hamiltonian (core energy excluded)
    pub(crate) fn excitations(&self) -> Vec<(Excitation, f64)> {
        let n = self.n_orb;
        let mut terms = Vec::new();

        for spin in Spin::BOTH {
            let h = self.one_body(spin);
            for p in 0..n {
                for q in 0..n {
                    if h[(p, q)].abs() > INTEGRAL_THRESHOLD {
                        terms.push((Excitation::One { spin, p, q }, h[(p, q)]));
                    }
                }
            }
        }

        let channels = [
            ([Spin::Alpha, Spin::Alpha], &self.eri_aa, 0.5),
            ([Spin::Alpha, Spin::Beta], &self.eri_ab, 1.0),
            ([Spin::Beta, Spin::Beta], &self.eri_bb, 0.5),
        ];
        for (spins, eri, factor) in channels {
            for ((p, q, r, s), v) in eri.nonzero(INTEGRAL_THRESHOLD) {
                terms.push((Excitation::Two { spins, p, q, r, s }, factor * v));
            }
        }
        terms
    }

    /// Expectation value of the Hamiltonian from a set of RDMs
    pub fn expectation(&self, rdm: &RdmBundle) -> f64 {
        let n = self.n_orb;
        let mut e = self.core_energy;
        for spin in Spin::BOTH {
            let h = self.one_body(spin);
            let g = rdm.one_body(spin);
            e += h.component_mul(g).sum();
        }
        for p in 0..n {
            for q in 0..n {
                for r in 0..n {
                    for s in 0..n {
                        e += 0.5 * self.eri_aa[(p, q, r, s)] * rdm.two_aa[(p, q, r, s)];
                        e += 0.5 * self.eri_bb[(p, q, r, s)] * rdm.two_bb[(p, q, r, s)];
                        e += self.eri_ab[(p, q, r, s)] * rdm.two_ab[(p, q, r, s)];
                    }
                }
            }
        }
        e
    }

    /// Democratically partitioned energy of the orbitals in `centers`.
    ///
    /// Each one-body element contributes through its first index, each
    /// same-spin two-body element through `p`, and each opposite-spin element
    /// half through `p` and half through `r`. Summing over every active
    /// orbital reproduces the electronic energy without the core constant.
    pub fn partitioned_energy(&self, rdm: &RdmBundle, centers: &[usize]) -> f64 {
        let n = self.n_orb;
        let mut e = 0.0;
        for spin in Spin::BOTH {
            let h = self.one_body(spin);
            let hb = self.bare_one_body(spin);
            let g = rdm.one_body(spin);
            for &p in centers {
                for q in 0..n {
                    e += 0.5 * g[(p, q)] * (h[(p, q)] + hb[(p, q)]);
                }
            }
        }
        for &c in centers {
            for i in 0..n {
                for j in 0..n {
                    for k in 0..n {
                        e += 0.5 * self.eri_aa[(c, i, j, k)] * rdm.two_aa[(c, i, j, k)];
                        e += 0.5 * self.eri_bb[(c, i, j, k)] * rdm.two_bb[(c, i, j, k)];
                        e += 0.5 * self.eri_ab[(c, i, j, k)] * rdm.two_ab[(c, i, j, k)];
                        e += 0.5 * self.eri_ab[(i, j, c, k)] * rdm.two_ab[(i, j, c, k)];
                    }
                }
            }
        }
        e
    }
}

/// A potential added to a fragment Hamiltonian
///
/// Non-Hermitian operators are symmetrized, `value * (O + O†) / 2`, so the
/// resulting Hamiltonian stays real symmetric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PotentialTerm {
    /// `value * a†_p a_q`
    OneBody {
        p: usize,
        q: usize,
        spin: Spin,
        value: f64,
    },
    /// `value * a†_pσ a†_rτ a_sτ a_qσ`
    TwoBody {
        p: usize,
        q: usize,
        r: usize,
        s: usize,
        spins: [Spin; 2],
        value: f64,
    },
}

impl PotentialTerm {
    pub(crate) fn excitations(&self) -> Vec<(Excitation, f64)> {
        match *self {
            PotentialTerm::OneBody { p, q, spin, value } => {
                if p == q {
                    vec![(Excitation::One { spin, p, q }, value)]
                } else {
                    vec![
                        (Excitation::One { spin, p, q }, 0.5 * value),
                        (Excitation::One { spin, p: q, q: p }, 0.5 * value),
                    ]
                }
            }
            PotentialTerm::TwoBody {
                p,
                q,
                r,
                s,
                spins,
                value,
            } => {
                if p == q && r == s {
                    vec![(Excitation::Two { spins, p, q, r, s }, value)]
                } else {
                    vec![
                        (Excitation::Two { spins, p, q, r, s }, 0.5 * value),
                        (
                            Excitation::Two {
                                spins,
                                p: q,
                                q: p,
                                r: s,
                                s: r,
                            },
                            0.5 * value,
                        ),
                    ]
                }
            }
        }
    }

    pub fn max_orbital(&self) -> usize {
        match *self {
            PotentialTerm::OneBody { p, q, .. } => p.max(q),
            PotentialTerm::TwoBody { p, q, r, s, .. } => p.max(q).max(r).max(s),
        }
    }
}
