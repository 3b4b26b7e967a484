//! Fragment solvers with closed-form RDMs for exercising the engine

use crate::matching::{Fragment, MatchingCondition, MatchingModel};
use crate::solver_impl::FragmentSolver;
use fci::{FciError, PotentialTerm, RdmBundle, Spin, Tensor4};
use nalgebra::{DMatrix, DVector};

/// Occupations respond linearly to diagonal one-body potentials:
/// `n_k = base_k - chi * v_k - leak * Σ_{j≠k} v_j`, per spin.
/// Off-diagonal densities vanish and two-body densities factorize.
#[derive(Debug, Clone)]
pub struct LinearStub {
    base: Vec<f64>,
    chi: f64,
    leak: f64,
    terms: Vec<PotentialTerm>,
    rdm: Option<RdmBundle>,
}

impl LinearStub {
    pub fn new(base: Vec<f64>, chi: f64, leak: f64) -> Self {
        LinearStub {
            base,
            chi,
            leak,
            terms: Vec::new(),
            rdm: None,
        }
    }

    fn diagonal_potential(&self, spin: Spin) -> Vec<f64> {
        let mut v = vec![0.0; self.base.len()];
        for term in &self.terms {
            if let PotentialTerm::OneBody { p, q, spin: s, value } = *term {
                if p == q && s == spin {
                    v[p] += value;
                }
            }
        }
        v
    }

    fn occupations(&self, spin: Spin) -> Vec<f64> {
        let v = self.diagonal_potential(spin);
        let total: f64 = v.iter().sum();
        self.base
            .iter()
            .zip(&v)
            .map(|(b, vk)| b - self.chi * vk - self.leak * (total - vk))
            .collect()
    }
}

impl FragmentSolver for LinearStub {
    fn add_potential_term(&mut self, term: PotentialTerm) -> Result<(), FciError> {
        if term.max_orbital() >= self.base.len() {
            return Err(FciError::OrbitalOutOfRange {
                index: term.max_orbital(),
                orbitals: self.base.len(),
            });
        }
        self.terms.push(term);
        self.rdm = None;
        Ok(())
    }

    fn solve(&mut self) -> Result<(), FciError> {
        let n = self.base.len();
        let na = self.occupations(Spin::Alpha);
        let nb = self.occupations(Spin::Beta);
        let mut two_aa = Tensor4::zeros(n);
        let mut two_ab = Tensor4::zeros(n);
        let mut two_bb = Tensor4::zeros(n);
        for p in 0..n {
            for r in 0..n {
                two_ab[(p, p, r, r)] = na[p] * nb[r];
                if p != r {
                    two_aa[(p, p, r, r)] = na[p] * na[r];
                    two_bb[(p, p, r, r)] = nb[p] * nb[r];
                }
            }
        }
        self.rdm = Some(RdmBundle {
            one_alpha: DMatrix::from_diagonal(&DVector::from_vec(na)),
            one_beta: DMatrix::from_diagonal(&DVector::from_vec(nb)),
            two_aa,
            two_ab,
            two_bb,
        });
        Ok(())
    }

    fn rdm(&self, state: usize) -> Result<RdmBundle, FciError> {
        if state != 0 {
            return Err(FciError::StateOutOfRange { state, available: 1 });
        }
        self.rdm.clone().ok_or(FciError::NotSolved)
    }

    fn energy(&self, state: usize) -> Result<f64, FciError> {
        let rdm = self.rdm(state)?;
        let mut e = 0.0;
        for spin in Spin::BOTH {
            let v = self.diagonal_potential(spin);
            e += v.iter().enumerate().map(|(k, vk)| vk * rdm.one_body(spin)[(k, k)]).sum::<f64>();
        }
        Ok(e)
    }

    fn partitioned_energy(&self, rdm: &RdmBundle, centers: &[usize]) -> f64 {
        -centers.iter().map(|&c| rdm.total_one_body(c, c)).sum::<f64>()
    }
}

/// Ring of `n` sites with fragments `[x-1, x, x+1]` centered on `x`; each edge
/// is matched against the neighboring fragment's center.
pub fn ring_model(n: usize) -> MatchingModel {
    let fragments = (0..n)
        .map(|x| {
            let left = (x + n - 1) % n;
            let right = (x + 1) % n;
            Fragment {
                orbitals: vec![left, x, right],
                centers: vec![x],
                state: 0,
                bath_state: 0,
                conditions: vec![
                    MatchingCondition::OneBody {
                        neighbor: left,
                        orbitals: [left, left],
                        spin: Spin::Alpha,
                    },
                    MatchingCondition::OneBody {
                        neighbor: right,
                        orbitals: [right, right],
                        spin: Spin::Alpha,
                    },
                ],
            }
        })
        .collect();
    match MatchingModel::new(fragments) {
        Ok(model) => model,
        Err(e) => panic!("invalid ring model: {}", e),
    }
}
