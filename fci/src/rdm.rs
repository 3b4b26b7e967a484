use crate::tensor::Tensor4;
use crate::Spin;
use nalgebra::DMatrix;

/// Spin-resolved reduced density matrices of one state
///
/// * `one_alpha[(p, q)] = <a†pα aqα>`
/// * `two_aa[(p, q, r, s)] = <a†pα a†rα asα aqα>`
/// * `two_ab[(p, q, r, s)] = <a†pα a†rβ asβ aqα>`
/// * `two_bb[(p, q, r, s)] = <a†pβ a†rβ asβ aqβ>`
#[derive(Debug, Clone)]
pub struct RdmBundle {
    pub one_alpha: DMatrix<f64>,
    pub one_beta: DMatrix<f64>,
    pub two_aa: Tensor4,
    pub two_ab: Tensor4,
    pub two_bb: Tensor4,
}

impl RdmBundle {
    pub fn n_orb(&self) -> usize {
        self.one_alpha.nrows()
    }

    pub fn one_body(&self, spin: Spin) -> &DMatrix<f64> {
        match spin {
            Spin::Alpha => &self.one_alpha,
            Spin::Beta => &self.one_beta,
        }
    }

    pub fn one_body_element(&self, spin: Spin, p: usize, q: usize) -> f64 {
        self.one_body(spin)[(p, q)]
    }

    /// `<a†pσ a†rτ asτ aqσ>` for `spins = [σ, τ]`
    pub fn two_body_element(&self, spins: [Spin; 2], p: usize, q: usize, r: usize, s: usize) -> f64 {
        match spins {
            [Spin::Alpha, Spin::Alpha] => self.two_aa[(p, q, r, s)],
            [Spin::Beta, Spin::Beta] => self.two_bb[(p, q, r, s)],
            [Spin::Alpha, Spin::Beta] => self.two_ab[(p, q, r, s)],
            [Spin::Beta, Spin::Alpha] => self.two_ab[(r, s, p, q)],
        }
    }

    /// Spin-summed one-body element `γα + γβ`
    pub fn total_one_body(&self, p: usize, q: usize) -> f64 {
        self.one_alpha[(p, q)] + self.one_beta[(p, q)]
    }

    /// Spin-summed two-body element over all four spin combinations
    pub fn total_two_body(&self, p: usize, q: usize, r: usize, s: usize) -> f64 {
        self.two_aa[(p, q, r, s)]
            + self.two_bb[(p, q, r, s)]
            + self.two_ab[(p, q, r, s)]
            + self.two_ab[(r, s, p, q)]
    }

    /// Electron count per spin from the one-body traces
    pub fn electrons(&self) -> (f64, f64) {
        (self.one_alpha.trace(), self.one_beta.trace())
    }
}
