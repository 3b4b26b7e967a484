use fci::davidson::sorted_symmetric_eigen;
use nalgebra::DMatrix;
use tracing::{debug, warn};

/// Site-to-embedding rotation of one fragment
///
/// Columns are ordered impurity, bath, core, virtual.
#[derive(Debug, Clone)]
pub struct SchmidtRotation {
    pub rotation: DMatrix<f64>,
    pub n_impurity: usize,
    pub n_bath: usize,
    pub n_core: usize,
}

impl SchmidtRotation {
    pub fn n_active(&self) -> usize {
        self.n_impurity + self.n_bath
    }

    pub fn active(&self) -> DMatrix<f64> {
        self.rotation.columns(0, self.n_active()).into_owned()
    }

    pub fn bath(&self) -> DMatrix<f64> {
        self.rotation.columns(self.n_impurity, self.n_bath).into_owned()
    }

    pub fn core(&self) -> DMatrix<f64> {
        self.rotation.columns(self.n_active(), self.n_core).into_owned()
    }

    fn n_virtual(&self) -> usize {
        self.rotation.ncols() - self.n_active() - self.n_core
    }

    /// Grow the bath to `n_bath` orbitals, taking the virtual orbitals and
    /// then the core orbitals that overlap most with the columns of
    /// `reference`. Core orbitals moved into the bath take their electron
    /// with them.
    pub fn pad_bath(&mut self, n_bath: usize, reference: &DMatrix<f64>) {
        if n_bath <= self.n_bath {
            return;
        }
        let core_start = self.n_active();
        let virt_start = core_start + self.n_core;
        let n_virtual = self.n_virtual();
        let mut missing = n_bath - self.n_bath;

        let virt = self.rotation.columns(virt_start, n_virtual).into_owned();
        let (virt_added, virt_rest) = split_by_overlap(&virt, reference, missing.min(n_virtual));
        missing -= virt_added.ncols();
        let core = self.rotation.columns(core_start, self.n_core).into_owned();
        let (core_added, core_rest) = split_by_overlap(&core, reference, missing.min(self.n_core));
        debug!(
            "padding bath with {} virtual and {} core orbitals",
            virt_added.ncols(),
            core_added.ncols()
        );

        let mut rotation = DMatrix::<f64>::zeros(self.rotation.nrows(), self.rotation.ncols());
        let mut col = 0;
        let kept = self.rotation.columns(0, self.n_active()).into_owned();
        for block in [&kept, &virt_added, &core_added, &core_rest, &virt_rest] {
            rotation.columns_mut(col, block.ncols()).copy_from(block);
            col += block.ncols();
        }
        self.rotation = rotation;
        self.n_bath += virt_added.ncols() + core_added.ncols();
        self.n_core -= core_added.ncols();
    }
}

/// Rotate the orthonormal columns of `space` so the first `k` returned
/// columns carry the largest overlap with `reference`; returns those and the
/// remaining complement.
fn split_by_overlap(space: &DMatrix<f64>, reference: &DMatrix<f64>, k: usize) -> (DMatrix<f64>, DMatrix<f64>) {
    let m = space.ncols();
    if k == 0 {
        return (space.columns(0, 0).into_owned(), space.clone());
    }
    let overlap = space.transpose() * reference;
    let (_, w) = sorted_symmetric_eigen(&overlap * overlap.transpose());
    let picked = space * w.columns(m - k, k);
    let rest = space * w.columns(0, m - k);
    (picked, rest)
}

/// Schmidt decomposition of a one-particle density with respect to the
/// orbitals in `impurity` (kept in the given order).
///
/// Environment natural orbitals with occupation in `(eps, 1 - eps)` become
/// bath orbitals, most entangled first and at most one per impurity orbital.
pub fn schmidt_decompose(density: &DMatrix<f64>, impurity: &[usize], eps: f64) -> SchmidtRotation {
    let n = density.nrows();
    let environment: Vec<usize> = (0..n).filter(|i| !impurity.contains(i)).collect();
    let mut rotation = DMatrix::zeros(n, n);
    for (k, &orb) in impurity.iter().enumerate() {
        rotation[(orb, k)] = 1.0;
    }
    if environment.is_empty() {
        return SchmidtRotation {
            rotation,
            n_impurity: impurity.len(),
            n_bath: 0,
            n_core: 0,
        };
    }

    let env_density = density.select_rows(&environment).select_columns(&environment);
    let (occupations, orbitals) = sorted_symmetric_eigen(env_density);

    let mut bath: Vec<usize> = Vec::new();
    let mut core: Vec<usize> = Vec::new();
    let mut virt: Vec<usize> = Vec::new();
    for (k, &occ) in occupations.iter().enumerate() {
        if occ >= 1.0 - eps {
            core.push(k);
        } else if occ > eps {
            bath.push(k);
        } else {
            virt.push(k);
        }
    }
    bath.sort_by(|&a, &b| (occupations[a] - 0.5).abs().total_cmp(&(occupations[b] - 0.5).abs()));
    if bath.len() > impurity.len() {
        warn!(
            "{} entangled environment orbitals for {} impurity orbitals, keeping the most entangled",
            bath.len(),
            impurity.len()
        );
        for k in bath.split_off(impurity.len()) {
            if occupations[k] > 0.5 {
                core.push(k);
            } else {
                virt.push(k);
            }
        }
    }
    debug!(
        "Schmidt decomposition: {} bath, {} core, {} virtual orbitals",
        bath.len(),
        core.len(),
        virt.len()
    );

    let mut col = impurity.len();
    for &k in bath.iter().chain(&core).chain(&virt) {
        for (row, &site) in environment.iter().enumerate() {
            rotation[(site, col)] = orbitals[(row, k)];
        }
        col += 1;
    }

    SchmidtRotation {
        rotation,
        n_impurity: impurity.len(),
        n_bath: bath.len(),
        n_core: core.len(),
    }
}
