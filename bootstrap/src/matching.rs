//! Fragment topology: which orbitals each fragment owns, which of them count
//! toward the electron number, and which density-matrix elements must agree
//! with a neighbor.

use crate::error::{BootstrapError, Result};
use fci::Spin;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

/// One density-matrix element a fragment must share with a neighbor.
/// Orbitals are global lattice labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchingCondition {
    /// `γσ_pq` with `orbitals = [p, q]`
    OneBody {
        neighbor: usize,
        orbitals: [usize; 2],
        spin: Spin,
    },
    /// `Γστ_pqrs` with `orbitals = [p, q, r, s]`
    TwoBody {
        neighbor: usize,
        orbitals: [usize; 4],
        spins: [Spin; 2],
    },
}

impl MatchingCondition {
    pub fn neighbor(&self) -> usize {
        match self {
            MatchingCondition::OneBody { neighbor, .. } | MatchingCondition::TwoBody { neighbor, .. } => *neighbor,
        }
    }

    pub fn orbitals(&self) -> &[usize] {
        match self {
            MatchingCondition::OneBody { orbitals, .. } => &orbitals[..],
            MatchingCondition::TwoBody { orbitals, .. } => &orbitals[..],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Impurity orbitals in active-space order
    pub orbitals: Vec<usize>,
    /// Orbitals whose occupation counts toward the particle number
    pub centers: Vec<usize>,
    /// Target eigenstate of the fragment solver
    pub state: usize,
    /// Index of the mean-field density that defines the bath
    pub bath_state: usize,
    pub conditions: Vec<MatchingCondition>,
}

impl Fragment {
    /// Active-space position of a global orbital
    pub fn local_index(&self, orbital: usize) -> Option<usize> {
        self.orbitals.iter().position(|&o| o == orbital)
    }
}

/// Read-only matching topology of the whole system
#[derive(Debug, Clone)]
pub struct MatchingModel {
    fragments: Vec<Fragment>,
    offsets: Vec<usize>,
}

impl MatchingModel {
    /// Validate the fragment set. Every problem is reported here, before any
    /// fragment is solved.
    pub fn new(fragments: Vec<Fragment>) -> Result<Self> {
        if fragments.is_empty() {
            return Err(BootstrapError::Config("no fragments defined".to_string()));
        }

        for (i, frag) in fragments.iter().enumerate() {
            if frag.orbitals.is_empty() {
                return Err(BootstrapError::Config(format!("fragment {} has no orbitals", i)));
            }
            let unique: HashSet<_> = frag.orbitals.iter().collect();
            if unique.len() != frag.orbitals.len() {
                return Err(BootstrapError::Config(format!(
                    "fragment {} lists an orbital more than once",
                    i
                )));
            }
            for &c in &frag.centers {
                if frag.local_index(c).is_none() {
                    return Err(BootstrapError::UnknownOrbital { fragment: i, orbital: c });
                }
            }
            for cond in &frag.conditions {
                let n = cond.neighbor();
                let neighbor = fragments.get(n).ok_or(BootstrapError::UnknownFragment(n))?;
                if n == i {
                    return Err(BootstrapError::Config(format!(
                        "fragment {} has a matching condition referencing itself",
                        i
                    )));
                }
                for &o in cond.orbitals() {
                    if frag.local_index(o).is_none() {
                        return Err(BootstrapError::UnknownOrbital { fragment: i, orbital: o });
                    }
                    if neighbor.local_index(o).is_none() {
                        return Err(BootstrapError::UnknownOrbital { fragment: n, orbital: o });
                    }
                }
            }
        }

        let mut offsets = Vec::with_capacity(fragments.len() + 1);
        offsets.push(0);
        for frag in &fragments {
            let last = offsets[offsets.len() - 1];
            offsets.push(last + frag.conditions.len());
        }

        Ok(MatchingModel { fragments, offsets })
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn num_fragments(&self) -> usize {
        self.fragments.len()
    }

    pub fn fragment(&self, index: usize) -> Result<&Fragment> {
        self.fragments.get(index).ok_or(BootstrapError::UnknownFragment(index))
    }

    /// Total number of matching conditions across all fragments
    pub fn num_conditions(&self) -> usize {
        self.offsets[self.fragments.len()]
    }

    /// Positions of a fragment's conditions in the flattened potential vector
    pub fn condition_range(&self, index: usize) -> Range<usize> {
        self.offsets[index]..self.offsets[index + 1]
    }

    pub fn local_index(&self, fragment: usize, orbital: usize) -> Result<usize> {
        self.fragment(fragment)?
            .local_index(orbital)
            .ok_or(BootstrapError::UnknownOrbital { fragment, orbital })
    }
}
