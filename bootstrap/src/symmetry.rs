//! Resolution of the matching model into the problem the engine solves
//!
//! `SymmetryReducer::identity` keeps every fragment. `SymmetryReducer::reduce`
//! collapses a set of translationally equivalent fragments onto a single
//! representative whose own density matrix supplies the reference values,
//! with residuals and energies scaled by the fragment multiplicity. The rest
//! of the engine only sees the resulting `EmbeddingProblem`.

use crate::error::{BootstrapError, Result};
use crate::matching::{MatchingCondition, MatchingModel};
use crate::potential::PotentialVector;
use fci::Spin;
use std::collections::HashMap;
use std::ops::Range;
use tracing::info;

/// Maps `(fragment, orbital)` to the equivalent orbital of the representative
#[derive(Debug, Clone, Default)]
pub struct OrbitalAnalog {
    representative: usize,
    map: HashMap<(usize, usize), usize>,
}

impl OrbitalAnalog {
    /// Orbital `k` of every fragment is the analog of orbital `k` of the
    /// representative.
    pub fn positional(model: &MatchingModel, representative: usize) -> Result<Self> {
        let rep = model.fragment(representative)?;
        let mut map = HashMap::new();
        for (f, frag) in model.fragments().iter().enumerate() {
            if frag.orbitals.len() != rep.orbitals.len() {
                return Err(BootstrapError::NotEquivalent(format!(
                    "fragment {} has {} orbitals, representative {} has {}",
                    f,
                    frag.orbitals.len(),
                    representative,
                    rep.orbitals.len()
                )));
            }
            for (k, &o) in frag.orbitals.iter().enumerate() {
                map.insert((f, o), rep.orbitals[k]);
            }
        }
        Ok(OrbitalAnalog { representative, map })
    }

    pub fn from_pairs(representative: usize, pairs: impl IntoIterator<Item = ((usize, usize), usize)>) -> Self {
        OrbitalAnalog {
            representative,
            map: pairs.into_iter().collect(),
        }
    }

    pub fn representative(&self) -> usize {
        self.representative
    }

    pub fn get(&self, fragment: usize, orbital: usize) -> Result<usize> {
        self.map
            .get(&(fragment, orbital))
            .copied()
            .ok_or(BootstrapError::UnknownOrbital { fragment, orbital })
    }
}

/// Condition in active-space positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedKind {
    OneBody {
        spin: Spin,
        own: [usize; 2],
        reference: [usize; 2],
    },
    TwoBody {
        spins: [Spin; 2],
        own: [usize; 4],
        reference: [usize; 4],
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCondition {
    /// Slot whose density matrix provides the reference value
    pub reference_slot: usize,
    pub kind: ResolvedKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProblemFragment {
    /// Index of the fragment in the full model
    pub source: usize,
    pub n_impurity: usize,
    /// Active-space positions of the center orbitals
    pub centers: Vec<usize>,
    pub state: usize,
    pub conditions: Vec<ResolvedCondition>,
}

impl ProblemFragment {
    pub fn impurity(&self) -> Range<usize> {
        0..self.n_impurity
    }
}

/// Fragments the engine actually solves, one per slot
#[derive(Debug, Clone)]
pub struct EmbeddingProblem {
    fragments: Vec<ProblemFragment>,
    offsets: Vec<usize>,
    multiplicity: usize,
    full_density: bool,
    full_fragments: usize,
}

impl EmbeddingProblem {
    fn new(fragments: Vec<ProblemFragment>, multiplicity: usize, full_density: bool, full_fragments: usize) -> Self {
        let mut offsets = vec![0];
        for frag in &fragments {
            let last = offsets[offsets.len() - 1];
            offsets.push(last + frag.conditions.len());
        }
        EmbeddingProblem {
            fragments,
            offsets,
            multiplicity,
            full_density,
            full_fragments,
        }
    }

    pub fn fragments(&self) -> &[ProblemFragment] {
        &self.fragments
    }

    pub fn fragment(&self, slot: usize) -> &ProblemFragment {
        &self.fragments[slot]
    }

    pub fn num_slots(&self) -> usize {
        self.fragments.len()
    }

    pub fn num_conditions(&self) -> usize {
        self.offsets[self.fragments.len()]
    }

    pub fn condition_range(&self, slot: usize) -> Range<usize> {
        self.offsets[slot]..self.offsets[slot + 1]
    }

    /// Slot owning the condition at `index` of the flattened vector
    pub fn slot_of(&self, index: usize) -> usize {
        self.offsets.partition_point(|&o| o <= index) - 1
    }

    /// How many physical fragments each slot stands for
    pub fn multiplicity(&self) -> usize {
        self.multiplicity
    }

    /// Whether residuals match spin-summed densities
    pub fn full_density(&self) -> bool {
        self.full_density
    }

    pub fn is_reduced(&self) -> bool {
        self.fragments.len() < self.full_fragments
    }

    /// Potentials for every fragment of the full model
    pub fn expand(&self, x: &PotentialVector) -> PotentialVector {
        if self.is_reduced() {
            x.tiled(self.multiplicity)
        } else {
            x.clone()
        }
    }
}

pub struct SymmetryReducer;

impl SymmetryReducer {
    /// Every fragment solved in its own slot
    pub fn identity(model: &MatchingModel, full_density: bool) -> Result<EmbeddingProblem> {
        let mut fragments = Vec::with_capacity(model.num_fragments());
        for (f, frag) in model.fragments().iter().enumerate() {
            let mut conditions = Vec::with_capacity(frag.conditions.len());
            for cond in &frag.conditions {
                let neighbor = cond.neighbor();
                let own = resolve(model, f, cond.orbitals(), |o| Ok(o))?;
                let reference = resolve(model, neighbor, cond.orbitals(), |o| Ok(o))?;
                conditions.push(ResolvedCondition {
                    reference_slot: neighbor,
                    kind: resolved_kind(cond, &own, &reference),
                });
            }
            fragments.push(ProblemFragment {
                source: f,
                n_impurity: frag.orbitals.len(),
                centers: resolve(model, f, &frag.centers, |o| Ok(o))?,
                state: frag.state,
                conditions,
            });
        }
        Ok(EmbeddingProblem::new(fragments, 1, full_density, model.num_fragments()))
    }

    /// Collapse translationally equivalent fragments onto the representative.
    ///
    /// Fails unless every fragment has the representative's size, target
    /// state, center positions and condition pattern.
    pub fn reduce(model: &MatchingModel, analog: &OrbitalAnalog, full_density: bool) -> Result<EmbeddingProblem> {
        let r = analog.representative();
        let rep = model.fragment(r)?;
        let pattern = |f: usize| -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
            model
                .fragment(f)?
                .conditions
                .iter()
                .map(|c| {
                    Ok((
                        resolve(model, f, c.orbitals(), Ok)?,
                        resolve(model, c.neighbor(), c.orbitals(), Ok)?,
                    ))
                })
                .collect()
        };
        let rep_pattern = pattern(r)?;
        let rep_centers = resolve(model, r, &rep.centers, Ok)?;

        for (f, frag) in model.fragments().iter().enumerate() {
            let mismatch = |what: &str| {
                BootstrapError::NotEquivalent(format!("fragment {} differs from fragment {} in {}", f, r, what))
            };
            if frag.orbitals.len() != rep.orbitals.len() {
                return Err(mismatch("size"));
            }
            if frag.state != rep.state || frag.bath_state != rep.bath_state {
                return Err(mismatch("target state"));
            }
            if resolve(model, f, &frag.centers, Ok)? != rep_centers {
                return Err(mismatch("center orbitals"));
            }
            let kinds_match = frag.conditions.len() == rep.conditions.len()
                && frag.conditions.iter().zip(&rep.conditions).all(|(a, b)| same_kind(a, b));
            if !kinds_match || pattern(f)? != rep_pattern {
                return Err(mismatch("matching conditions"));
            }
        }

        let mut conditions = Vec::with_capacity(rep.conditions.len());
        for cond in &rep.conditions {
            let neighbor = cond.neighbor();
            let own = resolve(model, r, cond.orbitals(), Ok)?;
            let reference = resolve(model, r, cond.orbitals(), |o| analog.get(neighbor, o))?;
            conditions.push(ResolvedCondition {
                reference_slot: 0,
                kind: resolved_kind(cond, &own, &reference),
            });
        }

        let multiplicity = model.num_fragments();
        info!(
            "Translational symmetry: {} fragments reduced to representative {} (multiplicity {})",
            multiplicity, r, multiplicity
        );

        let fragment = ProblemFragment {
            source: r,
            n_impurity: rep.orbitals.len(),
            centers: rep_centers,
            state: rep.state,
            conditions,
        };
        Ok(EmbeddingProblem::new(vec![fragment], multiplicity, full_density, multiplicity))
    }
}

/// Positions in `fragment` of `orbitals`, each first mapped through `relabel`
fn resolve<F>(model: &MatchingModel, fragment: usize, orbitals: &[usize], relabel: F) -> Result<Vec<usize>>
where
    F: Fn(usize) -> Result<usize>,
{
    orbitals
        .iter()
        .map(|&o| model.local_index(fragment, relabel(o)?))
        .collect()
}

fn same_kind(a: &MatchingCondition, b: &MatchingCondition) -> bool {
    match (a, b) {
        (MatchingCondition::OneBody { spin: s1, .. }, MatchingCondition::OneBody { spin: s2, .. }) => s1 == s2,
        (MatchingCondition::TwoBody { spins: s1, .. }, MatchingCondition::TwoBody { spins: s2, .. }) => s1 == s2,
        _ => false,
    }
}

fn resolved_kind(cond: &MatchingCondition, own: &[usize], reference: &[usize]) -> ResolvedKind {
    match cond {
        MatchingCondition::OneBody { spin, .. } => ResolvedKind::OneBody {
            spin: *spin,
            own: [own[0], own[1]],
            reference: [reference[0], reference[1]],
        },
        MatchingCondition::TwoBody { spins, .. } => ResolvedKind::TwoBody {
            spins: *spins,
            own: [own[0], own[1], own[2], own[3]],
            reference: [reference[0], reference[1], reference[2], reference[3]],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::Fragment;

    fn ring(n: usize) -> MatchingModel {
        let frags = (0..n)
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
        MatchingModel::new(frags).unwrap()
    }

    #[test]
    fn test_identity_resolution() {
        let model = ring(4);
        let problem = SymmetryReducer::identity(&model, false).unwrap();
        assert_eq!(problem.num_slots(), 4);
        assert_eq!(problem.num_conditions(), 8);
        assert_eq!(problem.multiplicity(), 1);
        assert_eq!(problem.slot_of(0), 0);
        assert_eq!(problem.slot_of(5), 2);
        assert_eq!(problem.slot_of(7), 3);

        let frag = problem.fragment(2);
        assert_eq!(frag.centers, vec![1]);
        assert_eq!(
            frag.conditions[0],
            ResolvedCondition {
                reference_slot: 1,
                kind: ResolvedKind::OneBody {
                    spin: Spin::Alpha,
                    own: [0, 0],
                    reference: [1, 1],
                },
            }
        );
    }

    #[test]
    fn test_reduction_to_representative() {
        let model = ring(6);
        let analog = OrbitalAnalog::positional(&model, 0).unwrap();
        let problem = SymmetryReducer::reduce(&model, &analog, false).unwrap();
        assert_eq!(problem.num_slots(), 1);
        assert_eq!(problem.multiplicity(), 6);
        assert!(problem.is_reduced());

        // left edge matched against the neighbor's center, seen at position 1
        let cond = problem.fragment(0).conditions[0];
        assert_eq!(cond.reference_slot, 0);
        assert_eq!(
            cond.kind,
            ResolvedKind::OneBody {
                spin: Spin::Alpha,
                own: [0, 0],
                reference: [1, 1],
            }
        );

        let x = PotentialVector::from_values(nalgebra::DVector::from_vec(vec![0.1, 0.2]));
        assert_eq!(problem.expand(&x).len(), 12);
    }

    #[test]
    fn test_reduction_rejects_inequivalent_fragments() {
        let mut frags = ring(4).fragments().to_vec();
        frags[3].centers = vec![2];
        let model = MatchingModel::new(frags).unwrap();
        let analog = OrbitalAnalog::positional(&model, 0).unwrap();
        assert!(matches!(
            SymmetryReducer::reduce(&model, &analog, false),
            Err(BootstrapError::NotEquivalent(_))
        ));
    }
}
