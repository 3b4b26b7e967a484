//! Occupation-number strings and second-quantized operators acting on them
//!
//! A determinant is a pair `(alpha, beta)` of 64-bit strings; bit `p` set
//! means spin orbital `p` is occupied. Operator signs follow the convention
//! that all alpha creators precede all beta creators, so number-conserving
//! operators on one spin never pick up a sign from the other spin.

use crate::error::{FciError, Result};
use crate::Spin;
use itertools::Itertools;
use std::collections::HashMap;

/// All strings with a fixed number of electrons in a fixed number of orbitals
#[derive(Debug, Clone)]
pub struct StringSpace {
    n_orb: usize,
    n_elec: usize,
    strings: Vec<u64>,
    index: HashMap<u64, usize>,
}

impl StringSpace {
    pub fn new(n_orb: usize, n_elec: usize) -> Result<Self> {
        if n_orb > 64 {
            return Err(FciError::TooManyOrbitals(n_orb));
        }
        if n_elec > n_orb {
            return Err(FciError::TooManyElectrons {
                electrons: n_elec,
                orbitals: n_orb,
            });
        }

        let strings: Vec<u64> = (0..n_orb)
            .combinations(n_elec)
            .map(|occ| occ.iter().fold(0u64, |s, &p| s | (1u64 << p)))
            .collect();
        let index = strings.iter().enumerate().map(|(i, &s)| (s, i)).collect();

        Ok(StringSpace {
            n_orb,
            n_elec,
            strings,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn n_orb(&self) -> usize {
        self.n_orb
    }

    pub fn n_elec(&self) -> usize {
        self.n_elec
    }

    pub fn string(&self, i: usize) -> u64 {
        self.strings[i]
    }

    pub fn position(&self, s: u64) -> Option<usize> {
        self.index.get(&s).copied()
    }
}

#[inline]
pub fn occupied(s: u64, p: usize) -> bool {
    s & (1u64 << p) != 0
}

#[inline]
fn parity_below(s: u64, p: usize) -> f64 {
    let below = s & ((1u64 << p) - 1);
    if below.count_ones() % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// `a_p |s>`, or `None` if orbital `p` is empty
pub fn annihilate(s: u64, p: usize) -> Option<(u64, f64)> {
    if !occupied(s, p) {
        return None;
    }
    Some((s ^ (1u64 << p), parity_below(s, p)))
}

/// `a†_p |s>`, or `None` if orbital `p` is already filled
pub fn create(s: u64, p: usize) -> Option<(u64, f64)> {
    if occupied(s, p) {
        return None;
    }
    Some((s | (1u64 << p), parity_below(s, p)))
}

/// `a†_p a_q |s>`
pub fn excite(s: u64, p: usize, q: usize) -> Option<(u64, f64)> {
    let (t, s1) = annihilate(s, q)?;
    let (u, s2) = create(t, p)?;
    Some((u, s1 * s2))
}

/// `a†_p a†_r a_s a_q |str>` within one spin channel
pub fn double_excite(string: u64, p: usize, q: usize, r: usize, s: usize) -> Option<(u64, f64)> {
    let (t1, s1) = annihilate(string, q)?;
    let (t2, s2) = annihilate(t1, s)?;
    let (t3, s3) = create(t2, r)?;
    let (t4, s4) = create(t3, p)?;
    Some((t4, s1 * s2 * s3 * s4))
}

/// Number-conserving excitation operator on a determinant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Excitation {
    /// `a†_pσ a_qσ`
    One { spin: Spin, p: usize, q: usize },
    /// `a†_pσ a†_rτ a_sτ a_qσ` with `spins = [σ, τ]`
    Two {
        spins: [Spin; 2],
        p: usize,
        q: usize,
        r: usize,
        s: usize,
    },
}

impl Excitation {
    /// Apply to `|alpha, beta>`; returns the target strings and the phase
    pub fn apply(&self, alpha: u64, beta: u64) -> Option<(u64, u64, f64)> {
        match *self {
            Excitation::One { spin: Spin::Alpha, p, q } => {
                let (a, sign) = excite(alpha, p, q)?;
                Some((a, beta, sign))
            }
            Excitation::One { spin: Spin::Beta, p, q } => {
                let (b, sign) = excite(beta, p, q)?;
                Some((alpha, b, sign))
            }
            Excitation::Two {
                spins: [Spin::Alpha, Spin::Alpha],
                p,
                q,
                r,
                s,
            } => {
                let (a, sign) = double_excite(alpha, p, q, r, s)?;
                Some((a, beta, sign))
            }
            Excitation::Two {
                spins: [Spin::Beta, Spin::Beta],
                p,
                q,
                r,
                s,
            } => {
                let (b, sign) = double_excite(beta, p, q, r, s)?;
                Some((alpha, b, sign))
            }
            // a†pα a†rβ a_sβ a_qα = E^α_pq E^β_rs
            Excitation::Two {
                spins: [Spin::Alpha, Spin::Beta],
                p,
                q,
                r,
                s,
            } => {
                let (b, s1) = excite(beta, r, s)?;
                let (a, s2) = excite(alpha, p, q)?;
                Some((a, b, s1 * s2))
            }
            Excitation::Two {
                spins: [Spin::Beta, Spin::Alpha],
                p,
                q,
                r,
                s,
            } => {
                let (a, s1) = excite(alpha, r, s)?;
                let (b, s2) = excite(beta, p, q)?;
                Some((a, b, s1 * s2))
            }
        }
    }

    pub fn max_orbital(&self) -> usize {
        match *self {
            Excitation::One { p, q, .. } => p.max(q),
            Excitation::Two { p, q, r, s, .. } => p.max(q).max(r).max(s),
        }
    }
}
