use super::Trial;
use crate::cost::{rms, CostFunctions};
use crate::error::{BootstrapError, Result};
use crate::potential::{ChemicalPotential, PotentialVector};
use crate::solver_impl::FragmentSolver;
use nalgebra::DVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const SCAN_FACTORS: [f64; 4] = [2.0, 1.0, 0.1, 0.01];
const QUADRATIC_PROBES: [f64; 3] = [0.5, 1.0, 1.5];
const QUADRATIC_BOUNDS: (f64, f64) = (0.01, 2.0);

/// Damping of the Newton step `x + a * dx`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSearch {
    /// Always take the full step
    None,
    /// Best of a fixed set of factors
    Scan,
    /// Parabola through three probes, minimized within bounds
    Quadratic,
}

impl FromStr for LineSearch {
    type Err = BootstrapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "scan" => Ok(Self::Scan),
            "quadratic" => Ok(Self::Quadratic),
            _ => Err(BootstrapError::Config(format!("unknown line search: {}", s))),
        }
    }
}

impl fmt::Display for LineSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LineSearch::None => "none",
            LineSearch::Scan => "scan",
            LineSearch::Quadratic => "quadratic",
        };
        write!(f, "{}", name)
    }
}

impl LineSearch {
    pub(crate) fn search<S: FragmentSolver>(
        &self,
        cost: &CostFunctions<'_, S>,
        x: &PotentialVector,
        dx: &DVector<f64>,
        mu: ChemicalPotential,
    ) -> Result<Trial> {
        match self {
            LineSearch::None => evaluate(cost, x, dx, mu, 1.0),
            LineSearch::Scan => best(evaluate_all(cost, x, dx, mu, &SCAN_FACTORS)?),
            LineSearch::Quadratic => {
                let mut trials = evaluate_all(cost, x, dx, mu, &QUADRATIC_PROBES)?;
                let h = QUADRATIC_PROBES[1] - QUADRATIC_PROBES[0];
                let (r0, r1, r2) = (trials[0].rms, trials[1].rms, trials[2].rms);
                let curvature = r2 - 2.0 * r1 + r0;
                if curvature > 0.0 {
                    let a = QUADRATIC_PROBES[1] - h * (r2 - r0) / (2.0 * curvature);
                    let a = a.clamp(QUADRATIC_BOUNDS.0, QUADRATIC_BOUNDS.1);
                    debug!("quadratic line search minimum at {:.4}", a);
                    trials.push(evaluate(cost, x, dx, mu, a)?);
                }
                best(trials)
            }
        }
    }
}

fn evaluate<S: FragmentSolver>(
    cost: &CostFunctions<'_, S>,
    x: &PotentialVector,
    dx: &DVector<f64>,
    mu: ChemicalPotential,
    factor: f64,
) -> Result<Trial> {
    let potentials = x.stepped(dx, factor);
    let rdms = cost.solve_fragments(&potentials, mu)?;
    let rms = rms(&cost.residual_vector(&rdms));
    debug!("line search factor {:.4}: rms {:.6e}", factor, rms);
    Ok(Trial {
        factor,
        potentials,
        rdms,
        rms,
    })
}

fn evaluate_all<S: FragmentSolver>(
    cost: &CostFunctions<'_, S>,
    x: &PotentialVector,
    dx: &DVector<f64>,
    mu: ChemicalPotential,
    factors: &[f64],
) -> Result<Vec<Trial>> {
    factors
        .par_iter()
        .map(|&a| evaluate(cost, x, dx, mu, a))
        .collect()
}

/// Lowest residual wins; ties keep the earlier trial
fn best(trials: Vec<Trial>) -> Result<Trial> {
    trials
        .into_iter()
        .reduce(|acc, t| if t.rms < acc.rms { t } else { acc })
        .ok_or(BootstrapError::Config("line search evaluated no trial step".to_string()))
}
