use super::{degenerate_exit, log_evaluation, MuOutcome, MuSettings};
use crate::cost::{particle_rms, CostFunctions};
use crate::error::{BootstrapError, Result};
use crate::potential::{ChemicalPotential, PotentialVector};
use crate::solver_impl::FragmentSolver;

#[derive(Debug, Clone, Copy)]
struct Bracket {
    lo: f64,
    f_lo: f64,
    hi: f64,
}

impl Bracket {
    fn new(a: f64, fa: f64, b: f64, fb: f64) -> Self {
        if a <= b {
            Bracket { lo: a, f_lo: fa, hi: b }
        } else {
            Bracket { lo: b, f_lo: fb, hi: a }
        }
    }

    fn mid(&self) -> f64 {
        0.5 * (self.lo + self.hi)
    }

    fn width(&self) -> f64 {
        self.hi - self.lo
    }

    fn update(&mut self, mid: f64, f_mid: f64) {
        if f_mid * self.f_lo > 0.0 {
            self.lo = mid;
            self.f_lo = f_mid;
        } else {
            self.hi = mid;
        }
    }
}

fn pair(v: [f64; 2]) -> ChemicalPotential {
    ChemicalPotential::new(v[0], v[1])
}

fn not_converged(iterations: usize, residual: (f64, f64)) -> BootstrapError {
    BootstrapError::NotConverged {
        stage: "chemical potential (bisection)",
        iterations,
        residual: particle_rms(residual),
    }
}

/// Both spins are searched together: every evaluation moves each spin
/// within its own bracket, with the other spin at its current trial value.
pub(super) fn solve<S: FragmentSolver>(
    cost: &CostFunctions<'_, S>,
    x: &PotentialVector,
    mu0: ChemicalPotential,
    settings: &MuSettings,
) -> Result<MuOutcome> {
    let mut evaluations = 1;
    let f0 = cost.particle_number_residual(x, mu0)?;
    log_evaluation(evaluations, mu0, f0);
    if particle_rms(f0) < settings.tol {
        return Ok(MuOutcome::converged(mu0, f0, evaluations));
    }

    let mut a = [mu0.alpha, mu0.beta];
    let mut fa = [f0.0, f0.1];
    let mut brackets: [Option<Bracket>; 2] = [None, None];
    for s in 0..2 {
        if fa[s] == 0.0 {
            brackets[s] = Some(Bracket::new(a[s], 0.0, a[s], 0.0));
        }
    }

    // grow each unbracketed interval in the direction that reduces |residual|
    let mut step = settings.bracket_step;
    let mut last = f0;
    while brackets.iter().any(Option::is_none) {
        if evaluations >= settings.max_iterations {
            return Err(not_converged(evaluations, last));
        }
        let mut trial = a;
        for s in 0..2 {
            trial[s] = match brackets[s] {
                Some(b) => b.mid(),
                None if fa[s] < 0.0 => a[s] + step,
                None => a[s] - step,
            };
        }
        let f = cost.particle_number_residual(x, pair(trial))?;
        evaluations += 1;
        log_evaluation(evaluations, pair(trial), f);
        last = f;
        if particle_rms(f) < settings.tol {
            return Ok(MuOutcome::converged(pair(trial), f, evaluations));
        }

        let f = [f.0, f.1];
        for s in 0..2 {
            if brackets[s].is_some() {
                continue;
            }
            if f[s] * fa[s] <= 0.0 {
                brackets[s] = Some(Bracket::new(a[s], fa[s], trial[s], f[s]));
            } else {
                a[s] = trial[s];
                fa[s] = f[s];
            }
        }
        step *= 2.0;
    }

    let mut brackets = [
        brackets[0].unwrap_or(Bracket::new(a[0], fa[0], a[0], fa[0])),
        brackets[1].unwrap_or(Bracket::new(a[1], fa[1], a[1], fa[1])),
    ];
    loop {
        if evaluations >= settings.max_iterations {
            return Err(not_converged(evaluations, last));
        }
        let mid = [brackets[0].mid(), brackets[1].mid()];
        let f = cost.particle_number_residual(x, pair(mid))?;
        evaluations += 1;
        log_evaluation(evaluations, pair(mid), f);
        last = f;
        if particle_rms(f) < settings.tol {
            return Ok(MuOutcome::converged(pair(mid), f, evaluations));
        }

        brackets[0].update(mid[0], f.0);
        brackets[1].update(mid[1], f.1);
        let width = brackets[0].width().max(brackets[1].width());
        if width < settings.bracket_floor {
            return degenerate_exit(settings, width, pair(mid), f, evaluations);
        }
    }
}
