use super::{degenerate_exit, log_evaluation, MuOutcome, MuSettings};
use crate::cost::{particle_rms, CostFunctions};
use crate::error::{BootstrapError, Result};
use crate::potential::{ChemicalPotential, PotentialVector};
use crate::solver_impl::FragmentSolver;

/// Interpolation state of one spin channel
///
/// `newest` is the last evaluated point. `kept` is the other interpolation
/// end: the previous point until the residual changes sign, then the
/// retained side of the bracket.
#[derive(Debug, Clone, Copy)]
struct FalsePosition {
    kept: (f64, f64),
    newest: (f64, f64),
}

impl FalsePosition {
    fn bracketed(&self) -> bool {
        self.kept.1 * self.newest.1 < 0.0
    }

    fn width(&self) -> f64 {
        (self.newest.0 - self.kept.0).abs()
    }

    fn next(&self) -> f64 {
        let (m0, r0) = self.kept;
        let (m1, r1) = self.newest;
        let slope = r1 - r0;
        if slope == 0.0 {
            m1
        } else {
            m1 - r1 * (m1 - m0) / slope
        }
    }

    fn update(&mut self, point: (f64, f64)) {
        if point.1 * self.newest.1 < 0.0 || !self.bracketed() {
            self.kept = self.newest;
        } else {
            // same side twice: Illinois halving of the retained end
            self.kept.1 *= 0.5;
        }
        self.newest = point;
    }
}

/// Secant steps on each spin channel until the residual changes sign, then
/// false position inside the bracket
pub(super) fn solve<S: FragmentSolver>(
    cost: &CostFunctions<'_, S>,
    x: &PotentialVector,
    mu0: ChemicalPotential,
    settings: &MuSettings,
) -> Result<MuOutcome> {
    let f0 = cost.particle_number_residual(x, mu0)?;
    log_evaluation(1, mu0, f0);
    if particle_rms(f0) < settings.tol {
        return Ok(MuOutcome::converged(mu0, f0, 1));
    }

    let offset = |f: f64| if f < 0.0 { settings.bracket_step } else { -settings.bracket_step };
    let m1 = [mu0.alpha + offset(f0.0), mu0.beta + offset(f0.1)];
    let mut f1 = cost.particle_number_residual(x, ChemicalPotential::new(m1[0], m1[1]))?;
    let mut spins = [
        FalsePosition {
            kept: (mu0.alpha, f0.0),
            newest: (m1[0], f1.0),
        },
        FalsePosition {
            kept: (mu0.beta, f0.1),
            newest: (m1[1], f1.1),
        },
    ];

    for it in 2..=settings.max_iterations {
        let mu = ChemicalPotential::new(spins[0].newest.0, spins[1].newest.0);
        log_evaluation(it, mu, f1);
        if particle_rms(f1) < settings.tol {
            return Ok(MuOutcome::converged(mu, f1, it));
        }

        let m2 = [spins[0].next(), spins[1].next()];
        if m2[0] == mu.alpha && m2[1] == mu.beta {
            let width = spins[0].width().max(spins[1].width());
            return degenerate_exit(settings, width, mu, f1, it);
        }

        f1 = cost.particle_number_residual(x, ChemicalPotential::new(m2[0], m2[1]))?;
        spins[0].update((m2[0], f1.0));
        spins[1].update((m2[1], f1.1));
    }

    Err(BootstrapError::NotConverged {
        stage: "chemical potential (secant)",
        iterations: settings.max_iterations,
        residual: particle_rms(f1),
    })
}

#[cfg(test)]
mod tests {
    use super::FalsePosition;
    use approx::assert_abs_diff_eq;

    fn run(f: impl Fn(f64) -> f64, a: f64, b: f64, steps: usize) -> (FalsePosition, Vec<f64>) {
        let mut state = FalsePosition {
            kept: (a, f(a)),
            newest: (b, f(b)),
        };
        let mut trail = Vec::new();
        for _ in 0..steps {
            let m = state.next();
            trail.push(m);
            state.update((m, f(m)));
        }
        (state, trail)
    }

    #[test]
    fn test_iterates_stay_inside_bracket() {
        // convex residual: plain false position would retain the upper end forever
        let f = |m: f64| (m + 1.0).powi(3) - 1.5;
        let root = 1.5f64.cbrt() - 1.0;
        let (state, trail) = run(f, -1.0, 1.0, 30);
        for m in trail {
            assert!((-1.0..=1.0).contains(&m), "iterate {} left the bracket", m);
        }
        assert_abs_diff_eq!(state.newest.0, root, epsilon = 1e-10);
    }

    #[test]
    fn test_secant_extrapolates_until_sign_change() {
        let f = |m: f64| 2.0 * (m - 3.0) + 0.1 * (m - 3.0).powi(3);
        let (state, trail) = run(f, 0.0, 0.1, 20);
        // the first step leaves the starting pair
        assert!(trail[0] > 0.1);
        assert!(state.bracketed() || f(state.newest.0).abs() < 1e-12);
        assert_abs_diff_eq!(state.newest.0, 3.0, epsilon = 1e-10);
    }
}
