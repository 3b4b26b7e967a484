//! Two-loop self-consistency driver
//!
//! Outer loop: converge the chemical potential, refresh every fragment at
//! the new value, converge the site potentials, then check the particle
//! number again. Stops when the particle-number RMS is below tolerance.

use crate::cost::{particle_rms, rms, CostFunctions};
use crate::error::{BootstrapError, Result};
use crate::lambda_impl::{LambdaSettings, PotentialSolver};
use crate::mu_impl::{ChemicalPotentialSolver, MuSettings, MuStrategy};
use crate::potential::{ChemicalPotential, PotentialVector};
use crate::solver_impl::{FragmentSolver, FragmentSolverAdapter};
use crate::symmetry::EmbeddingProblem;
use fci::RdmBundle;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct BootstrapSettings {
    pub mu_strategy: MuStrategy,
    pub mu: MuSettings,
    pub lambda: LambdaSettings,
    pub max_outer_iterations: usize,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        BootstrapSettings {
            mu_strategy: MuStrategy::Newton,
            mu: MuSettings::default(),
            lambda: LambdaSettings::default(),
            max_outer_iterations: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub mu_alpha: f64,
    pub mu_beta: f64,
    pub particle_rms: f64,
    pub matching_rms: f64,
    pub lambda_iterations: usize,
}

#[derive(Debug, Clone)]
pub struct BootstrapResult {
    pub mu: ChemicalPotential,
    /// Potentials of the solved slots
    pub potentials: PotentialVector,
    /// Potentials of every fragment of the full model
    pub full_potentials: PotentialVector,
    pub energy: f64,
    /// Center energy of each solved slot
    pub fragment_energies: Vec<f64>,
    pub particle_residual: (f64, f64),
    pub matching_rms: f64,
    pub iterations: usize,
    pub history: Vec<IterationRecord>,
    pub rdms: Vec<RdmBundle>,
}

/// Serializable digest of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub energy: f64,
    pub mu_alpha: f64,
    pub mu_beta: f64,
    pub potentials: Vec<f64>,
    pub fragment_energies: Vec<f64>,
    pub particle_residual: [f64; 2],
    pub matching_rms: f64,
    pub iterations: usize,
    pub history: Vec<IterationRecord>,
}

impl BootstrapResult {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            energy: self.energy,
            mu_alpha: self.mu.alpha,
            mu_beta: self.mu.beta,
            potentials: self.full_potentials.values().iter().copied().collect(),
            fragment_energies: self.fragment_energies.clone(),
            particle_residual: [self.particle_residual.0, self.particle_residual.1],
            matching_rms: self.matching_rms,
            iterations: self.iterations,
            history: self.history.clone(),
        }
    }
}

pub struct SelfConsistency<'a, S: FragmentSolver> {
    cost: CostFunctions<'a, S>,
    settings: BootstrapSettings,
    constant_energy: f64,
}

impl<'a, S: FragmentSolver> SelfConsistency<'a, S> {
    /// `electrons` is the target count per spin; `constant_energy` is added to
    /// the summed fragment energies.
    pub fn new(
        problem: &'a EmbeddingProblem,
        adapter: &'a FragmentSolverAdapter<S>,
        settings: BootstrapSettings,
        electrons: (f64, f64),
        constant_energy: f64,
    ) -> Self {
        SelfConsistency {
            cost: CostFunctions::new(problem, adapter, electrons),
            settings,
            constant_energy,
        }
    }

    pub fn cost(&self) -> &CostFunctions<'a, S> {
        &self.cost
    }

    pub fn run(&self, initial_mu: ChemicalPotential) -> Result<BootstrapResult> {
        let problem = self.cost.problem();
        info!("===========================================");
        info!("        Bootstrap Self-Consistency");
        info!("===========================================");
        info!("Fragments solved: {} (multiplicity {})", problem.num_slots(), problem.multiplicity());
        info!("Matching conditions: {}", problem.num_conditions());
        info!("Match full density: {}", problem.full_density());
        info!("Chemical potential strategy: {}", self.settings.mu_strategy);
        info!("Line search: {}", self.settings.lambda.line_search);
        info!("===========================================");

        let mu_solver = ChemicalPotentialSolver::new(self.settings.mu_strategy, self.settings.mu);
        let lambda_solver = PotentialSolver::new(self.settings.lambda);

        let mut x = PotentialVector::zeros(problem.num_conditions());
        let mut mu = initial_mu;
        let mut history = Vec::new();
        let mut last = f64::INFINITY;

        for outer in 1..=self.settings.max_outer_iterations {
            info!("\n----- Outer iteration {} -----", outer);
            mu = mu_solver.solve(&self.cost, &x, mu)?.mu;

            // fragments are re-solved at the converged chemical potential
            let lambda = lambda_solver.solve_from(&self.cost, x, mu)?;
            x = lambda.potentials;
            let rdms = lambda.rdms;

            let particle = self.cost.particle_number_residual_from(&rdms);
            last = particle_rms(particle);
            history.push(IterationRecord {
                iteration: outer,
                mu_alpha: mu.alpha,
                mu_beta: mu.beta,
                particle_rms: last,
                matching_rms: lambda.residual_rms,
                lambda_iterations: lambda.iterations,
            });
            info!(
                "Outer iteration {}: particle rms = {:.6e}, matching rms = {:.6e}",
                outer, last, lambda.residual_rms
            );

            if last < self.settings.mu.tol {
                info!("Bootstrap converged in {} outer iterations", outer);
                return self.finish(x, mu, rdms, outer, history);
            }
        }

        Err(BootstrapError::NotConverged {
            stage: "bootstrap outer loop",
            iterations: self.settings.max_outer_iterations,
            residual: last,
        })
    }

    /// Energy at zero site potentials and a fixed chemical potential, with no
    /// optimization
    pub fn one_shot(&self, mu: ChemicalPotential) -> Result<BootstrapResult> {
        info!("One-shot evaluation at mu = ({:+.6}, {:+.6})", mu.alpha, mu.beta);
        let x = PotentialVector::zeros(self.cost.problem().num_conditions());
        let rdms = self.cost.solve_fragments(&x, mu)?;
        self.finish(x, mu, rdms, 0, Vec::new())
    }

    fn finish(
        &self,
        x: PotentialVector,
        mu: ChemicalPotential,
        rdms: Vec<RdmBundle>,
        iterations: usize,
        history: Vec<IterationRecord>,
    ) -> Result<BootstrapResult> {
        let problem = self.cost.problem();
        let fragment_energies = rdms
            .iter()
            .enumerate()
            .map(|(slot, rdm)| self.cost.adapter().fragment_energy(problem, slot, rdm))
            .collect::<Result<Vec<_>>>()?;
        let energy =
            problem.multiplicity() as f64 * fragment_energies.iter().sum::<f64>() + self.constant_energy;

        Ok(BootstrapResult {
            mu,
            full_potentials: problem.expand(&x),
            potentials: x,
            energy,
            fragment_energies,
            particle_residual: self.cost.particle_number_residual_from(&rdms),
            matching_rms: rms(&self.cost.residual_vector(&rdms)),
            iterations,
            history,
            rdms,
        })
    }
}
