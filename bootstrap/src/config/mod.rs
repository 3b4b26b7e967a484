//! Configuration management for bootstrap calculations
//!
//! This module handles configuration structures, defaults, and validation
//! for the lattice model, the fragment topology and the self-consistency
//! loops.

mod args;

pub use args::Args;

use crate::driver::BootstrapSettings;
use crate::embedding::{LatticeModel, DEFAULT_SCHMIDT_THRESHOLD};
use crate::error::{BootstrapError, Result};
use crate::lambda_impl::{LambdaSettings, LineSearch};
use crate::matching::{Fragment, MatchingCondition, MatchingModel};
use crate::mu_impl::{MuSettings, MuStrategy};
use crate::potential::ChemicalPotential;
use fci::{DavidsonParams, DiagonalizationMethod};
use serde::{Deserialize, Serialize};

/// Main configuration structure for bootstrap calculations
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub system: SystemParams,
    pub fragments: Vec<FragmentParams>,
    #[serde(default)]
    pub bootstrap_params: BootstrapParams,
    #[serde(default)]
    pub solver: SolverParams,
    pub translational_symmetry: Option<bool>,
    pub one_shot: Option<bool>,
}

/// Lattice model parameters
#[derive(Debug, Deserialize, Serialize)]
pub struct SystemParams {
    pub model: Option<String>,
    pub sites: usize,
    pub hopping: Option<f64>,
    pub interaction: Option<f64>,
    pub periodic: Option<bool>,
    pub n_alpha: usize,
    pub n_beta: usize,
}

impl SystemParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        if self.model.is_none() {
            self.model = Some("hubbard".to_string());
        }
        if self.hopping.is_none() {
            self.hopping = Some(1.0);
        }
        if self.interaction.is_none() {
            self.interaction = Some(0.0);
        }
        if self.periodic.is_none() {
            self.periodic = Some(true);
        }
        self
    }
}

/// One fragment; orbitals are lattice site labels
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FragmentParams {
    pub orbitals: Vec<usize>,
    pub centers: Vec<usize>,
    pub state: Option<usize>,
    pub bath_state: Option<usize>,
    #[serde(default)]
    pub conditions: Vec<MatchingCondition>,
}

impl From<FragmentParams> for Fragment {
    fn from(params: FragmentParams) -> Self {
        Fragment {
            orbitals: params.orbitals,
            centers: params.centers,
            state: params.state.unwrap_or(0),
            bath_state: params.bath_state.unwrap_or(0),
            conditions: params.conditions,
        }
    }
}

/// Self-consistency parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BootstrapParams {
    pub mu_tol: Option<f64>,
    pub lambda_tol: Option<f64>,
    pub d_mu: Option<f64>,
    pub d_lambda: Option<f64>,
    pub max_outer_iterations: Option<usize>,
    pub max_mu_iterations: Option<usize>,
    pub max_lambda_iterations: Option<usize>,
    pub mu_strategy: Option<String>,
    pub line_search: Option<String>,
    pub match_full_density: Option<bool>,
    pub bracket_step: Option<f64>,
    pub bracket_floor: Option<f64>,
    pub accept_degenerate_bracket: Option<bool>,
    pub singular_threshold: Option<f64>,
    pub schmidt_threshold: Option<f64>,
    pub initial_mu: Option<ChemicalPotential>,
}

impl Default for BootstrapParams {
    fn default() -> Self {
        BootstrapParams {
            mu_tol: Some(1e-6),
            lambda_tol: Some(1e-6),
            d_mu: Some(1e-6),
            d_lambda: Some(1e-6),
            max_outer_iterations: Some(50),
            max_mu_iterations: Some(100),
            max_lambda_iterations: Some(100),
            mu_strategy: Some("newton".to_string()),
            line_search: Some("scan".to_string()),
            match_full_density: Some(false),
            bracket_step: Some(0.1),
            bracket_floor: Some(1e-12),
            accept_degenerate_bracket: Some(true),
            singular_threshold: Some(1e-12),
            schmidt_threshold: Some(DEFAULT_SCHMIDT_THRESHOLD),
            initial_mu: Some(ChemicalPotential::default()),
        }
    }
}

impl BootstrapParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        self.mu_tol = self.mu_tol.or(defaults.mu_tol);
        self.lambda_tol = self.lambda_tol.or(defaults.lambda_tol);
        self.d_mu = self.d_mu.or(defaults.d_mu);
        self.d_lambda = self.d_lambda.or(defaults.d_lambda);
        self.max_outer_iterations = self.max_outer_iterations.or(defaults.max_outer_iterations);
        self.max_mu_iterations = self.max_mu_iterations.or(defaults.max_mu_iterations);
        self.max_lambda_iterations = self.max_lambda_iterations.or(defaults.max_lambda_iterations);
        self.mu_strategy = self.mu_strategy.or(defaults.mu_strategy);
        self.line_search = self.line_search.or(defaults.line_search);
        self.match_full_density = self.match_full_density.or(defaults.match_full_density);
        self.bracket_step = self.bracket_step.or(defaults.bracket_step);
        self.bracket_floor = self.bracket_floor.or(defaults.bracket_floor);
        self.accept_degenerate_bracket = self.accept_degenerate_bracket.or(defaults.accept_degenerate_bracket);
        self.singular_threshold = self.singular_threshold.or(defaults.singular_threshold);
        self.schmidt_threshold = self.schmidt_threshold.or(defaults.schmidt_threshold);
        self.initial_mu = self.initial_mu.or(defaults.initial_mu);
        self
    }
}

/// Fragment solver parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SolverParams {
    pub method: Option<String>, // "exact" or "davidson"
    pub num_states: Option<usize>,
    pub max_iterations: Option<usize>,
    pub convergence_threshold: Option<f64>,
    pub max_subspace: Option<usize>,
}

impl Default for SolverParams {
    fn default() -> Self {
        let davidson = DavidsonParams::default();
        SolverParams {
            method: Some("exact".to_string()),
            num_states: Some(1),
            max_iterations: Some(davidson.max_iterations),
            convergence_threshold: Some(davidson.convergence_threshold),
            max_subspace: Some(davidson.max_subspace),
        }
    }
}

impl SolverParams {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        self.method = self.method.or(defaults.method);
        self.num_states = self.num_states.or(defaults.num_states);
        self.max_iterations = self.max_iterations.or(defaults.max_iterations);
        self.convergence_threshold = self.convergence_threshold.or(defaults.convergence_threshold);
        self.max_subspace = self.max_subspace.or(defaults.max_subspace);
        self
    }
}

impl Config {
    /// Apply defaults to all configuration sections
    pub fn with_defaults(mut self) -> Self {
        self.system = self.system.with_defaults();
        self.bootstrap_params = self.bootstrap_params.with_defaults();
        self.solver = self.solver.with_defaults();
        if self.translational_symmetry.is_none() {
            self.translational_symmetry = Some(false);
        }
        if self.one_shot.is_none() {
            self.one_shot = Some(false);
        }
        self
    }

    pub fn lattice(&self) -> Result<LatticeModel> {
        let system = &self.system;
        match system.model.as_deref().unwrap_or("hubbard").to_lowercase().as_str() {
            "hubbard" => LatticeModel::hubbard(
                system.sites,
                system.hopping.unwrap_or(1.0),
                system.interaction.unwrap_or(0.0),
                system.periodic.unwrap_or(true),
                system.n_alpha,
                system.n_beta,
            ),
            other => Err(BootstrapError::Config(format!("unknown lattice model: {}", other))),
        }
    }

    pub fn matching_model(&self) -> Result<MatchingModel> {
        MatchingModel::new(self.fragments.iter().cloned().map(Fragment::from).collect())
    }

    /// Loop settings from the file, before command-line overrides
    pub fn bootstrap_settings(&self) -> Result<BootstrapSettings> {
        let p = &self.bootstrap_params;
        let defaults = BootstrapSettings::default();
        let mu_strategy = match &p.mu_strategy {
            Some(name) => name.parse::<MuStrategy>()?,
            None => defaults.mu_strategy,
        };
        let line_search = match &p.line_search {
            Some(name) => name.parse::<LineSearch>()?,
            None => defaults.lambda.line_search,
        };
        let singular_threshold = p.singular_threshold.unwrap_or(defaults.mu.singular_threshold);

        Ok(BootstrapSettings {
            mu_strategy,
            mu: MuSettings {
                tol: p.mu_tol.unwrap_or(defaults.mu.tol),
                d_mu: p.d_mu.unwrap_or(defaults.mu.d_mu),
                max_iterations: p.max_mu_iterations.unwrap_or(defaults.mu.max_iterations),
                bracket_step: p.bracket_step.unwrap_or(defaults.mu.bracket_step),
                bracket_floor: p.bracket_floor.unwrap_or(defaults.mu.bracket_floor),
                accept_degenerate_bracket: p
                    .accept_degenerate_bracket
                    .unwrap_or(defaults.mu.accept_degenerate_bracket),
                singular_threshold,
            },
            lambda: LambdaSettings {
                tol: p.lambda_tol.unwrap_or(defaults.lambda.tol),
                d_lambda: p.d_lambda.unwrap_or(defaults.lambda.d_lambda),
                max_iterations: p.max_lambda_iterations.unwrap_or(defaults.lambda.max_iterations),
                line_search,
                singular_threshold,
            },
            max_outer_iterations: p.max_outer_iterations.unwrap_or(defaults.max_outer_iterations),
        })
    }

    pub fn diagonalization(&self) -> Result<DiagonalizationMethod> {
        let s = &self.solver;
        match s.method.as_deref().unwrap_or("exact").to_lowercase().as_str() {
            "exact" => Ok(DiagonalizationMethod::Exact),
            "davidson" => {
                let defaults = DavidsonParams::default();
                Ok(DiagonalizationMethod::Davidson(DavidsonParams {
                    max_iterations: s.max_iterations.unwrap_or(defaults.max_iterations),
                    convergence_threshold: s.convergence_threshold.unwrap_or(defaults.convergence_threshold),
                    max_subspace: s.max_subspace.unwrap_or(defaults.max_subspace),
                }))
            }
            other => Err(BootstrapError::Config(format!("unknown solver method: {}", other))),
        }
    }

    /// Number of eigenstates each fragment solver computes; at least enough
    /// to reach every requested target state
    pub fn num_states(&self) -> usize {
        let highest = self.fragments.iter().map(|f| f.state.unwrap_or(0) + 1).max().unwrap_or(1);
        self.solver.num_states.unwrap_or(1).max(highest)
    }

    pub fn match_full_density(&self) -> bool {
        self.bootstrap_params.match_full_density.unwrap_or(false)
    }

    pub fn schmidt_threshold(&self) -> f64 {
        self.bootstrap_params.schmidt_threshold.unwrap_or(DEFAULT_SCHMIDT_THRESHOLD)
    }

    pub fn initial_mu(&self) -> ChemicalPotential {
        self.bootstrap_params.initial_mu.unwrap_or_default()
    }

    /// Check if only the first fragment is solved and the rest tiled
    pub fn is_symmetry_enabled(&self) -> bool {
        self.translational_symmetry.unwrap_or(false)
    }

    pub fn is_one_shot(&self) -> bool {
        self.one_shot.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RING: &str = r#"
system:
  sites: 4
  interaction: 4.0
  n_alpha: 2
  n_beta: 2
fragments:
  - orbitals: [3, 0, 1]
    centers: [0]
    conditions:
      - kind: one_body
        neighbor: 3
        orbitals: [3, 3]
        spin: alpha
  - orbitals: [0, 1, 2]
    centers: [1]
  - orbitals: [1, 2, 3]
    centers: [2]
  - orbitals: [2, 3, 0]
    centers: [3]
bootstrap_params:
  mu_strategy: bisection
  mu_tol: 1.0e-8
  initial_mu:
    alpha: 0.5
    beta: 0.5
solver:
  method: davidson
  max_subspace: 20
translational_symmetry: true
"#;

    fn parse(yaml: &str) -> Config {
        serde_yml::from_str::<Config>(yaml).unwrap().with_defaults()
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = parse(RING);
        assert_eq!(config.system.hopping, Some(1.0));
        assert_eq!(config.system.periodic, Some(true));
        assert_eq!(config.bootstrap_params.lambda_tol, Some(1e-6));
        assert_eq!(config.bootstrap_params.line_search.as_deref(), Some("scan"));
        assert_eq!(config.bootstrap_params.max_outer_iterations, Some(50));
        assert!(config.is_symmetry_enabled());
        assert!(!config.is_one_shot());
        assert!(!config.match_full_density());
        assert_eq!(config.initial_mu(), ChemicalPotential::new(0.5, 0.5));
        assert_eq!(config.num_states(), 1);
    }

    #[test]
    fn test_settings_conversion() {
        let config = parse(RING);
        let settings = config.bootstrap_settings().unwrap();
        assert_eq!(settings.mu_strategy, MuStrategy::Bisection);
        assert_eq!(settings.mu.tol, 1e-8);
        assert_eq!(settings.lambda.line_search, LineSearch::Scan);
        assert!(settings.mu.accept_degenerate_bracket);

        match config.diagonalization().unwrap() {
            DiagonalizationMethod::Davidson(params) => {
                assert_eq!(params.max_subspace, 20);
                assert_eq!(params.max_iterations, DavidsonParams::default().max_iterations);
            }
            other => panic!("expected Davidson, got {:?}", other),
        }
    }

    #[test]
    fn test_model_construction() {
        let config = parse(RING);
        let model = config.matching_model().unwrap();
        assert_eq!(model.num_fragments(), 4);
        assert_eq!(model.num_conditions(), 1);
        let lattice = config.lattice().unwrap();
        assert_eq!(lattice.num_sites(), 4);
        assert_eq!(lattice.electrons(), (2.0, 2.0));
    }

    #[test]
    fn test_unknown_names_rejected() {
        let mut config = parse(RING);
        config.bootstrap_params.mu_strategy = Some("regula falsi".to_string());
        assert!(matches!(config.bootstrap_settings(), Err(BootstrapError::Config(_))));

        let mut config = parse(RING);
        config.solver.method = Some("lanczos".to_string());
        assert!(config.diagonalization().is_err());

        let mut config = parse(RING);
        config.system.model = Some("heisenberg".to_string());
        assert!(config.lattice().is_err());
    }

    #[test]
    fn test_higher_target_state_raises_num_states() {
        let mut config = parse(RING);
        config.fragments[2].state = Some(2);
        assert_eq!(config.num_states(), 3);
    }
}
