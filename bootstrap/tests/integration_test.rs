//! Integration tests for the bootstrap self-consistency engine
//!
//! These tests build real embedded FCI solvers from lattice models and run
//! the full two-loop optimization.

use bootstrap::app::{build_problem, build_solvers};
use bootstrap::config::Config;
use bootstrap::embedding::{LatticeModel, DEFAULT_SCHMIDT_THRESHOLD};
use bootstrap::{
    BootstrapResult, BootstrapSettings, ChemicalPotential, Fragment, LineSearch, MatchingCondition, MatchingModel,
    SelfConsistency,
};
use fci::{DiagonalizationMethod, Spin};
use std::path::PathBuf;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Helper function to get the path to example files
    fn example_path(filename: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("example").join(filename)
    }

    fn tight_settings() -> BootstrapSettings {
        let mut settings = BootstrapSettings::default();
        settings.mu.tol = 1e-8;
        settings.lambda.tol = 1e-8;
        settings.lambda.line_search = LineSearch::Scan;
        settings
    }

    fn run(
        lattice: &LatticeModel,
        model: &MatchingModel,
        symmetry: bool,
        full_density: bool,
        one_shot: bool,
    ) -> BootstrapResult {
        let problem = build_problem(model, symmetry, full_density).unwrap();
        let adapter = build_solvers(
            lattice,
            model,
            &problem,
            1,
            DiagonalizationMethod::Exact,
            DEFAULT_SCHMIDT_THRESHOLD,
        )
        .unwrap();
        let driver = SelfConsistency::new(&problem, &adapter, tight_settings(), lattice.electrons(), lattice.constant);
        if one_shot {
            driver.one_shot(ChemicalPotential::default()).unwrap()
        } else {
            driver.run(ChemicalPotential::default()).unwrap()
        }
    }

    fn dimer_model() -> MatchingModel {
        let fragment = |own: usize, other: usize| Fragment {
            orbitals: vec![own, other],
            centers: vec![own],
            state: 0,
            bath_state: 0,
            conditions: vec![MatchingCondition::OneBody {
                neighbor: other,
                orbitals: [other, other],
                spin: Spin::Alpha,
            }],
        };
        MatchingModel::new(vec![fragment(0, 1), fragment(1, 0)]).unwrap()
    }

    #[test]
    fn test_hubbard_dimer_is_already_consistent() {
        // both fragments see the exact ground state, so nothing needs to move
        let u = 4.0;
        let lattice = LatticeModel::hubbard(2, 1.0, u, true, 1, 1).unwrap();
        let result = run(&lattice, &dimer_model(), false, false, false);

        let exact = (u - f64::sqrt(u * u + 16.0)) / 2.0;
        assert_abs_diff_eq!(result.energy, exact, epsilon = 1e-6);
        assert_abs_diff_eq!(result.mu.alpha, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result.mu.beta, 0.0, epsilon = 1e-6);
        for v in result.potentials.values().iter() {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-6);
        }
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_hubbard_dimer_one_shot() {
        let u = 4.0;
        let lattice = LatticeModel::hubbard(2, 1.0, u, true, 1, 1).unwrap();
        let result = run(&lattice, &dimer_model(), false, false, true);
        assert_abs_diff_eq!(result.energy, (u - f64::sqrt(u * u + 16.0)) / 2.0, epsilon = 1e-9);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_translational_reduction_matches_full_problem() {
        let content = std::fs::read_to_string(example_path("hubbard_ring.yaml")).unwrap();
        let config: Config = serde_yml::from_str::<Config>(&content).unwrap().with_defaults();
        let lattice = config.lattice().unwrap();
        let model = config.matching_model().unwrap();

        let full = run(&lattice, &model, false, true, false);
        let reduced = run(&lattice, &model, true, true, false);

        assert_eq!(reduced.potentials.len(), 2);
        assert_eq!(reduced.full_potentials.len(), full.potentials.len());
        for (a, b) in full.potentials.values().iter().zip(reduced.full_potentials.values().iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(full.mu.alpha, reduced.mu.alpha, epsilon = 1e-6);
        assert_abs_diff_eq!(full.mu.beta, reduced.mu.beta, epsilon = 1e-6);
        assert_abs_diff_eq!(full.energy, reduced.energy, epsilon = 1e-6);

        // every center holds one sixth of an electron per spin
        for rdm in &reduced.rdms {
            assert_abs_diff_eq!(rdm.one_alpha[(1, 1)], 1.0 / 6.0, epsilon = 1e-6);
        }
        assert!(full.matching_rms < 1e-8);
    }

    #[test]
    fn test_example_configuration_builds() {
        let config_path = example_path("hubbard_ring.yaml");
        let content = std::fs::read_to_string(&config_path).unwrap();
        let config: Config = serde_yml::from_str::<Config>(&content).unwrap().with_defaults();

        assert!(config.is_symmetry_enabled());
        assert!(config.match_full_density());
        let model = config.matching_model().unwrap();
        assert_eq!(model.num_fragments(), 6);
        assert_eq!(model.num_conditions(), 12);
        let settings = config.bootstrap_settings().unwrap();
        assert_eq!(settings.max_outer_iterations, 30);
    }
}
