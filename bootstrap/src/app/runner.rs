use crate::config::{Args, Config};
use crate::driver::{BootstrapResult, BootstrapSettings, SelfConsistency};
use crate::embedding::{build_active_space, LatticeModel};
use crate::error::{BootstrapError, Result};
use crate::lambda_impl::LineSearch;
use crate::matching::MatchingModel;
use crate::mu_impl::MuStrategy;
use crate::solver_impl::FragmentSolverAdapter;
use crate::symmetry::{EmbeddingProblem, OrbitalAnalog, SymmetryReducer};
use fci::{DiagonalizationMethod, FCI};
use tracing::info;

/// Loop settings with command-line overrides applied on top of the file
pub fn resolve_settings(args: &Args, config: &Config) -> Result<BootstrapSettings> {
    let mut settings = config.bootstrap_settings()?;
    if let Some(name) = &args.mu_strategy {
        settings.mu_strategy = name.parse::<MuStrategy>()?;
        info!("Overriding mu_strategy with: {}", settings.mu_strategy);
    }
    if let Some(name) = &args.line_search {
        settings.lambda.line_search = name.parse::<LineSearch>()?;
        info!("Overriding line_search with: {}", settings.lambda.line_search);
    }
    if let Some(tol) = args.mu_tol {
        info!("Overriding mu_tol with: {:.1e}", tol);
        settings.mu.tol = tol;
    }
    if let Some(tol) = args.lambda_tol {
        info!("Overriding lambda_tol with: {:.1e}", tol);
        settings.lambda.tol = tol;
    }
    if let Some(max) = args.max_outer_iterations {
        info!("Overriding max_outer_iterations with: {}", max);
        settings.max_outer_iterations = max;
    }
    Ok(settings)
}

/// Identity or translationally reduced problem
pub fn build_problem(model: &MatchingModel, symmetry: bool, full_density: bool) -> Result<EmbeddingProblem> {
    if symmetry {
        info!("Translational symmetry: solving fragment 0 only");
        let analog = OrbitalAnalog::positional(model, 0)?;
        SymmetryReducer::reduce(model, &analog, full_density)
    } else {
        SymmetryReducer::identity(model, full_density)
    }
}

/// One FCI solver per slot, embedded in the lattice
pub fn build_solvers(
    lattice: &LatticeModel,
    model: &MatchingModel,
    problem: &EmbeddingProblem,
    num_states: usize,
    method: DiagonalizationMethod,
    schmidt_threshold: f64,
) -> Result<FragmentSolverAdapter<FCI>> {
    let bases = problem
        .fragments()
        .iter()
        .map(|slot| {
            let fragment = model.fragment(slot.source)?;
            let hamiltonian = build_active_space(lattice, fragment, schmidt_threshold)?;
            FCI::new(hamiltonian, num_states, method).map_err(|source| BootstrapError::Solver {
                fragment: slot.source,
                source,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(FragmentSolverAdapter::new(bases))
}

/// Build everything the configuration describes and run it
pub fn run_bootstrap(args: &Args, config: &Config) -> Result<BootstrapResult> {
    let lattice = config.lattice()?;
    let model = config.matching_model()?;
    let symmetry = config.is_symmetry_enabled() && !args.no_symmetry;
    let problem = build_problem(&model, symmetry, config.match_full_density())?;
    let adapter = build_solvers(
        &lattice,
        &model,
        &problem,
        config.num_states(),
        config.diagonalization()?,
        config.schmidt_threshold(),
    )?;

    let settings = resolve_settings(args, config)?;
    let driver = SelfConsistency::new(&problem, &adapter, settings, lattice.electrons(), lattice.constant);
    if args.one_shot || config.is_one_shot() {
        driver.one_shot(config.initial_mu())
    } else {
        driver.run(config.initial_mu())
    }
}
