use crate::driver::BootstrapResult;
use fci::Spin;
use tracing::info;

pub fn report_summary(result: &BootstrapResult) {
    info!("\nBootstrap calculation finished.");
    info!("Outer iterations: {}", result.iterations);
    info!(
        "Chemical potential: alpha = {:+.8}, beta = {:+.8}",
        result.mu.alpha, result.mu.beta
    );
    info!(
        "Particle number residual: alpha = {:+.3e}, beta = {:+.3e}",
        result.particle_residual.0, result.particle_residual.1
    );
    info!("Matching residual rms: {:.3e}", result.matching_rms);

    info!("\nSite potentials:");
    for (i, v) in result.full_potentials.values().iter().enumerate() {
        info!("  Condition {:>3}: {:+.8}", i, v);
    }

    info!("\nFragment energies:");
    for (slot, e) in result.fragment_energies.iter().enumerate() {
        info!("  Slot {:>3}: {:.10} au", slot, e);
    }
    info!("\nTotal energy: {:.10} au", result.energy);
}

pub fn report_densities(result: &BootstrapResult) {
    for (slot, rdm) in result.rdms.iter().enumerate() {
        for spin in Spin::BOTH {
            info!("\nSlot {} one-body density ({:?}):", slot, spin);
            let gamma = rdm.one_body(spin);
            for row in gamma.row_iter() {
                let line: Vec<String> = row.iter().map(|x| format!("{:+.6}", x)).collect();
                info!("  {}", line.join(" "));
            }
        }
    }
}

pub fn report_history(result: &BootstrapResult) {
    if result.history.is_empty() {
        return;
    }
    info!("\n{:>5} {:>14} {:>14} {:>12} {:>12}", "iter", "mu_alpha", "mu_beta", "particle", "matching");
    for record in &result.history {
        info!(
            "{:>5} {:>+14.8} {:>+14.8} {:>12.3e} {:>12.3e}",
            record.iteration, record.mu_alpha, record.mu_beta, record.particle_rms, record.matching_rms
        );
    }
}
