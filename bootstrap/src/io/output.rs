//! Output formatting and logging utilities

use crate::driver::RunSummary;
use color_eyre::eyre::{Result, WrapErr};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::time::SystemTime as StdSystemTime;
use tracing::info;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Custom time formatter that shows only seconds
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = StdSystemTime::now();
        let duration = now.duration_since(std::time::UNIX_EPOCH).unwrap_or_default();

        let total_seconds = duration.as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Setup output logging to file or stdout
pub fn setup_output(output_path: Option<&String>) {
    match output_path {
        Some(path) => match File::create(path) {
            Ok(log) => {
                let file_layer = layer()
                    .with_writer(log)
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false);
                Registry::default().with(file_layer).init();
                info!("Output will be written to: {}", path);
            }
            Err(e) => eprintln!("Could not create output file {}: {}", path, e),
        },
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(SecondPrecisionTimer)
                .with_ansi(true);
            Registry::default().with(stdout_layer).init();
            info!("Output will be printed to stdout");
        }
    }
}

/// Serialize a run summary as YAML
pub fn write_summary<W: Write>(writer: &mut W, summary: &RunSummary) -> Result<()> {
    let yaml = serde_yml::to_string(summary).wrap_err("Failed to serialize run summary")?;
    writer.write_all(yaml.as_bytes())?;
    Ok(())
}

pub fn write_summary_file(path: &str, summary: &RunSummary) -> Result<()> {
    let mut file = File::create(path).wrap_err_with(|| format!("Unable to create summary file: {}", path))?;
    write_summary(&mut file, summary)?;
    info!("Summary written to: {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::IterationRecord;

    #[test]
    fn test_summary_is_yaml() {
        let summary = RunSummary {
            energy: -1.5,
            mu_alpha: 0.25,
            mu_beta: 0.25,
            potentials: vec![0.1, -0.1],
            fragment_energies: vec![-0.75, -0.75],
            particle_residual: [0.0, 0.0],
            matching_rms: 1e-9,
            iterations: 2,
            history: vec![IterationRecord {
                iteration: 1,
                mu_alpha: 0.2,
                mu_beta: 0.2,
                particle_rms: 1e-3,
                matching_rms: 1e-7,
                lambda_iterations: 3,
            }],
        };
        let mut buffer = Vec::new();
        write_summary(&mut buffer, &summary).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("energy: -1.5"));
        assert!(text.contains("lambda_iterations: 3"));
        assert!(text.contains("\niterations: 2"));
    }
}
