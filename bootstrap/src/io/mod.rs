//! Input/Output operations for bootstrap calculations
//!
//! This module handles logging setup and the run summary file.

mod output;

pub use output::{setup_output, write_summary, write_summary_file};
