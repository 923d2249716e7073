//! Output module for reporting harvest results
//!
//! This module handles:
//! - Summaries of a finished session
//! - Statistics over an existing checkpoint file

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::crawler::HarvestReport;

/// Prints the summary of a finished session to stdout
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Summary ===\n");
    println!("  Records processed: {}", report.records_processed);
    println!("  Reviews collected: {}", report.items_collected);
    if report.interdictions > 0 {
        println!("  Challenge pages met: {}", report.interdictions);
    }
    match report.records_saved {
        Some(count) => println!(
            "  Checkpoint: {} ({} records)",
            report.output.display(),
            count
        ),
        None => println!(
            "  Checkpoint: {} (final save failed, see log)",
            report.output.display()
        ),
    }
}
