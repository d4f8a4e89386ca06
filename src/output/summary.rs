//! Human-readable run summary printed by the binary

use crate::output::RunManifest;

/// Prints a manifest summary to stdout
pub fn print_summary(manifest: &RunManifest) {
    println!("=== Mirror Summary ===\n");

    println!("Run:");
    println!("  Status: {}", manifest.status);
    println!("  Duration: {:.1}s", manifest.duration_ms as f64 / 1000.0);
    println!("  Config hash: {}", manifest.config_hash);
    println!();

    println!("Pages:");
    println!("  Discovered: {}", manifest.discovered);
    println!("  Written: {}", manifest.written);
    println!("  Unchanged: {}", manifest.unchanged);
    println!("  Failed: {}", manifest.failed.len());
    println!("  Abandoned: {}", manifest.abandoned.len());
    println!();

    if !manifest.failed.is_empty() {
        println!("Failures ({}):", manifest.failed.len());
        for failure in &manifest.failed {
            println!("  - {}: {}", failure.url, failure.error);
        }
        println!();
    }

    if !manifest.warnings.is_empty() {
        println!("Warnings ({}):", manifest.warnings.len());
        for warning in &manifest.warnings {
            println!("  - {}: {}", warning.url, warning.message);
        }
        println!();
    }

    let attempted = manifest.written + manifest.unchanged + manifest.failed.len();
    let success_rate = if attempted > 0 {
        ((manifest.written + manifest.unchanged) as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Success Rate: {:.1}% ({} / {} pages mirrored)",
        success_rate,
        manifest.written + manifest.unchanged,
        attempted
    );
}
