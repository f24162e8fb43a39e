//! Logging utilities for formatted output.
//!
//! Formatting helpers for counts, rates, and durations, plus the summary
//! blocks the pipeline logs after each stage.

use std::time::{Duration, Instant};

use crate::pipeline::PipelineStats;
use crate::variant::{CallVerdict, Variant};

/// Formats a count with thousands separators.
///
/// # Examples
///
/// ```
/// use umivar_lib::logging::format_count;
///
/// assert_eq!(format_count(999), "999");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let s = n.to_string();
    let bytes = s.as_bytes();

    bytes
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap())
        .collect::<Vec<_>>()
        .join(",")
}

/// Formats a fraction as a percentage with the given decimal places.
///
/// # Examples
///
/// ```
/// use umivar_lib::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(1.0, 0), "100%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use umivar_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Formats a processing rate with appropriate units.
///
/// # Examples
///
/// ```
/// use umivar_lib::logging::format_rate;
/// use std::time::Duration;
///
/// assert_eq!(format_rate(1000, Duration::from_secs(1)), "1,000 items/s");
/// assert_eq!(format_rate(30, Duration::from_secs(60)), "30.0 items/min");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} items/s", format_count(count));
    }

    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} items/s", format_count(rate as u64))
    } else {
        let items_per_min = count as f64 / (secs / 60.0);
        format!("{items_per_min:.1} items/min")
    }
}

/// Logs the stage-by-stage pipeline summary.
#[allow(clippy::cast_precision_loss)]
pub fn log_pipeline_summary(stats: &PipelineStats) {
    log::info!("Pipeline Summary:");
    log::info!("  Groups in: {}", format_count(stats.groups_in));
    log::info!("  Reads in: {}", format_count(stats.reads_in));
    log::info!("  Assembled: {}", format_count(stats.groups_assembled));
    log::info!("  Dropped (low depth): {}", format_count(stats.groups_dropped_low_depth));
    log::info!("  Consensuses aligned: {}", format_count(stats.consensuses_aligned));
    log::info!("  Dropped (no hit): {}", format_count(stats.consensuses_no_hit));
    log::info!("  Dropped (low similarity): {}", format_count(stats.consensuses_low_similarity));

    if stats.groups_in > 0 {
        let assembly_rate = stats.groups_assembled as f64 / stats.groups_in as f64;
        log::info!("  Assembly rate: {}", format_percent(assembly_rate, 2));
    }
    if stats.consensuses > 0 {
        let alignment_rate = stats.consensuses_aligned as f64 / stats.consensuses as f64;
        log::info!("  Alignment rate: {}", format_percent(alignment_rate, 2));
    }
    if stats.groups_assembled > 0 {
        let depth = stats.reads_assembled as f64 / stats.groups_assembled as f64;
        log::info!("  Avg reads per group: {depth:.1}");
    }
}

/// Logs verdict counts over the called variants.
pub fn log_variant_summary(variants: &[Variant]) {
    let passed = variants.iter().filter(|v| v.verdict == CallVerdict::Passed).count();
    let failed = variants.iter().filter(|v| v.verdict == CallVerdict::Failed).count();
    let untestable = variants.iter().filter(|v| v.verdict == CallVerdict::Untestable).count();

    log::info!("Variant Summary:");
    log::info!("  Candidates: {}", format_count(variants.len() as u64));
    log::info!("  Passed: {}", format_count(passed as u64));
    log::info!("  Failed: {}", format_count(failed as u64));
    if untestable > 0 {
        log::info!("  Untestable: {}", format_count(untestable as u64));
    }
}

/// Operation timing and summary helper.
///
/// # Examples
///
/// ```no_run
/// use umivar_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Assembling groups");
///
/// // ... do work ...
///
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Logs the completion with item count and rate.
    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}
