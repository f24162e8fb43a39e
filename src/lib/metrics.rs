//! Structured metric types and the TSV writer.
//!
//! Run-level counters are collected into [`PipelineMetrics`] and written
//! as a one-row TSV; the same writer serves the table dump and the
//! variant report.

use std::path::Path;

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineStats;
use crate::variant::{CallVerdict, Variant};

/// Number of decimal places used for float metrics.
pub const FLOAT_PRECISION: usize = 6;

/// Formats a float value with the standard precision for metrics.
///
/// # Example
/// ```
/// use umivar_lib::metrics::format_float;
/// assert_eq!(format_float(0.9), "0.900000");
/// assert_eq!(format_float(0.0), "0.000000");
/// ```
#[must_use]
pub fn format_float(value: f64) -> String {
    format!("{value:.FLOAT_PRECISION$}")
}

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name for this metric type.
    ///
    /// Used in error messages when writing metrics files.
    fn metric_name() -> &'static str;
}

/// Write rows to a TSV file with consistent error handling.
///
/// # Errors
/// Returns an error if the file cannot be created or written to.
///
/// # Example
/// ```no_run
/// use umivar_lib::metrics::write_metrics;
/// use serde::Serialize;
/// use std::path::Path;
///
/// #[derive(Serialize)]
/// struct MyMetrics {
///     count: usize,
///     value: f64,
/// }
///
/// let metrics = vec![MyMetrics { count: 10, value: 1.5 }];
/// write_metrics(Path::new("metrics.txt"), &metrics, "processing").unwrap();
/// ```
pub fn write_metrics<P: AsRef<Path>, T: Serialize>(
    path: P,
    metrics: &[T],
    description: &str,
) -> Result<()> {
    let path_ref = path.as_ref();
    DelimFile::default()
        .write_tsv(&path_ref, metrics)
        .with_context(|| format!("Failed to write {} metrics: {}", description, path_ref.display()))
}

/// Write metrics implementing the [`Metric`] trait, using the metric's
/// own name for error messages.
///
/// # Errors
/// Returns an error if the file cannot be created or written to.
pub fn write_metrics_auto<P: AsRef<Path>, T: Metric>(path: P, metrics: &[T]) -> Result<()> {
    write_metrics(path, metrics, T::metric_name())
}

/// Run-level counters for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PipelineMetrics {
    /// References in the loaded panel, forward entries only.
    pub references: u64,
    /// UMI groups read from input.
    pub groups_in: u64,
    /// Reads read from input.
    pub reads_in: u64,
    /// Groups that assembled a consensus.
    pub groups_assembled: u64,
    /// Groups dropped for insufficient depth or quality.
    pub groups_dropped_low_depth: u64,
    /// Consensus streams produced by assembly.
    pub consensuses: u64,
    /// Consensus streams that aligned and were counted.
    pub consensuses_aligned: u64,
    /// Consensus streams without a k-mer hit.
    pub consensuses_no_hit: u64,
    /// Consensus streams rejected for low alignment identity.
    pub consensuses_low_similarity: u64,
    /// Reads that contributed to an assembled consensus.
    pub reads_assembled: u64,
    /// Candidate variants scored.
    pub candidates: u64,
    /// Candidates whose every filter passed.
    pub variants_passed: u64,
    /// Candidates with a degenerate model fit.
    pub variants_untestable: u64,
}

impl PipelineMetrics {
    /// Collects the row from finished stage stats and the called variants.
    #[must_use]
    pub fn collect(stats: &PipelineStats, references: usize, variants: &[Variant]) -> Self {
        Self {
            references: references as u64,
            groups_in: stats.groups_in,
            reads_in: stats.reads_in,
            groups_assembled: stats.groups_assembled,
            groups_dropped_low_depth: stats.groups_dropped_low_depth,
            consensuses: stats.consensuses,
            consensuses_aligned: stats.consensuses_aligned,
            consensuses_no_hit: stats.consensuses_no_hit,
            consensuses_low_similarity: stats.consensuses_low_similarity,
            reads_assembled: stats.reads_assembled,
            candidates: variants.len() as u64,
            variants_passed: variants
                .iter()
                .filter(|v| v.verdict == CallVerdict::Passed)
                .count() as u64,
            variants_untestable: variants
                .iter()
                .filter(|v| v.verdict == CallVerdict::Untestable)
                .count() as u64,
        }
    }
}

impl Metric for PipelineMetrics {
    fn metric_name() -> &'static str {
        "pipeline"
    }
}
