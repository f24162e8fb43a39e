//! Variant candidates, the filter chain, and the caller.
//!
//! Every table cell with at least one major group is a candidate. The
//! error model turns its counts into a Phred-like score, then each
//! registered filter votes; a variant is accepted only when every filter
//! passes. Cells governed by a degenerate model fit get an untestable
//! verdict instead of a pass or fail.

use std::fmt;

use crate::dna::{base_index, BASES};
use crate::model::{phred_score, ErrorModel};
use crate::table::MutationsTableSet;

/// Aggregated pass/fail state across the registered filters.
///
/// Bit `i` of the mask is set when filter `i`, in registration order,
/// passed. Failed filter names are kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSummary {
    passed_bits: u64,
    filter_count: usize,
    failed_names: Vec<String>,
}

impl FilterSummary {
    /// Records the next filter's outcome.
    pub fn record(&mut self, name: &str, passed: bool) {
        if passed {
            self.passed_bits |= 1 << self.filter_count;
        } else {
            self.failed_names.push(name.to_string());
        }
        self.filter_count += 1;
    }

    /// The pass bitmask in registration order.
    #[must_use]
    pub fn passed_bits(&self) -> u64 {
        self.passed_bits
    }

    /// Number of filters recorded.
    #[must_use]
    pub fn filter_count(&self) -> usize {
        self.filter_count
    }

    /// True when every recorded filter passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_names.is_empty()
    }

    /// `PASS`, or the failed filter names joined with `;`.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.failed_names.is_empty() {
            "PASS".to_string()
        } else {
            self.failed_names.join(";")
        }
    }
}

/// Final verdict for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallVerdict {
    /// Every filter passed.
    Passed,
    /// At least one filter failed.
    Failed,
    /// The governing model fit was degenerate; no statistical test ran.
    Untestable,
}

impl fmt::Display for CallVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CallVerdict::Passed => "PASS",
            CallVerdict::Failed => "FAIL",
            CallVerdict::Untestable => "UNTESTABLE",
        };
        f.write_str(label)
    }
}

/// A candidate substitution variant with its counts and verdict.
#[derive(Debug, Clone)]
pub struct Variant {
    /// Library index of the forward reference.
    pub reference_index: usize,
    /// 0-based reference position.
    pub position: usize,
    /// Reference base.
    pub from: u8,
    /// Alternate base.
    pub to: u8,
    /// Groups whose consensus carried the alternate.
    pub major_migs: u64,
    /// Groups covering the position.
    pub coverage_migs: u64,
    /// Reads behind the major groups.
    pub major_reads: u64,
    /// Reads covering the position.
    pub coverage_reads: u64,
    /// Groups in which the alternate appeared as within-group noise.
    pub minor_migs: u64,
    /// `major_migs / coverage_migs`.
    pub frequency: f64,
    /// Mean background minor frequency under the governing fit.
    pub background: f64,
    /// Phred-like score; `None` when the fit was degenerate.
    pub score: Option<f64>,
    /// Filter outcomes in registration order.
    pub summary: FilterSummary,
    /// The final call.
    pub verdict: CallVerdict,
}

/// One composable accept/reject rule.
pub trait VariantFilter: Send + Sync {
    /// Short name used in the summary diagnostic.
    fn name(&self) -> &str;
    /// True when the variant survives this filter.
    fn passes(&self, variant: &Variant) -> bool;
}

/// Requires the statistical score to reach a significance threshold.
/// Unscored variants never pass.
#[derive(Debug, Clone, Copy)]
pub struct QualityFilter {
    pub threshold: f64,
}

impl VariantFilter for QualityFilter {
    fn name(&self) -> &str {
        "qual"
    }

    fn passes(&self, variant: &Variant) -> bool {
        variant.score.map_or(false, |score| score >= self.threshold)
    }
}

/// Rejects single-group variants unless their frequency clears the
/// threshold, guarding against one-off artifacts the statistical test
/// alone would admit.
#[derive(Debug, Clone, Copy)]
pub struct SingletonFilter {
    pub frequency_threshold: f64,
}

impl VariantFilter for SingletonFilter {
    fn name(&self) -> &str {
        "singleton"
    }

    fn passes(&self, variant: &Variant) -> bool {
        variant.major_migs > 1
            || variant.major_migs as f64
                >= variant.coverage_migs as f64 * self.frequency_threshold
    }
}

/// Requires a minimum group coverage at the variant position.
#[derive(Debug, Clone, Copy)]
pub struct CoverageFilter {
    pub min_coverage: u64,
}

impl VariantFilter for CoverageFilter {
    fn name(&self) -> &str {
        "coverage"
    }

    fn passes(&self, variant: &Variant) -> bool {
        variant.coverage_migs >= self.min_coverage
    }
}

/// Options for the standard filter chain.
#[derive(Debug, Clone)]
pub struct VariantCallerOptions {
    /// Minimum Phred-like score.
    pub quality_threshold: f64,
    /// Frequency bound applied to single-group variants.
    pub singleton_frequency_threshold: f64,
    /// Minimum group coverage.
    pub min_coverage: u64,
}

impl Default for VariantCallerOptions {
    fn default() -> Self {
        Self { quality_threshold: 20.0, singleton_frequency_threshold: 0.001, min_coverage: 5 }
    }
}

/// Walks finished tables and produces the ordered variant list.
pub struct VariantCaller {
    filters: Vec<Box<dyn VariantFilter>>,
}

impl VariantCaller {
    /// The standard chain: quality, then singleton, then coverage.
    #[must_use]
    pub fn new(options: &VariantCallerOptions) -> Self {
        Self::with_filters(vec![
            Box::new(QualityFilter { threshold: options.quality_threshold }),
            Box::new(SingletonFilter {
                frequency_threshold: options.singleton_frequency_threshold,
            }),
            Box::new(CoverageFilter { min_coverage: options.min_coverage }),
        ])
    }

    /// A custom chain; registration order fixes the summary bit order.
    #[must_use]
    pub fn with_filters(filters: Vec<Box<dyn VariantFilter>>) -> Self {
        Self { filters }
    }

    /// Scores and filters every candidate cell, ordered by reference,
    /// position, and alternate base.
    #[must_use]
    pub fn call(&self, tables: &MutationsTableSet, model: &ErrorModel) -> Vec<Variant> {
        let mut variants = Vec::new();
        for table in tables.iter() {
            let reference = tables.library().get(table.reference_index());
            for position in 0..table.len() {
                let Some(from_code) = base_index(reference.bases()[position]) else {
                    continue;
                };
                for to_code in 0..4 {
                    if to_code == from_code {
                        continue;
                    }
                    let cell = table.cell(position, to_code);
                    if cell.major_migs == 0 {
                        continue;
                    }
                    let fit = model.fit_for(table.reference_index(), position, from_code, to_code);
                    let score = fit
                        .upper_tail(cell.major_migs, cell.coverage_migs)
                        .map(phred_score);

                    let mut variant = Variant {
                        reference_index: table.reference_index(),
                        position,
                        from: reference.bases()[position],
                        to: BASES[to_code],
                        major_migs: cell.major_migs,
                        coverage_migs: cell.coverage_migs,
                        major_reads: cell.major_reads,
                        coverage_reads: cell.coverage_reads,
                        minor_migs: cell.minor_migs,
                        frequency: cell.major_migs as f64 / cell.coverage_migs as f64,
                        background: fit.mean().unwrap_or(0.0),
                        score,
                        summary: FilterSummary::default(),
                        verdict: CallVerdict::Failed,
                    };
                    for filter in &self.filters {
                        let passed = filter.passes(&variant);
                        variant.summary.record(filter.name(), passed);
                    }
                    variant.verdict = if variant.score.is_none() {
                        CallVerdict::Untestable
                    } else if variant.summary.all_passed() {
                        CallVerdict::Passed
                    } else {
                        CallVerdict::Failed
                    };
                    variants.push(variant);
                }
            }
        }
        variants
    }
}
