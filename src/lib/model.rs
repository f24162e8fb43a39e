//! Background error model fitted from minor mutation counts.
//!
//! Within-group noise observed as minor mutations gives an empirical
//! null distribution for each substitution class (or each position). A
//! beta-binomial is fitted to the per-cell minor frequencies by method
//! of moments; variant candidates are then scored by the probability
//! that pure noise would reach their major count at the observed depth.
//!
//! Cells that were ever called major are excluded from fitting: they
//! carry signal, not background.

use clap::ValueEnum;
use statrs::function::beta::ln_beta;
use statrs::function::factorial::ln_binomial;

use crate::dna::base_index;
use crate::table::MutationsTableSet;

/// How fitting pools the table's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ErrorModelMode {
    /// One fit per ordered substitution class, pooled over all references.
    #[default]
    SubstitutionType,
    /// One fit per reference position, pooled over its three alternatives.
    Position,
}

/// Options controlling the fit.
#[derive(Debug, Clone)]
pub struct ErrorModelOptions {
    pub mode: ErrorModelMode,
    /// Cells with lower group coverage contribute no sample.
    pub min_model_coverage: u64,
}

impl Default for ErrorModelOptions {
    fn default() -> Self {
        Self { mode: ErrorModelMode::SubstitutionType, min_model_coverage: 10 }
    }
}

/// The fit for one pool of cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelFit {
    /// A proper beta-binomial null.
    BetaBinomial { alpha: f64, beta: f64, mean: f64, variance: f64, samples: usize },
    /// Not enough spread to fit; affected variants become untestable.
    Degenerate { samples: usize },
}

impl ModelFit {
    /// Mean background minor frequency, when fitted.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        match self {
            ModelFit::BetaBinomial { mean, .. } => Some(*mean),
            ModelFit::Degenerate { .. } => None,
        }
    }

    /// Number of cells that contributed to the fit.
    #[must_use]
    pub fn samples(&self) -> usize {
        match self {
            ModelFit::BetaBinomial { samples, .. } | ModelFit::Degenerate { samples } => *samples,
        }
    }

    /// Upper-tail probability of seeing at least `count` majors out of
    /// `depth` groups under the null. `None` when degenerate.
    #[must_use]
    pub fn upper_tail(&self, count: u64, depth: u64) -> Option<f64> {
        match self {
            ModelFit::BetaBinomial { alpha, beta, .. } => {
                Some(beta_binomial_upper_tail(count, depth, *alpha, *beta))
            }
            ModelFit::Degenerate { .. } => None,
        }
    }
}

/// `P(X >= count)` for `X ~ BetaBinomial(depth, alpha, beta)`.
///
/// Summed in log space against the largest term so deep tails at high
/// depth stay finite.
#[must_use]
pub fn beta_binomial_upper_tail(count: u64, depth: u64, alpha: f64, beta: f64) -> f64 {
    if count == 0 {
        return 1.0;
    }
    if count > depth {
        return f64::MIN_POSITIVE;
    }
    let denominator = ln_beta(alpha, beta);
    let ln_terms: Vec<f64> = (count..=depth)
        .map(|k| {
            ln_binomial(depth, k)
                + ln_beta(k as f64 + alpha, (depth - k) as f64 + beta)
                - denominator
        })
        .collect();
    let max_term = ln_terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max_term.is_finite() {
        return f64::MIN_POSITIVE;
    }
    let sum: f64 = ln_terms.iter().map(|term| (term - max_term).exp()).sum();
    (max_term.exp() * sum).clamp(f64::MIN_POSITIVE, 1.0)
}

/// Phred-like score for an upper-tail probability.
#[must_use]
pub fn phred_score(p: f64) -> f64 {
    -10.0 * p.clamp(f64::MIN_POSITIVE, 1.0).log10()
}

/// Method-of-moments beta-binomial fit over frequency samples.
fn fit_samples(samples: &[f64]) -> ModelFit {
    let count = samples.len();
    if count < 2 {
        return ModelFit::Degenerate { samples: count };
    }
    let mean = samples.iter().sum::<f64>() / count as f64;
    let variance =
        samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (count - 1) as f64;
    if variance <= 0.0 || mean <= 0.0 || mean >= 1.0 {
        return ModelFit::Degenerate { samples: count };
    }
    let concentration = mean * (1.0 - mean) / variance - 1.0;
    if concentration <= 0.0 {
        return ModelFit::Degenerate { samples: count };
    }
    ModelFit::BetaBinomial {
        alpha: mean * concentration,
        beta: (1.0 - mean) * concentration,
        mean,
        variance,
        samples: count,
    }
}

enum FitStore {
    BySubstitution(Box<[ModelFit; 16]>),
    ByPosition(ahash::AHashMap<(usize, usize), ModelFit>),
}

/// The fitted null model for a finished table set.
pub struct ErrorModel {
    store: FitStore,
    min_model_coverage: u64,
}

impl ErrorModel {
    /// Fits the model from quiesced tables.
    #[must_use]
    pub fn fit(tables: &MutationsTableSet, options: &ErrorModelOptions) -> Self {
        let store = match options.mode {
            ErrorModelMode::SubstitutionType => {
                let mut pools: [Vec<f64>; 16] = Default::default();
                for_each_background_cell(tables, options.min_model_coverage, |_, _, from, to, frequency| {
                    pools[from * 4 + to].push(frequency);
                });
                let mut fits = [ModelFit::Degenerate { samples: 0 }; 16];
                for (slot, pool) in pools.iter().enumerate() {
                    fits[slot] = fit_samples(pool);
                }
                FitStore::BySubstitution(Box::new(fits))
            }
            ErrorModelMode::Position => {
                let mut pools: ahash::AHashMap<(usize, usize), Vec<f64>> = ahash::AHashMap::new();
                for_each_background_cell(
                    tables,
                    options.min_model_coverage,
                    |reference, position, _, _, frequency| {
                        pools.entry((reference, position)).or_default().push(frequency);
                    },
                );
                let fits = pools.into_iter().map(|(key, pool)| (key, fit_samples(&pool))).collect();
                FitStore::ByPosition(fits)
            }
        };
        Self { store, min_model_coverage: options.min_model_coverage }
    }

    /// Coverage bound used during fitting.
    #[must_use]
    pub fn min_model_coverage(&self) -> u64 {
        self.min_model_coverage
    }

    /// The fit governing a candidate cell.
    #[must_use]
    pub fn fit_for(
        &self,
        reference_index: usize,
        position: usize,
        from_code: usize,
        to_code: usize,
    ) -> ModelFit {
        match &self.store {
            FitStore::BySubstitution(fits) => fits[from_code * 4 + to_code],
            FitStore::ByPosition(fits) => fits
                .get(&(reference_index, position))
                .copied()
                .unwrap_or(ModelFit::Degenerate { samples: 0 }),
        }
    }
}

/// Visits every never-major cell with adequate coverage, yielding its
/// minor frequency.
fn for_each_background_cell(
    tables: &MutationsTableSet,
    min_coverage: u64,
    mut visit: impl FnMut(usize, usize, usize, usize, f64),
) {
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
                if cell.major_migs > 0 || cell.coverage_migs < min_coverage {
                    continue;
                }
                let frequency = cell.minor_migs as f64 / cell.coverage_migs as f64;
                visit(table.reference_index(), position, from_code, to_code, frequency);
            }
        }
    }
}
