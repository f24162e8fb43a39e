//! End-to-end orchestration from grouped reads to called variants.
//!
//! Groups are assembled, mapped, and counted concurrently on a rayon
//! pool. Each group draws its tie-breaking RNG from the run seed plus
//! the group's input index, so a seeded run produces the same output
//! at any thread count. Counts land in the shared tables through
//! atomic adds, and model fitting plus variant calling run serially
//! once the pool drains.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::aligner::{AlignerOptions, AlignmentOutcome, ConsensusAligner};
use crate::assemble::{Assembler, AssemblerOptions, ConsensusOutcome};
use crate::errors::{Result, UmivarError};
use crate::genomic::{PanelEntry, ReferenceLibrary};
use crate::index::{KmerIndex, DEFAULT_K};
use crate::mig::Mig;
use crate::model::{ErrorModel, ErrorModelOptions};
use crate::table::MutationsTableSet;
use crate::variant::{Variant, VariantCaller, VariantCallerOptions};

/// Tunables for every stage of a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// K-mer size for the reference mapper.
    pub k: usize,
    /// Consensus assembly thresholds.
    pub assembler: AssemblerOptions,
    /// Mapping and alignment thresholds.
    pub aligner: AlignerOptions,
    /// Error model fitting controls.
    pub model: ErrorModelOptions,
    /// Variant calling thresholds.
    pub caller: VariantCallerOptions,
    /// Worker threads for group processing. Zero means one per core.
    pub threads: usize,
    /// Seed for reproducible runs. `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            assembler: AssemblerOptions::default(),
            aligner: AlignerOptions::default(),
            model: ErrorModelOptions::default(),
            caller: VariantCallerOptions::default(),
            threads: 0,
            seed: None,
        }
    }
}

/// Counters accumulated across one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Groups presented to the assembler.
    pub groups_in: u64,
    /// Raw reads (or read pairs) across all input groups.
    pub reads_in: u64,
    /// Groups that produced a consensus.
    pub groups_assembled: u64,
    /// Groups dropped for having too few usable reads.
    pub groups_dropped_low_depth: u64,
    /// Consensus streams emitted, two per assembled pair.
    pub consensuses: u64,
    /// Consensus streams that aligned to a reference.
    pub consensuses_aligned: u64,
    /// Consensus streams with no k-mer hit.
    pub consensuses_no_hit: u64,
    /// Consensus streams rejected for low alignment identity.
    pub consensuses_low_similarity: u64,
    /// Reads that made it into an assembled consensus.
    pub reads_assembled: u64,
}

/// Why a group or consensus left the pipeline early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Too few reads survived the assembler's quality gate.
    LowDepth,
    /// The k-mer mapper found no candidate reference.
    NoHit,
    /// The best alignment fell below the identity threshold.
    LowSimilarity,
}

impl DropReason {
    /// Short stable code used in logs.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            DropReason::LowDepth => "low-depth",
            DropReason::NoHit => "no-hit",
            DropReason::LowSimilarity => "low-similarity",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Everything one run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Per-group consensuses in input order, aligned or not.
    pub consensuses: Vec<ConsensusOutcome>,
    /// Aggregated mutation counts per forward reference.
    pub tables: MutationsTableSet,
    /// Candidate variants with their verdicts, in report order.
    pub variants: Vec<Variant>,
    /// Run counters.
    pub stats: PipelineStats,
}

/// RNG for one group, derived from the run seed and the group's input
/// index. Unseeded runs draw from the OS instead.
#[must_use]
pub fn group_rng(seed: Option<u64>, group_index: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(group_index as u64)),
        None => StdRng::from_os_rng(),
    }
}

#[derive(Default)]
struct StatsCounters {
    groups_in: AtomicU64,
    reads_in: AtomicU64,
    groups_assembled: AtomicU64,
    groups_dropped_low_depth: AtomicU64,
    consensuses: AtomicU64,
    consensuses_aligned: AtomicU64,
    consensuses_no_hit: AtomicU64,
    consensuses_low_similarity: AtomicU64,
    reads_assembled: AtomicU64,
}

impl StatsCounters {
    fn record_drop(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::LowDepth => &self.groups_dropped_low_depth,
            DropReason::NoHit => &self.consensuses_no_hit,
            DropReason::LowSimilarity => &self.consensuses_low_similarity,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            groups_in: self.groups_in.load(Ordering::Relaxed),
            reads_in: self.reads_in.load(Ordering::Relaxed),
            groups_assembled: self.groups_assembled.load(Ordering::Relaxed),
            groups_dropped_low_depth: self.groups_dropped_low_depth.load(Ordering::Relaxed),
            consensuses: self.consensuses.load(Ordering::Relaxed),
            consensuses_aligned: self.consensuses_aligned.load(Ordering::Relaxed),
            consensuses_no_hit: self.consensuses_no_hit.load(Ordering::Relaxed),
            consensuses_low_similarity: self.consensuses_low_similarity.load(Ordering::Relaxed),
            reads_assembled: self.reads_assembled.load(Ordering::Relaxed),
        }
    }
}

/// The assembled pipeline: a shared k-mer index plus per-stage options.
pub struct Pipeline {
    index: Arc<KmerIndex>,
    options: PipelineOptions,
}

impl Pipeline {
    /// Validates the panel and builds the k-mer index over it.
    ///
    /// # Errors
    ///
    /// Library validation and index construction errors pass through
    /// unchanged.
    pub fn new(panel: Vec<PanelEntry>, options: PipelineOptions) -> Result<Self> {
        let library = ReferenceLibrary::new(panel)?;
        let index = Arc::new(KmerIndex::build(&library, options.k)?);
        Ok(Self { index, options })
    }

    /// The reference library the pipeline was built over.
    #[must_use]
    pub fn library(&self) -> &ReferenceLibrary {
        self.index.library()
    }

    /// Runs every stage over the given groups.
    ///
    /// Tables and variants depend only on the set of inputs, not on
    /// processing order. Consensuses come back in input order
    /// regardless of which worker produced them.
    ///
    /// # Errors
    ///
    /// [`UmivarError::CapabilityNotSupported`] when dropped-read
    /// backalignment is requested for paired input;
    /// [`UmivarError::InvalidParameter`] when the thread pool cannot
    /// be built.
    pub fn run(&self, migs: &[Mig]) -> Result<PipelineOutput> {
        if self.options.aligner.backalign_dropped && migs.iter().any(Mig::is_paired) {
            return Err(UmivarError::CapabilityNotSupported {
                capability: "dropped-read backalignment for paired input".to_string(),
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.threads)
            .build()
            .map_err(|e| UmivarError::InvalidParameter {
                parameter: "threads".to_string(),
                reason: e.to_string(),
            })?;

        let assembler = Assembler::new(self.options.assembler.clone());
        let aligner = ConsensusAligner::new(Arc::clone(&self.index), self.options.aligner.clone());
        let tables = MutationsTableSet::new(self.index.library());
        let counters = StatsCounters::default();
        let collected: Mutex<Vec<(usize, ConsensusOutcome)>> = Mutex::new(Vec::new());
        let failure: Mutex<Option<UmivarError>> = Mutex::new(None);
        let seed = self.options.seed;

        pool.install(|| {
            migs.par_iter().enumerate().for_each(|(group_index, mig)| {
                counters.groups_in.fetch_add(1, Ordering::Relaxed);
                counters.reads_in.fetch_add(mig.size() as u64, Ordering::Relaxed);

                let mut rng = group_rng(seed, group_index);
                let Some(outcome) = assembler.assemble(mig, &mut rng) else {
                    counters.record_drop(DropReason::LowDepth);
                    debug!("group {} dropped: {}", mig.umi_string(), DropReason::LowDepth);
                    return;
                };
                counters.groups_assembled.fetch_add(1, Ordering::Relaxed);
                let assembled = match &outcome {
                    ConsensusOutcome::Single(consensus) => consensus.assembled_size(),
                    ConsensusOutcome::Paired(r1, _) => r1.assembled_size(),
                } as u64;
                counters.reads_assembled.fetch_add(assembled, Ordering::Relaxed);

                match aligner.align_group(&outcome) {
                    Ok(results) => {
                        for result in &results {
                            counters.consensuses.fetch_add(1, Ordering::Relaxed);
                            match result {
                                AlignmentOutcome::Aligned(aligned) => {
                                    counters.consensuses_aligned.fetch_add(1, Ordering::Relaxed);
                                    tables.record(aligned);
                                }
                                AlignmentOutcome::NoHit => {
                                    counters.record_drop(DropReason::NoHit);
                                    debug!(
                                        "consensus {} dropped: {}",
                                        mig.umi_string(),
                                        DropReason::NoHit
                                    );
                                }
                                AlignmentOutcome::LowSimilarity { identity } => {
                                    counters.record_drop(DropReason::LowSimilarity);
                                    debug!(
                                        "consensus {} dropped: {} (identity {:.3})",
                                        mig.umi_string(),
                                        DropReason::LowSimilarity,
                                        identity
                                    );
                                }
                            }
                        }
                    }
                    Err(error) => {
                        let mut slot = failure.lock();
                        if slot.is_none() {
                            *slot = Some(error);
                        }
                    }
                }

                collected.lock().push((group_index, outcome));
            });
        });

        if let Some(error) = failure.into_inner() {
            return Err(error);
        }

        let mut collected = collected.into_inner();
        collected.sort_unstable_by_key(|(group_index, _)| *group_index);
        let consensuses: Vec<ConsensusOutcome> =
            collected.into_iter().map(|(_, outcome)| outcome).collect();

        let model = ErrorModel::fit(&tables, &self.options.model);
        let caller = VariantCaller::new(&self.options.caller);
        let variants = caller.call(&tables, &model);

        let stats = counters.snapshot();
        info!(
            "run complete: {}/{} groups assembled, {} aligned, {} candidate variants",
            stats.groups_assembled,
            stats.groups_in,
            stats.consensuses_aligned,
            variants.len()
        );

        Ok(PipelineOutput { consensuses, tables, variants, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::base_index;
    use crate::mig::SeqRead;
    use crate::variant::CallVerdict;
    use rand::Rng;

    const REF: &[u8] = b"TTGCAGGAACCTGTCAGATACGGTAAGCTCGAATCCGTCTTGAAGCACCGGATTACGCAT";

    fn panel() -> Vec<PanelEntry> {
        vec![PanelEntry::new("amplicon", REF)]
    }

    fn seeded_options() -> PipelineOptions {
        PipelineOptions { seed: Some(7), threads: 1, ..PipelineOptions::default() }
    }

    fn uniform_mig(umi: &[u8], bases: &[u8], copies: usize) -> Mig {
        let reads = (0..copies).map(|_| SeqRead::with_uniform_quality(bases, 40)).collect();
        Mig::single(umi, reads)
    }

    #[test]
    fn test_clean_groups_align_and_count() {
        let pipeline = Pipeline::new(panel(), seeded_options()).unwrap();
        let migs = vec![
            uniform_mig(b"AAAA", REF, 3),
            uniform_mig(b"CCCC", REF, 3),
            uniform_mig(b"GGGG", REF, 3),
            uniform_mig(b"TTTT", REF, 3),
        ];
        let output = pipeline.run(&migs).unwrap();

        let expected = PipelineStats {
            groups_in: 4,
            reads_in: 12,
            groups_assembled: 4,
            groups_dropped_low_depth: 0,
            consensuses: 4,
            consensuses_aligned: 4,
            consensuses_no_hit: 0,
            consensuses_low_similarity: 0,
            reads_assembled: 12,
        };
        assert_eq!(output.stats, expected);

        assert_eq!(output.consensuses.len(), 4);
        let ConsensusOutcome::Single(first) = &output.consensuses[0] else {
            panic!("expected single-stream consensus")
        };
        assert_eq!(first.umi(), b"AAAA");
        assert_eq!(first.bases(), REF);

        let table = output.tables.get(0).unwrap();
        assert_eq!(table.coverage(0), (12, 4));
        assert_eq!(table.coverage(REF.len() - 1), (12, 4));
        assert!(output.variants.is_empty());
    }

    #[test]
    fn test_major_substitution_reported_untestable_without_background() {
        let pipeline = Pipeline::new(panel(), seeded_options()).unwrap();
        let mut mutated = REF.to_vec();
        mutated[20] = b'T';
        let migs = vec![
            uniform_mig(b"AAAA", REF, 3),
            uniform_mig(b"CCCC", &mutated, 3),
            uniform_mig(b"GGGG", REF, 3),
            uniform_mig(b"TTTT", &mutated, 3),
        ];
        let output = pipeline.run(&migs).unwrap();

        assert_eq!(output.variants.len(), 1);
        let variant = &output.variants[0];
        assert_eq!(variant.reference_index, 0);
        assert_eq!(variant.position, 20);
        assert_eq!(variant.from, b'C');
        assert_eq!(variant.to, b'T');
        assert_eq!(variant.major_migs, 2);
        assert_eq!(variant.coverage_migs, 4);
        assert_eq!(variant.major_reads, 6);
        assert_eq!(variant.coverage_reads, 12);
        assert!(variant.score.is_none());
        assert_eq!(variant.verdict, CallVerdict::Untestable);
    }

    #[test]
    fn test_seeded_runs_match_across_thread_counts() {
        // Column 7 carries N in every read, so its consensus base is the
        // group RNG's masked placeholder draw.
        const UMIS: [&[u8]; 6] = [b"AACC", b"ACCA", b"CAAC", b"CCAA", b"GAAC", b"GCCA"];
        let mut ambiguous = REF.to_vec();
        ambiguous[7] = b'N';
        let migs: Vec<Mig> = UMIS
            .iter()
            .map(|umi| {
                Mig::single(
                    umi,
                    vec![
                        SeqRead::with_uniform_quality(&ambiguous, 40),
                        SeqRead::with_uniform_quality(&ambiguous, 40),
                    ],
                )
            })
            .collect();

        let single_options =
            PipelineOptions { seed: Some(42), threads: 1, ..PipelineOptions::default() };
        let multi_options =
            PipelineOptions { seed: Some(42), threads: 4, ..PipelineOptions::default() };
        let single = Pipeline::new(panel(), single_options).unwrap().run(&migs).unwrap();
        let multi = Pipeline::new(panel(), multi_options).unwrap().run(&migs).unwrap();

        assert_eq!(single.consensuses, multi.consensuses);
        assert_eq!(single.stats, multi.stats);
        let code = base_index(b'A').unwrap();
        let cell_single = single.tables.get(0).unwrap().cell(7, code);
        let cell_multi = multi.tables.get(0).unwrap().cell(7, code);
        assert_eq!(cell_single, cell_multi);
        assert_eq!(single.variants.len(), multi.variants.len());
    }

    #[test]
    fn test_tables_and_variants_ignore_input_order() {
        let pipeline = Pipeline::new(panel(), seeded_options()).unwrap();
        let mut mutated = REF.to_vec();
        mutated[20] = b'T';
        let migs = vec![
            uniform_mig(b"AAAA", REF, 3),
            uniform_mig(b"CCCC", &mutated, 2),
            uniform_mig(b"GGGG", REF, 4),
        ];
        let mut reversed = migs.clone();
        reversed.reverse();

        let forward = pipeline.run(&migs).unwrap();
        let backward = pipeline.run(&reversed).unwrap();

        let code = base_index(b'T').unwrap();
        let cell_forward = forward.tables.get(0).unwrap().cell(20, code);
        let cell_backward = backward.tables.get(0).unwrap().cell(20, code);
        assert_eq!(cell_forward, cell_backward);
        assert_eq!(cell_forward.major_migs, 1);
        assert_eq!(cell_forward.major_reads, 2);
        assert_eq!(cell_forward.coverage_migs, 3);
        assert_eq!(forward.variants.len(), backward.variants.len());
        assert_eq!(forward.variants[0].position, backward.variants[0].position);

        let flipped: Vec<ConsensusOutcome> =
            backward.consensuses.iter().rev().cloned().collect();
        assert_eq!(forward.consensuses, flipped);
    }

    #[test]
    fn test_drop_reasons_are_counted_per_stage() {
        let options = PipelineOptions {
            assembler: AssemblerOptions { min_reads: 2, ..AssemblerOptions::default() },
            ..seeded_options()
        };
        let pipeline = Pipeline::new(panel(), options).unwrap();

        // Intact 12-base head keeps the mapper happy while every fourth
        // base after it is mutated, pushing identity below the gate.
        let mut scrambled = REF.to_vec();
        let mut position = 12;
        while position < scrambled.len() {
            scrambled[position] = match scrambled[position] {
                b'A' => b'C',
                b'C' => b'G',
                b'G' => b'T',
                _ => b'A',
            };
            position += 4;
        }
        let migs = vec![
            uniform_mig(b"AAAA", REF, 1),
            uniform_mig(b"CCCC", b"TTTTTTTTTTTTTTTTTTTTTTTT", 3),
            uniform_mig(b"GGGG", &scrambled, 3),
            uniform_mig(b"TTTT", REF, 3),
        ];
        let output = pipeline.run(&migs).unwrap();

        assert_eq!(output.stats.groups_in, 4);
        assert_eq!(output.stats.groups_dropped_low_depth, 1);
        assert_eq!(output.stats.groups_assembled, 3);
        assert_eq!(output.stats.consensuses, 3);
        assert_eq!(output.stats.consensuses_no_hit, 1);
        assert_eq!(output.stats.consensuses_low_similarity, 1);
        assert_eq!(output.stats.consensuses_aligned, 1);
        assert_eq!(output.stats.reads_assembled, 9);
        assert_eq!(output.consensuses.len(), 3);
    }

    #[test]
    fn test_backalign_rejected_for_paired_groups() {
        let options = PipelineOptions {
            aligner: AlignerOptions { backalign_dropped: true, ..AlignerOptions::default() },
            ..seeded_options()
        };
        let pipeline = Pipeline::new(panel(), options).unwrap();
        let pairs = vec![(
            SeqRead::with_uniform_quality(&REF[..35], 40),
            SeqRead::with_uniform_quality(&REF[25..], 40),
        )];
        let migs = vec![Mig::paired(b"AAAA", pairs)];

        let error = pipeline.run(&migs).unwrap_err();
        assert!(matches!(error, UmivarError::CapabilityNotSupported { .. }));
    }

    #[test]
    fn test_paired_group_produces_two_aligned_streams() {
        let pipeline = Pipeline::new(panel(), seeded_options()).unwrap();
        let pairs = (0..3)
            .map(|_| {
                (
                    SeqRead::with_uniform_quality(&REF[..35], 40),
                    SeqRead::with_uniform_quality(&REF[25..], 40),
                )
            })
            .collect();
        let migs = vec![Mig::paired(b"ACGT", pairs)];
        let output = pipeline.run(&migs).unwrap();

        assert_eq!(output.stats.groups_in, 1);
        assert_eq!(output.stats.reads_in, 3);
        assert_eq!(output.stats.groups_assembled, 1);
        assert_eq!(output.stats.consensuses, 2);
        assert_eq!(output.stats.consensuses_aligned, 2);
        assert!(matches!(output.consensuses[0], ConsensusOutcome::Paired(_, _)));

        // Only R1 covers the head, only R2 the tail, both the overlap.
        let table = output.tables.get(0).unwrap();
        assert_eq!(table.coverage(5), (3, 1));
        assert_eq!(table.coverage(30), (6, 2));
        assert_eq!(table.coverage(50), (3, 1));
    }

    #[test]
    fn test_empty_run_is_empty() {
        let pipeline = Pipeline::new(panel(), seeded_options()).unwrap();
        let output = pipeline.run(&[]).unwrap();

        assert_eq!(output.stats, PipelineStats::default());
        assert!(output.consensuses.is_empty());
        assert!(output.variants.is_empty());
    }

    #[test]
    fn test_group_rng_is_reproducible_when_seeded() {
        let mut first = group_rng(Some(9), 3);
        let mut second = group_rng(Some(9), 3);
        let draws_first: Vec<u64> = (0..4).map(|_| first.random::<u64>()).collect();
        let draws_second: Vec<u64> = (0..4).map(|_| second.random::<u64>()).collect();
        assert_eq!(draws_first, draws_second);

        let mut other_group = group_rng(Some(9), 4);
        assert_ne!(draws_first[0], other_group.random::<u64>());

        let mut unseeded = group_rng(None, 0);
        let _ = unseeded.random::<u64>();
    }

    #[test]
    fn test_drop_reason_codes() {
        assert_eq!(DropReason::LowDepth.code(), "low-depth");
        assert_eq!(DropReason::NoHit.code(), "no-hit");
        assert_eq!(DropReason::LowSimilarity.code(), "low-similarity");
        assert_eq!(DropReason::NoHit.to_string(), "no-hit");
    }
}
