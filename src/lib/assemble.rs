//! Per-UMI consensus assembly.
//!
//! Reads sharing a UMI are collapsed column by column into one consensus
//! per stream. Reads failing a mean-quality gate sit out the vote (they
//! remain available for optional back-alignment); within a column only
//! bases at or above the good-quality threshold vote. The winning base is
//! the most frequent good base, ties resolved to the lowest base code, and
//! every losing base that clears the noise threshold is recorded as a
//! minor site for the downstream error model.
//!
//! Assembly failure is an absent result, never an error: callers count a
//! `None` and move on.

use rand::Rng;

use crate::dna::{base_index, complement_base, reverse_complement, BASES};
use crate::mig::{Mig, MigReads, SeqRead};
use crate::phred::{agreement_to_qual, mean_quality, PhredScore};

/// Options controlling consensus assembly.
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Reads with mean quality below this do not vote.
    pub min_read_quality: f64,
    /// Per-base quality at or above this counts as a good observation.
    pub good_quality_threshold: PhredScore,
    /// Minimum reads surviving the quality gate; fewer aborts assembly.
    pub min_reads: usize,
    /// A losing base becomes a minor site when its share of the column's
    /// good observations exceeds this fraction.
    pub minor_frequency_threshold: f64,
    /// Columns with an agreement byte below this are masked bad.
    pub consensus_quality_threshold: PhredScore,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            min_read_quality: 20.0,
            good_quality_threshold: 25,
            min_reads: 1,
            minor_frequency_threshold: 0.0,
            consensus_quality_threshold: 20,
        }
    }
}

/// A within-group disagreement observation at one consensus column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinorSite {
    /// 0-based consensus column.
    pub column: usize,
    /// The disagreeing base.
    pub base: u8,
    /// Number of good-quality reads carrying it.
    pub reads: usize,
}

/// The consensus of one read stream of a MIG.
///
/// Either fully present or never constructed: the assembler returns
/// `None` rather than a partial consensus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consensus {
    umi: Vec<u8>,
    bases: Vec<u8>,
    quals: Vec<PhredScore>,
    mask: Vec<bool>,
    minors: Vec<MinorSite>,
    dropped_reads: Vec<SeqRead>,
    assembled_size: usize,
    true_size: usize,
}

impl Consensus {
    /// Assembles the parts of a consensus; lengths must agree.
    ///
    /// Exposed so collaborators (and tests) can construct a consensus
    /// without running the assembler.
    ///
    /// # Panics
    ///
    /// When `quals` or `mask` length differs from `bases`.
    #[must_use]
    pub fn new(
        umi: Vec<u8>,
        bases: Vec<u8>,
        quals: Vec<PhredScore>,
        mask: Vec<bool>,
        minors: Vec<MinorSite>,
        assembled_size: usize,
        true_size: usize,
    ) -> Self {
        assert_eq!(bases.len(), quals.len());
        assert_eq!(bases.len(), mask.len());
        Self { umi, bases, quals, mask, minors, dropped_reads: Vec::new(), assembled_size, true_size }
    }

    /// The group's UMI.
    #[must_use]
    pub fn umi(&self) -> &[u8] {
        &self.umi
    }

    /// Assembled sequence.
    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// Per-column agreement quality bytes (0-40 scale).
    #[must_use]
    pub fn quals(&self) -> &[PhredScore] {
        &self.quals
    }

    /// Consensus length in columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// True for a zero-length consensus.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// True when the column was marked low-confidence.
    #[must_use]
    pub fn is_masked(&self, column: usize) -> bool {
        self.mask[column]
    }

    /// The full quality mask, one flag per column (true = bad).
    #[must_use]
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Minor sites recorded during the column vote, ascending by column.
    #[must_use]
    pub fn minors(&self) -> &[MinorSite] {
        &self.minors
    }

    /// Reads excluded by the mean-quality gate, kept for back-alignment.
    #[must_use]
    pub fn dropped_reads(&self) -> &[SeqRead] {
        &self.dropped_reads
    }

    /// Reads that voted.
    #[must_use]
    pub fn assembled_size(&self) -> usize {
        self.assembled_size
    }

    /// Total reads in the group's stream.
    #[must_use]
    pub fn true_size(&self) -> usize {
        self.true_size
    }

    /// Appends minor sites recovered outside the column vote.
    pub fn extend_minors(&mut self, extra: impl IntoIterator<Item = MinorSite>) {
        self.minors.extend(extra);
        self.minors.sort_by_key(|site| (site.column, site.base));
    }

    /// The consensus flipped to the opposite strand.
    ///
    /// Bases are reverse complemented; qualities, the mask, and minor
    /// sites follow their columns; minor bases are complemented.
    #[must_use]
    pub fn reverse_complement(&self) -> Consensus {
        let len = self.len();
        let mut minors: Vec<MinorSite> = self
            .minors
            .iter()
            .map(|site| MinorSite {
                column: len - 1 - site.column,
                base: complement_base(site.base),
                reads: site.reads,
            })
            .collect();
        minors.sort_by_key(|site| (site.column, site.base));

        Consensus {
            umi: self.umi.clone(),
            bases: reverse_complement(&self.bases),
            quals: self.quals.iter().rev().copied().collect(),
            mask: self.mask.iter().rev().copied().collect(),
            minors,
            dropped_reads: self.dropped_reads.clone(),
            assembled_size: self.assembled_size,
            true_size: self.true_size,
        }
    }
}

/// Assembly result for a whole group: one consensus per read stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusOutcome {
    /// Single-end group.
    Single(Consensus),
    /// Paired-end group, first and second stream.
    Paired(Consensus, Consensus),
}

impl ConsensusOutcome {
    /// The consensuses in stream order.
    #[must_use]
    pub fn streams(&self) -> Vec<&Consensus> {
        match self {
            ConsensusOutcome::Single(consensus) => vec![consensus],
            ConsensusOutcome::Paired(first, second) => vec![first, second],
        }
    }
}

/// Quality-aware consensus assembler.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    options: AssemblerOptions,
}

impl Assembler {
    /// Creates an assembler with the given options.
    #[must_use]
    pub fn new(options: AssemblerOptions) -> Self {
        Self { options }
    }

    /// The options in force.
    #[must_use]
    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Assembles a group into one consensus per stream.
    ///
    /// Returns `None` when any stream fails the depth gate after quality
    /// filtering. The RNG is consumed only for columns with zero good
    /// observations, which take a synthetic masked base; callers seed it
    /// per group for reproducible runs.
    pub fn assemble(&self, mig: &Mig, rng: &mut impl Rng) -> Option<ConsensusOutcome> {
        if mig.size() == 0 {
            return None;
        }
        match mig.reads() {
            MigReads::Single(reads) => {
                let refs: Vec<&SeqRead> = reads.iter().collect();
                let consensus = self.assemble_stream(mig.umi(), &refs, rng)?;
                Some(ConsensusOutcome::Single(consensus))
            }
            MigReads::Paired(pairs) => {
                let first: Vec<&SeqRead> = pairs.iter().map(|(a, _)| a).collect();
                let second: Vec<&SeqRead> = pairs.iter().map(|(_, b)| b).collect();
                let first = self.assemble_stream(mig.umi(), &first, rng)?;
                let second = self.assemble_stream(mig.umi(), &second, rng)?;
                Some(ConsensusOutcome::Paired(first, second))
            }
        }
    }

    /// Column-vote core shared by both layouts.
    fn assemble_stream(
        &self,
        umi: &[u8],
        reads: &[&SeqRead],
        rng: &mut impl Rng,
    ) -> Option<Consensus> {
        let true_size = reads.len();
        let mut kept: Vec<&SeqRead> = Vec::with_capacity(reads.len());
        let mut dropped_reads: Vec<SeqRead> = Vec::new();
        for &read in reads {
            if !read.is_empty() && mean_quality(read.quals()) >= self.options.min_read_quality {
                kept.push(read);
            } else {
                dropped_reads.push(read.clone());
            }
        }

        if kept.is_empty() || kept.len() < self.options.min_reads {
            return None;
        }
        let width = kept.iter().map(|r| r.len()).max().unwrap_or(0);
        if width == 0 {
            return None;
        }

        let mut bases = Vec::with_capacity(width);
        let mut quals = Vec::with_capacity(width);
        let mut mask = Vec::with_capacity(width);
        let mut minors = Vec::new();

        for column in 0..width {
            let mut counts = [0usize; 4];
            for read in &kept {
                if column >= read.len() {
                    continue;
                }
                if read.quals()[column] < self.options.good_quality_threshold {
                    continue;
                }
                if let Some(code) = base_index(read.bases()[column]) {
                    counts[code] += 1;
                }
            }
            let total_good: usize = counts.iter().sum();

            if total_good == 0 {
                // No usable evidence: synthesize a masked placeholder base.
                bases.push(BASES[rng.random_range(0..4)]);
                quals.push(0);
                mask.push(true);
                continue;
            }

            let mut winner = 0usize;
            for code in 1..4 {
                if counts[code] > counts[winner] {
                    winner = code;
                }
            }

            let qual = agreement_to_qual(counts[winner], total_good);
            bases.push(BASES[winner]);
            quals.push(qual);
            mask.push(qual < self.options.consensus_quality_threshold);

            for code in 0..4 {
                if code == winner || counts[code] == 0 {
                    continue;
                }
                let frequency = counts[code] as f64 / total_good as f64;
                if frequency > self.options.minor_frequency_threshold {
                    minors.push(MinorSite { column, base: BASES[code], reads: counts[code] });
                }
            }
        }

        let assembled_size = kept.len();
        let mut consensus =
            Consensus::new(umi.to_vec(), bases, quals, mask, minors, assembled_size, true_size);
        consensus.dropped_reads = dropped_reads;
        Some(consensus)
    }
}
