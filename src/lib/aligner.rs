//! Reference mapping and mutation extraction for assembled consensuses.
//!
//! A consensus is mapped with the k-mer index, normalized to the forward
//! strand when the hit is a reverse-complement entry, then locally aligned
//! against the winning reference with affine gap costs. The edit script
//! becomes a [`MutationArray`] of major mutations in reference coordinates;
//! minor sites recorded during assembly are mapped through the same
//! alignment into minor mutations. Major and minor sets stay disjoint per
//! position for one consensus.

use std::sync::Arc;

use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;

use crate::assemble::{Consensus, ConsensusOutcome, MinorSite};
use crate::dna::base_index;
use crate::errors::{Result, UmivarError};
use crate::index::{KmerIndex, KmerMapResult};
use crate::mutations::{Mutation, MutationArray};

/// Options controlling mapping acceptance and alignment scoring.
#[derive(Debug, Clone)]
pub struct AlignerOptions {
    /// Alignments with a lower match fraction are rejected.
    pub min_identity: f64,
    /// Score for a matching column.
    pub match_score: i32,
    /// Score for a mismatching column (negative).
    pub mismatch_score: i32,
    /// Gap open cost (negative).
    pub gap_open: i32,
    /// Gap extend cost (negative).
    pub gap_extend: i32,
    /// Re-align reads dropped during assembly against the consensus and
    /// fold their disagreements into the minor set. Single-end only.
    pub backalign_dropped: bool,
}

impl Default for AlignerOptions {
    fn default() -> Self {
        Self {
            min_identity: 0.9,
            match_score: 2,
            mismatch_score: -2,
            gap_open: -5,
            gap_extend: -1,
            backalign_dropped: false,
        }
    }
}

/// A minor mutation in reference coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinorMutation {
    /// 0-based reference position.
    pub position: usize,
    /// The disagreeing base.
    pub base: u8,
    /// Good-quality reads that carried it.
    pub reads: usize,
}

/// A consensus placed on a forward reference with its mutation calls.
#[derive(Debug, Clone)]
pub struct AlignedConsensus {
    reference_index: usize,
    reverse_complement: bool,
    map_result: KmerMapResult,
    ref_start: usize,
    ref_end: usize,
    identity: f64,
    mutations: MutationArray,
    minor_mutations: Vec<MinorMutation>,
    assembled_size: usize,
    umi: Vec<u8>,
}

impl AlignedConsensus {
    /// Library index of the forward reference the consensus aligned to.
    #[must_use]
    pub fn reference_index(&self) -> usize {
        self.reference_index
    }

    /// True when the consensus mapped to the reverse-complement entry.
    #[must_use]
    pub fn is_reverse_complement(&self) -> bool {
        self.reverse_complement
    }

    /// The raw k-mer mapping result.
    #[must_use]
    pub fn map_result(&self) -> KmerMapResult {
        self.map_result
    }

    /// Covered reference interval, half-open.
    #[must_use]
    pub fn reference_range(&self) -> (usize, usize) {
        (self.ref_start, self.ref_end)
    }

    /// Fraction of alignment columns that matched.
    #[must_use]
    pub fn identity(&self) -> f64 {
        self.identity
    }

    /// Major mutations with their quality-filter flags.
    #[must_use]
    pub fn mutations(&self) -> &MutationArray {
        &self.mutations
    }

    /// Minor mutations mapped into reference coordinates.
    #[must_use]
    pub fn minor_mutations(&self) -> &[MinorMutation] {
        &self.minor_mutations
    }

    /// Reads that contributed to the consensus.
    #[must_use]
    pub fn assembled_size(&self) -> usize {
        self.assembled_size
    }

    /// The group's UMI.
    #[must_use]
    pub fn umi(&self) -> &[u8] {
        &self.umi
    }
}

/// Per-stream alignment outcome.
#[derive(Debug, Clone)]
pub enum AlignmentOutcome {
    /// The consensus aligned and produced mutation calls.
    Aligned(AlignedConsensus),
    /// The k-mer mapper found no reference.
    NoHit,
    /// A reference was found but the alignment identity was too low.
    LowSimilarity {
        /// The identity that failed the threshold.
        identity: f64,
    },
}

impl AlignmentOutcome {
    /// The aligned consensus, when present.
    #[must_use]
    pub fn aligned(&self) -> Option<&AlignedConsensus> {
        match self {
            AlignmentOutcome::Aligned(aligned) => Some(aligned),
            _ => None,
        }
    }
}

/// Maps consensuses onto references and extracts their mutations.
pub struct ConsensusAligner {
    index: Arc<KmerIndex>,
    options: AlignerOptions,
}

impl ConsensusAligner {
    /// Creates an aligner over a shared k-mer index.
    #[must_use]
    pub fn new(index: Arc<KmerIndex>, options: AlignerOptions) -> Self {
        Self { index, options }
    }

    /// The index in use.
    #[must_use]
    pub fn index(&self) -> &KmerIndex {
        &self.index
    }

    /// Aligns every stream of a group.
    ///
    /// Back-alignment of dropped reads is refused for paired-end groups:
    /// mate streams would need joint placement before their dropped reads
    /// could be attributed to either consensus.
    pub fn align_group(&self, outcome: &ConsensusOutcome) -> Result<Vec<AlignmentOutcome>> {
        if self.options.backalign_dropped && matches!(outcome, ConsensusOutcome::Paired(_, _)) {
            return Err(UmivarError::CapabilityNotSupported {
                capability: "back-alignment of dropped reads for paired-end groups".to_string(),
            });
        }
        outcome.streams().into_iter().map(|consensus| self.align(consensus)).collect()
    }

    /// Aligns a single consensus.
    pub fn align(&self, consensus: &Consensus) -> Result<AlignmentOutcome> {
        let Some(map_result) = self.index.find(consensus.bases()) else {
            return Ok(AlignmentOutcome::NoHit);
        };

        let mut oriented = consensus.clone();
        if self.options.backalign_dropped {
            let recovered = self.backalign_dropped_reads(&oriented);
            oriented.extend_minors(recovered);
        }
        let hit = self.index.library().get(map_result.reference_index);
        let reverse_complement = hit.strand().is_reverse();
        if reverse_complement {
            oriented = oriented.reverse_complement();
        }
        let reference = self.index.library().get(hit.parent());

        let scoring = self.scoring_fn();
        let mut aligner = Aligner::with_capacity(
            oriented.len(),
            reference.len(),
            self.options.gap_open,
            self.options.gap_extend,
            &scoring,
        );
        let alignment = aligner.local(oriented.bases(), reference.bases());

        let mut matches = 0usize;
        let mut columns = 0usize;
        for op in &alignment.operations {
            match op {
                AlignmentOperation::Match => {
                    matches += 1;
                    columns += 1;
                }
                AlignmentOperation::Subst
                | AlignmentOperation::Ins
                | AlignmentOperation::Del => columns += 1,
                AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
            }
        }
        if columns == 0 {
            return Ok(AlignmentOutcome::NoHit);
        }
        let identity = matches as f64 / columns as f64;
        if identity < self.options.min_identity {
            return Ok(AlignmentOutcome::LowSimilarity { identity });
        }

        let extraction = extract_mutations(
            &alignment.operations,
            alignment.xstart,
            alignment.ystart,
            oriented.bases(),
            reference.bases(),
        );
        let mut mutations = MutationArray::new(extraction.mutations);
        for (index, span) in extraction.query_spans.iter().enumerate() {
            if !span_passes_mask(&oriented, *span) {
                mutations.set_filtered(index, true);
            }
        }

        let minor_mutations = map_minors(
            oriented.minors(),
            &extraction.query_to_reference,
            &mutations,
            reference.bases(),
        );

        Ok(AlignmentOutcome::Aligned(AlignedConsensus {
            reference_index: reference.index(),
            reverse_complement,
            map_result,
            ref_start: alignment.ystart,
            ref_end: alignment.yend,
            identity,
            mutations,
            minor_mutations,
            assembled_size: oriented.assembled_size(),
            umi: oriented.umi().to_vec(),
        }))
    }

    /// Recovers minor sites from reads the assembler's quality gate
    /// excluded, by aligning each against the consensus itself.
    fn backalign_dropped_reads(&self, consensus: &Consensus) -> Vec<MinorSite> {
        let mut counts: ahash::AHashMap<(usize, u8), usize> = ahash::AHashMap::new();
        let scoring = self.scoring_fn();
        for read in consensus.dropped_reads() {
            if read.is_empty() {
                continue;
            }
            let mut aligner = Aligner::with_capacity(
                read.len(),
                consensus.len(),
                self.options.gap_open,
                self.options.gap_extend,
                &scoring,
            );
            let alignment = aligner.local(read.bases(), consensus.bases());
            let mut xpos = alignment.xstart;
            let mut ypos = alignment.ystart;
            for op in &alignment.operations {
                match op {
                    AlignmentOperation::Match => {
                        xpos += 1;
                        ypos += 1;
                    }
                    AlignmentOperation::Subst => {
                        let base = read.bases()[xpos];
                        if base_index(base).is_some() {
                            *counts.entry((ypos, base.to_ascii_uppercase())).or_insert(0) += 1;
                        }
                        xpos += 1;
                        ypos += 1;
                    }
                    AlignmentOperation::Ins => xpos += 1,
                    AlignmentOperation::Del => ypos += 1,
                    AlignmentOperation::Xclip(n) => xpos += n,
                    AlignmentOperation::Yclip(n) => ypos += n,
                }
            }
        }
        let mut sites: Vec<MinorSite> = counts
            .into_iter()
            .map(|((column, base), reads)| MinorSite { column, base, reads })
            .collect();
        sites.sort_by_key(|site| (site.column, site.base));
        sites
    }

    fn scoring_fn(&self) -> impl Fn(u8, u8) -> i32 {
        let match_score = self.options.match_score;
        let mismatch_score = self.options.mismatch_score;
        move |a: u8, b: u8| if a == b { match_score } else { mismatch_score }
    }
}

/// Consensus columns a mutation draws its evidence from.
#[derive(Debug, Clone, Copy)]
enum QuerySpan {
    /// The column holding a substituted base.
    Column(usize),
    /// Columns holding inserted bases, half-open.
    Run(usize, usize),
    /// Columns flanking a deletion; the gap itself has no column.
    Flanks(Option<usize>, Option<usize>),
}

struct Extraction {
    mutations: Vec<Mutation>,
    query_spans: Vec<QuerySpan>,
    /// Consensus column to reference position, match and mismatch columns only.
    query_to_reference: ahash::AHashMap<usize, usize>,
}

/// Converts an edit script into mutations in reference coordinates,
/// merging gap runs into single indel events.
fn extract_mutations(
    operations: &[AlignmentOperation],
    xstart: usize,
    ystart: usize,
    query: &[u8],
    reference: &[u8],
) -> Extraction {
    let mut mutations = Vec::new();
    let mut query_spans = Vec::new();
    let mut query_to_reference = ahash::AHashMap::new();

    let mut xpos = xstart;
    let mut ypos = ystart;
    let mut i = 0;
    while i < operations.len() {
        match operations[i] {
            AlignmentOperation::Match => {
                query_to_reference.insert(xpos, ypos);
                xpos += 1;
                ypos += 1;
                i += 1;
            }
            AlignmentOperation::Subst => {
                query_to_reference.insert(xpos, ypos);
                mutations.push(Mutation::Substitution {
                    position: ypos,
                    from: reference[ypos],
                    to: query[xpos],
                });
                query_spans.push(QuerySpan::Column(xpos));
                xpos += 1;
                ypos += 1;
                i += 1;
            }
            AlignmentOperation::Ins => {
                let run_start = xpos;
                while i < operations.len() && operations[i] == AlignmentOperation::Ins {
                    xpos += 1;
                    i += 1;
                }
                mutations.push(Mutation::Insertion {
                    position: ypos,
                    bases: query[run_start..xpos].to_vec(),
                });
                query_spans.push(QuerySpan::Run(run_start, xpos));
            }
            AlignmentOperation::Del => {
                let run_start = ypos;
                while i < operations.len() && operations[i] == AlignmentOperation::Del {
                    ypos += 1;
                    i += 1;
                }
                mutations.push(Mutation::Deletion {
                    position: run_start,
                    bases: reference[run_start..ypos].to_vec(),
                });
                let left = xpos.checked_sub(1);
                let right = (xpos < query.len()).then_some(xpos);
                query_spans.push(QuerySpan::Flanks(left, right));
            }
            AlignmentOperation::Xclip(n) => {
                xpos += n;
                i += 1;
            }
            AlignmentOperation::Yclip(n) => {
                ypos += n;
                i += 1;
            }
        }
    }

    Extraction { mutations, query_spans, query_to_reference }
}

/// A mutation survives the quality filter only when every consensus
/// column it rests on is unmasked.
fn span_passes_mask(consensus: &Consensus, span: QuerySpan) -> bool {
    match span {
        QuerySpan::Column(column) => !consensus.is_masked(column),
        QuerySpan::Run(start, end) => (start..end).all(|column| !consensus.is_masked(column)),
        QuerySpan::Flanks(left, right) => {
            left.map_or(true, |column| !consensus.is_masked(column))
                && right.map_or(true, |column| !consensus.is_masked(column))
        }
    }
}

/// Maps assembly minor sites through the alignment, dropping sites with
/// no reference column and sites at positions already claimed by a major
/// mutation for this consensus.
fn map_minors(
    minors: &[MinorSite],
    query_to_reference: &ahash::AHashMap<usize, usize>,
    majors: &MutationArray,
    reference: &[u8],
) -> Vec<MinorMutation> {
    let major_positions: ahash::AHashSet<usize> =
        majors.iter().map(Mutation::position).collect();
    let mut mapped: Vec<MinorMutation> = minors
        .iter()
        .filter_map(|site| {
            let position = *query_to_reference.get(&site.column)?;
            if major_positions.contains(&position) {
                return None;
            }
            if site.base == reference[position] {
                return None;
            }
            Some(MinorMutation { position, base: site.base, reads: site.reads })
        })
        .collect();
    mapped.sort_by_key(|minor| (minor.position, minor.base));
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dna::reverse_complement;
    use crate::genomic::{PanelEntry, ReferenceLibrary};
    use crate::mig::SeqRead;
    use crate::phred::MAX_CONSENSUS_QUAL;

    const REF: &[u8] = b"ACGTGACCTTAGCAAGTCCGATAAGCTTGCGCTTAAGCGTACCGGTATCGAACTGGCATA";

    fn test_index() -> Arc<KmerIndex> {
        let library = ReferenceLibrary::new(vec![PanelEntry::new("amp", REF)]).unwrap();
        Arc::new(KmerIndex::build(&library, 11).unwrap())
    }

    fn aligner() -> ConsensusAligner {
        ConsensusAligner::new(test_index(), AlignerOptions::default())
    }

    fn plain_consensus(bases: &[u8]) -> Consensus {
        Consensus::new(
            b"AACCGGTT".to_vec(),
            bases.to_vec(),
            vec![MAX_CONSENSUS_QUAL; bases.len()],
            vec![false; bases.len()],
            vec![],
            5,
            5,
        )
    }

    fn masked_consensus(bases: &[u8], masked: &[usize]) -> Consensus {
        let mut mask = vec![false; bases.len()];
        for &column in masked {
            mask[column] = true;
        }
        Consensus::new(
            b"AACCGGTT".to_vec(),
            bases.to_vec(),
            vec![MAX_CONSENSUS_QUAL; bases.len()],
            mask,
            vec![],
            5,
            5,
        )
    }

    #[test]
    fn test_perfect_consensus_has_no_mutations() {
        let outcome = aligner().align(&plain_consensus(REF)).unwrap();
        let AlignmentOutcome::Aligned(aligned) = outcome else { panic!("expected aligned") };

        assert_eq!(aligned.reference_index(), 0);
        assert!(!aligned.is_reverse_complement());
        assert_eq!(aligned.reference_range(), (0, REF.len()));
        assert!((aligned.identity() - 1.0).abs() < 1e-12);
        assert!(aligned.mutations().is_empty());
        assert!(aligned.minor_mutations().is_empty());
    }

    #[test]
    fn test_substitution_extracted_in_reference_coordinates() {
        let mut bases = REF.to_vec();
        bases[20] = b'G';
        let outcome = aligner().align(&plain_consensus(&bases)).unwrap();
        let AlignmentOutcome::Aligned(aligned) = outcome else { panic!("expected aligned") };

        assert_eq!(aligned.mutations().len(), 1);
        assert_eq!(
            aligned.mutations().get(0),
            &Mutation::Substitution { position: 20, from: b'A', to: b'G' }
        );
        assert!(!aligned.mutations().is_filtered(0));
    }

    #[test]
    fn test_insertion_run_merged_into_one_event() {
        let mut bases = REF[..30].to_vec();
        bases.extend_from_slice(b"TT");
        bases.extend_from_slice(&REF[30..]);
        let outcome = aligner().align(&plain_consensus(&bases)).unwrap();
        let AlignmentOutcome::Aligned(aligned) = outcome else { panic!("expected aligned") };

        assert_eq!(aligned.mutations().len(), 1);
        assert_eq!(
            aligned.mutations().get(0),
            &Mutation::Insertion { position: 30, bases: b"TT".to_vec() }
        );
    }

    #[test]
    fn test_deletion_run_merged_into_one_event() {
        let mut bases = REF[..40].to_vec();
        bases.extend_from_slice(&REF[43..]);
        let outcome = aligner().align(&plain_consensus(&bases)).unwrap();
        let AlignmentOutcome::Aligned(aligned) = outcome else { panic!("expected aligned") };

        assert_eq!(aligned.mutations().len(), 1);
        assert_eq!(
            aligned.mutations().get(0),
            &Mutation::Deletion { position: 40, bases: b"ACC".to_vec() }
        );
    }

    #[test]
    fn test_reverse_complement_consensus_normalizes_to_forward() {
        let mut bases = REF.to_vec();
        bases[20] = b'G';
        let rc = reverse_complement(&bases);
        let outcome = aligner().align(&plain_consensus(&rc)).unwrap();
        let AlignmentOutcome::Aligned(aligned) = outcome else { panic!("expected aligned") };

        assert!(aligned.is_reverse_complement());
        assert_eq!(aligned.reference_index(), 0);
        assert_eq!(
            aligned.mutations().get(0),
            &Mutation::Substitution { position: 20, from: b'A', to: b'G' }
        );
    }

    #[test]
    fn test_unmappable_sequence_is_no_hit() {
        let outcome = aligner().align(&plain_consensus(b"TTTTTTTTTTTTTTTTTTTTTTTT")).unwrap();
        assert!(matches!(outcome, AlignmentOutcome::NoHit));
    }

    #[test]
    fn test_heavily_mutated_consensus_is_low_similarity() {
        // Leave the first 12 bases intact for the mapper, then mutate
        // every fourth base so the local alignment still spans everything.
        let mut bases = REF.to_vec();
        let mut position = 12;
        while position < bases.len() {
            bases[position] = match bases[position] {
                b'A' => b'C',
                b'C' => b'G',
                b'G' => b'T',
                _ => b'A',
            };
            position += 4;
        }
        let outcome = aligner().align(&plain_consensus(&bases)).unwrap();
        let AlignmentOutcome::LowSimilarity { identity } = outcome else {
            panic!("expected low similarity, got {outcome:?}")
        };
        assert!(identity < 0.9);
    }

    #[test]
    fn test_masked_substitution_is_filtered() {
        let mut bases = REF.to_vec();
        bases[20] = b'G';
        let consensus = masked_consensus(&bases, &[20]);
        let outcome = aligner().align(&consensus).unwrap();
        let AlignmentOutcome::Aligned(aligned) = outcome else { panic!("expected aligned") };

        assert_eq!(aligned.mutations().len(), 1);
        assert!(aligned.mutations().is_filtered(0));
        assert_eq!(aligned.mutations().unfiltered().count(), 0);
    }

    #[test]
    fn test_deletion_with_masked_flank_is_filtered() {
        let mut bases = REF[..40].to_vec();
        bases.extend_from_slice(&REF[43..]);
        // Column 39 is the left flank of the gap
        let consensus = masked_consensus(&bases, &[39]);
        let outcome = aligner().align(&consensus).unwrap();
        let AlignmentOutcome::Aligned(aligned) = outcome else { panic!("expected aligned") };

        assert_eq!(aligned.mutations().len(), 1);
        assert!(aligned.mutations().is_filtered(0));
    }

    #[test]
    fn test_minor_sites_map_to_reference_positions() {
        let consensus = Consensus::new(
            b"AACCGGTT".to_vec(),
            REF.to_vec(),
            vec![MAX_CONSENSUS_QUAL; REF.len()],
            vec![false; REF.len()],
            vec![MinorSite { column: 15, base: b'T', reads: 2 }],
            5,
            5,
        );
        let outcome = aligner().align(&consensus).unwrap();
        let AlignmentOutcome::Aligned(aligned) = outcome else { panic!("expected aligned") };

        assert_eq!(
            aligned.minor_mutations(),
            &[MinorMutation { position: 15, base: b'T', reads: 2 }]
        );
    }

    #[test]
    fn test_minor_at_major_position_is_dropped() {
        let mut bases = REF.to_vec();
        bases[20] = b'G';
        let consensus = Consensus::new(
            b"AACCGGTT".to_vec(),
            bases,
            vec![MAX_CONSENSUS_QUAL; REF.len()],
            vec![false; REF.len()],
            vec![
                MinorSite { column: 15, base: b'T', reads: 1 },
                MinorSite { column: 20, base: b'C', reads: 3 },
            ],
            5,
            5,
        );
        let outcome = aligner().align(&consensus).unwrap();
        let AlignmentOutcome::Aligned(aligned) = outcome else { panic!("expected aligned") };

        assert_eq!(aligned.mutations().unfiltered().count(), 1);
        assert_eq!(
            aligned.minor_mutations(),
            &[MinorMutation { position: 15, base: b'T', reads: 1 }]
        );
    }

    #[test]
    fn test_backalign_recovers_minors_from_dropped_reads() {
        let mut read_bases = REF.to_vec();
        read_bases[10] = b'C';
        let mig = crate::mig::Mig::single(
            b"AACCGGTT",
            vec![
                SeqRead::with_uniform_quality(REF, 30),
                SeqRead::with_uniform_quality(REF, 30),
                SeqRead::with_uniform_quality(&read_bases, 5),
            ],
        );
        let assembler = crate::assemble::Assembler::default();
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(3);
        let outcome = assembler.assemble(&mig, &mut rng).unwrap();

        let aligner = ConsensusAligner::new(
            test_index(),
            AlignerOptions { backalign_dropped: true, ..AlignerOptions::default() },
        );
        let outcomes = aligner.align_group(&outcome).unwrap();
        assert_eq!(outcomes.len(), 1);
        let Some(aligned) = outcomes[0].aligned() else { panic!("expected aligned") };

        assert!(aligned.mutations().is_empty());
        assert_eq!(
            aligned.minor_mutations(),
            &[MinorMutation { position: 10, base: b'C', reads: 1 }]
        );
    }

    #[test]
    fn test_backalign_refused_for_paired_groups() {
        let pairs = vec![(
            SeqRead::with_uniform_quality(&REF[..30], 30),
            SeqRead::with_uniform_quality(&REF[30..], 30),
        )];
        let mig = crate::mig::Mig::paired(b"AACCGGTT", pairs);
        let assembler = crate::assemble::Assembler::default();
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(3);
        let outcome = assembler.assemble(&mig, &mut rng).unwrap();

        let aligner = ConsensusAligner::new(
            test_index(),
            AlignerOptions { backalign_dropped: true, ..AlignerOptions::default() },
        );
        let err = aligner.align_group(&outcome).unwrap_err();
        assert!(matches!(err, UmivarError::CapabilityNotSupported { .. }));
    }

    #[test]
    fn test_paired_streams_align_independently() {
        let pairs = vec![(
            SeqRead::with_uniform_quality(&REF[..30], 30),
            SeqRead::with_uniform_quality(&reverse_complement(&REF[25..]), 30),
        )];
        let mig = crate::mig::Mig::paired(b"AACCGGTT", pairs);
        let assembler = crate::assemble::Assembler::default();
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(3);
        let outcome = assembler.assemble(&mig, &mut rng).unwrap();

        let outcomes = aligner().align_group(&outcome).unwrap();
        assert_eq!(outcomes.len(), 2);
        let first = outcomes[0].aligned().unwrap();
        let second = outcomes[1].aligned().unwrap();

        assert!(!first.is_reverse_complement());
        assert_eq!(first.reference_range(), (0, 30));
        assert!(second.is_reverse_complement());
        assert_eq!(second.reference_range(), (25, REF.len()));
        assert_eq!(first.reference_index(), second.reference_index());
    }
}
