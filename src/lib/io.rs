//! File I/O shell around the pipeline core.
//!
//! This module owns every on-disk format the pipeline touches: the reference
//! panel FASTA, UMI-tagged input FASTQ files, the consensus FASTQ export, and
//! the TSV variant/table reports. The core modules never see a file path;
//! they consume [`PanelEntry`] and [`Mig`] values produced here and hand back
//! values this module serializes.
//!
//! # Read structures
//!
//! Input reads carry their UMI inline, described by an fgbio-style read
//! structure (e.g. `8M+T`: an 8 bp molecular barcode followed by template
//! bases to the end of the read). One structure is supplied per input FASTQ;
//! molecular-barcode segments are joined into the group UMI and template
//! segments become the read (one template segment total for single-end input,
//! two for paired).
//!
//! # Reference panel
//!
//! The panel is plain FASTA. A record description of the form `contig:start`
//! (e.g. `>EGFR_e19 chr7:55242410`) places the reference on a genome and
//! makes variant reports use genomic coordinates; records without one are
//! reported in reference-local coordinates.

use crate::assemble::{Consensus, ConsensusOutcome};
use crate::dna::base_index;
use crate::genomic::{GenomicInfo, PanelEntry, ReferenceLibrary};
use crate::metrics::{format_float, write_metrics};
use crate::mig::{Mig, SeqRead};
use crate::phred::{from_fastq_ascii, to_fastq_ascii, PhredScore};
use crate::table::MutationsTableSet;
use crate::variant::Variant;
use ahash::AHashMap;
use anyhow::{anyhow, bail, ensure, Context, Result};
use fgoxide::io::Io;
use log::{debug, info};
use noodles::fasta;
use read_structure::{ReadStructure, SegmentType};
use seq_io::fastq::{self, Reader as FastqReader, Record};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

const BUFFER_SIZE: usize = 1024 * 1024;

/// Loads a reference panel FASTA into [`PanelEntry`] values.
///
/// Gzipped input is handled transparently. Record descriptions of the form
/// `contig:start` become genomic placements; any other description is
/// ignored. Library-level validation (duplicate names, duplicate sequences)
/// happens later in [`ReferenceLibrary::new`], not here.
///
/// # Errors
///
/// Fails when the file cannot be opened or parsed as FASTA, or when it
/// contains no records.
pub fn load_reference_panel<P: AsRef<Path>>(path: P) -> Result<Vec<PanelEntry>> {
    let path = path.as_ref();
    let source = Io::new(5, BUFFER_SIZE)
        .new_reader(path)
        .with_context(|| format!("Failed to open reference panel: {}", path.display()))?;
    let mut reader = fasta::io::Reader::new(source);

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result
            .with_context(|| format!("Failed to parse FASTA record in {}", path.display()))?;
        let name = String::from_utf8_lossy(record.name()).to_string();
        let mut entry = PanelEntry::new(&name, record.sequence().as_ref());
        entry.genomic = record.description().and_then(|d| parse_genomic_description(d.as_ref()));
        entries.push(entry);
    }

    ensure!(!entries.is_empty(), "Reference panel {} contains no FASTA records", path.display());
    debug!("Loaded {} panel entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Parses a `contig:start` description token into a genomic placement.
///
/// Only the first whitespace-separated token is considered. The split is on
/// the last colon, so contig names containing colons survive. `start` is
/// 1-based; zero is rejected.
fn parse_genomic_description(description: &[u8]) -> Option<GenomicInfo> {
    let text = std::str::from_utf8(description).ok()?;
    let token = text.split_whitespace().next()?;
    let (contig, start) = token.rsplit_once(':')?;
    let start: u64 = start.parse().ok()?;
    if contig.is_empty() || start == 0 {
        return None;
    }
    Some(GenomicInfo { contig: contig.to_string(), start })
}

/// Validates input FASTQs against their read structures.
///
/// The same number of files and structures must be supplied; the structures
/// must together contain one or two template segments (single-end or paired
/// layout) and at least one molecular-barcode segment to group on.
///
/// # Errors
///
/// Fails when any of the layout constraints above is violated.
pub fn validate_read_layout(inputs: &[PathBuf], read_structures: &[ReadStructure]) -> Result<()> {
    ensure!(!inputs.is_empty(), "At least one input FASTQ is required");
    ensure!(
        inputs.len() == read_structures.len(),
        "Got {} input FASTQs but {} read structures; counts must match",
        inputs.len(),
        read_structures.len()
    );

    let template_count = count_segments(read_structures, SegmentType::Template);
    ensure!(
        (1..=2).contains(&template_count),
        "Read structures must contain 1-2 template segments total, found {template_count}"
    );

    let umi_count = count_segments(read_structures, SegmentType::MolecularBarcode);
    ensure!(
        umi_count >= 1,
        "Read structures must contain at least one molecular barcode (M) segment"
    );

    Ok(())
}

/// Counts segments of the given type across all read structures.
fn count_segments(read_structures: &[ReadStructure], kind: SegmentType) -> usize {
    read_structures.iter().flat_map(|rs| rs.iter()).filter(|s| s.kind == kind).count()
}

/// Reads FASTQ inputs and groups reads into UMI groups.
///
/// Files are read in lockstep (one record from each per step) with read-name
/// agreement enforced across files. UMI segments are uppercased and joined
/// with `-`; reads whose UMI contains an ambiguous base are skipped and
/// counted. The returned groups are sorted by UMI so downstream processing
/// order does not depend on hash-map iteration.
///
/// # Errors
///
/// Fails on layout violations (see [`validate_read_layout`]), unreadable or
/// malformed FASTQ records, reads too short for their structure, and inputs
/// that fall out of sync.
pub fn read_migs(inputs: &[PathBuf], read_structures: &[ReadStructure]) -> Result<Vec<Mig>> {
    validate_read_layout(inputs, read_structures)?;

    let paired = count_segments(read_structures, SegmentType::Template) == 2;

    let mut readers = inputs
        .iter()
        .map(|path| open_fastq_reader(path))
        .collect::<Result<Vec<_>>>()?;

    let mut singles: AHashMap<Vec<u8>, Vec<SeqRead>> = AHashMap::new();
    let mut pairs: AHashMap<Vec<u8>, Vec<(SeqRead, SeqRead)>> = AHashMap::new();
    let mut read_sets = 0u64;
    let mut ambiguous_umis = 0u64;

    'records: loop {
        let mut heads: Vec<Vec<u8>> = Vec::with_capacity(readers.len());
        let mut umi_parts: Vec<Vec<u8>> = Vec::new();
        let mut templates: Vec<SeqRead> = Vec::new();

        for (source_index, (reader, structure)) in
            readers.iter_mut().zip(read_structures).enumerate()
        {
            let Some(result) = reader.next() else {
                ensure!(
                    source_index == 0,
                    "FASTQ sources out of sync: {} ended early",
                    inputs[source_index].display()
                );
                break 'records;
            };
            let record = result.map_err(|e| {
                anyhow!("Failed to parse FASTQ record in {}: {e}", inputs[source_index].display())
            })?;

            heads.push(record.head().to_vec());
            for segment in structure.iter() {
                let (seq, quals) = segment
                    .extract_bases_and_quals(record.seq(), record.qual())
                    .map_err(|e| {
                        anyhow!(
                            "Read '{}' in {}: {e}",
                            String::from_utf8_lossy(record.head()),
                            inputs[source_index].display()
                        )
                    })?;
                match segment.kind {
                    SegmentType::MolecularBarcode => umi_parts.push(seq.to_ascii_uppercase()),
                    SegmentType::Template => {
                        let numeric: Vec<PhredScore> =
                            quals.iter().map(|&q| from_fastq_ascii(q)).collect();
                        templates.push(SeqRead::new(seq.to_vec(), numeric)?);
                    }
                    _ => {}
                }
            }
        }

        validate_names_match(&heads)?;
        read_sets += 1;

        if umi_parts.iter().any(|part| part.iter().any(|&b| base_index(b).is_none())) {
            ambiguous_umis += 1;
            continue;
        }
        let umi = join_umi_segments(&umi_parts);

        let mut it = templates.into_iter();
        if paired {
            let (Some(first), Some(second)) = (it.next(), it.next()) else {
                bail!("Read structures produced an unexpected number of template segments");
            };
            pairs.entry(umi).or_default().push((first, second));
        } else {
            let Some(read) = it.next() else {
                bail!("Read structures produced an unexpected number of template segments");
            };
            singles.entry(umi).or_default().push(read);
        }
    }

    let mut migs: Vec<Mig> = if paired {
        pairs.into_iter().map(|(umi, reads)| Mig::paired(&umi, reads)).collect()
    } else {
        singles.into_iter().map(|(umi, reads)| Mig::single(&umi, reads)).collect()
    };
    migs.sort_by(|a, b| a.umi().cmp(b.umi()));

    debug!("Grouped {} read sets into {} UMI groups", read_sets, migs.len());
    if ambiguous_umis > 0 {
        info!("Skipped {ambiguous_umis} read sets with ambiguous UMI bases");
    }
    Ok(migs)
}

/// Opens a FASTQ file, decompressing gzip transparently.
fn open_fastq_reader(path: &Path) -> Result<FastqReader<Box<dyn BufRead + Send>>> {
    let source = Io::new(5, BUFFER_SIZE)
        .new_reader(path)
        .with_context(|| format!("Failed to open FASTQ: {}", path.display()))?;
    Ok(FastqReader::with_capacity(source, BUFFER_SIZE))
}

/// Joins UMI segments with `-`, mirroring how multi-segment UMIs are tagged.
fn join_umi_segments(parts: &[Vec<u8>]) -> Vec<u8> {
    let total: usize = parts.iter().map(Vec::len).sum();
    let mut umi = Vec::with_capacity(total + parts.len().saturating_sub(1));
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            umi.push(b'-');
        }
        umi.extend_from_slice(part);
    }
    umi
}

/// Checks that lockstep records from multiple FASTQs belong to the same read.
fn validate_names_match(heads: &[Vec<u8>]) -> Result<()> {
    if heads.len() < 2 {
        return Ok(());
    }
    let first = strip_pair_suffix(&heads[0]);
    for head in heads.iter().skip(1) {
        let other = strip_pair_suffix(head);
        ensure!(
            other == first,
            "Read names do not match across FASTQs: '{}' vs '{}'",
            String::from_utf8_lossy(first),
            String::from_utf8_lossy(other)
        );
    }
    Ok(())
}

/// Strips a space-separated comment and any `/1`-style pair suffix from a
/// read name, for cross-file name comparison.
fn strip_pair_suffix(name: &[u8]) -> &[u8] {
    let name = match name.iter().position(|&b| b == b' ') {
        Some(pos) => &name[..pos],
        None => name,
    };
    if name.len() >= 2 {
        let last = name[name.len() - 1];
        let sep = name[name.len() - 2];
        if (last == b'1' || last == b'2')
            && (sep == b'/' || sep == b'.' || sep == b'_' || sep == b':')
        {
            return &name[..name.len() - 2];
        }
    }
    name
}

/// Writes assembled consensuses as FASTQ.
///
/// The record name is the group UMI (with `/1` and `/2` suffixes for paired
/// output, interleaved) and the description carries the assembled and true
/// group sizes. Quality bytes are re-encoded as Phred+33. A `.gz` output
/// path is compressed transparently.
///
/// # Errors
///
/// Fails when the output cannot be created or written.
pub fn write_consensus_fastq<P: AsRef<Path>>(
    path: P,
    outcomes: &[ConsensusOutcome],
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = Io::new(5, BUFFER_SIZE)
        .new_writer(path)
        .with_context(|| format!("Failed to create consensus FASTQ: {}", path.display()))?;

    for outcome in outcomes {
        match outcome {
            ConsensusOutcome::Single(consensus) => {
                write_consensus_record(&mut writer, consensus, None)?;
            }
            ConsensusOutcome::Paired(first, second) => {
                write_consensus_record(&mut writer, first, Some(1))?;
                write_consensus_record(&mut writer, second, Some(2))?;
            }
        }
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush consensus FASTQ: {}", path.display()))?;
    Ok(())
}

fn write_consensus_record<W: Write>(
    writer: &mut W,
    consensus: &Consensus,
    mate: Option<u8>,
) -> Result<()> {
    let umi = String::from_utf8_lossy(consensus.umi());
    let head = match mate {
        Some(number) => format!(
            "{umi}/{number} assembled={} true={}",
            consensus.assembled_size(),
            consensus.true_size()
        ),
        None => {
            format!("{umi} assembled={} true={}", consensus.assembled_size(), consensus.true_size())
        }
    };
    let quals: Vec<u8> = consensus.quals().iter().map(|&q| to_fastq_ascii(q)).collect();
    fastq::write_to(&mut *writer, head.as_bytes(), consensus.bases(), &quals)?;
    Ok(())
}

/// One row of the variant report TSV.
///
/// Coordinates are genomic when the reference carries a placement, otherwise
/// 1-based reference-local. Floats are fixed-precision strings so reports
/// are byte-reproducible; a degenerate-fit score is written as `.`.
#[derive(Debug, Clone, Serialize)]
pub struct VariantRow {
    /// Reference (amplicon) name.
    pub reference: String,
    /// Contig of the placement, or the reference name again.
    pub contig: String,
    /// 1-based position on `contig`.
    pub position: u64,
    /// Reference base.
    pub ref_base: char,
    /// Alternate base.
    pub alt_base: char,
    /// Groups whose consensus carried the alternate.
    pub major_migs: u64,
    /// Groups covering the position.
    pub coverage_migs: u64,
    /// Reads behind the major groups.
    pub major_reads: u64,
    /// Reads covering the position.
    pub coverage_reads: u64,
    /// Groups where the alternate appeared only as within-group noise.
    pub minor_migs: u64,
    /// Observed group-level frequency.
    pub frequency: String,
    /// Mean background error frequency under the governing fit.
    pub background: String,
    /// Phred-scaled score, or `.` when untestable.
    pub score: String,
    /// `PASS` or the `;`-joined failed filter names.
    pub filters: String,
    /// Final verdict.
    pub verdict: String,
}

impl VariantRow {
    /// Projects a [`Variant`] onto its report row.
    #[must_use]
    pub fn from_variant(variant: &Variant, library: &ReferenceLibrary) -> Self {
        let reference = library.get(variant.reference_index);
        let (contig, position) = match reference.genomic() {
            Some(info) => (info.contig.clone(), info.start + variant.position as u64),
            None => (reference.name().to_string(), variant.position as u64 + 1),
        };
        Self {
            reference: reference.name().to_string(),
            contig,
            position,
            ref_base: variant.from as char,
            alt_base: variant.to as char,
            major_migs: variant.major_migs,
            coverage_migs: variant.coverage_migs,
            major_reads: variant.major_reads,
            coverage_reads: variant.coverage_reads,
            minor_migs: variant.minor_migs,
            frequency: format_float(variant.frequency),
            background: format_float(variant.background),
            score: variant.score.map_or_else(|| ".".to_string(), format_float),
            filters: variant.summary.describe(),
            verdict: variant.verdict.to_string(),
        }
    }
}

/// Writes the ordered variant report as TSV.
///
/// # Errors
///
/// Fails when the output cannot be created or written.
pub fn write_variant_report<P: AsRef<Path>>(
    path: P,
    variants: &[Variant],
    library: &ReferenceLibrary,
) -> Result<()> {
    let rows: Vec<VariantRow> =
        variants.iter().map(|variant| VariantRow::from_variant(variant, library)).collect();
    write_metrics(path, &rows, "variant")
}

/// Dumps every mutations-table cell as TSV.
///
/// # Errors
///
/// Fails when the output cannot be created or written.
pub fn write_table_dump<P: AsRef<Path>>(path: P, tables: &MutationsTableSet) -> Result<()> {
    write_metrics(path, &tables.rows(), "mutations table")
}
