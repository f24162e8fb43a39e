//! Molecular identifier groups.
//!
//! A [`Mig`] is the unit of work for the whole pipeline: one UMI plus the
//! reads that carry it, produced by the upstream demultiplexer and consumed
//! exactly once by the assembler. Single-end and paired-end layouts share
//! the same structure through [`MigReads`], so downstream stages run the
//! same per-stream logic once or twice instead of maintaining parallel
//! type hierarchies.

use crate::errors::{Result, UmivarError};
use crate::phred::PhredScore;

/// One read: bases plus per-base Phred qualities of equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRead {
    bases: Vec<u8>,
    quals: Vec<PhredScore>,
}

impl SeqRead {
    /// Creates a read, checking that bases and qualities line up.
    ///
    /// # Errors
    ///
    /// [`UmivarError::InvalidRecord`] when the two lengths differ.
    pub fn new(bases: Vec<u8>, quals: Vec<PhredScore>) -> Result<Self> {
        if bases.len() != quals.len() {
            return Err(UmivarError::InvalidRecord {
                record_type: "read".to_string(),
                name: String::from_utf8_lossy(&bases).into_owned(),
                reason: format!(
                    "sequence length {} does not match quality length {}",
                    bases.len(),
                    quals.len()
                ),
            });
        }
        Ok(Self { bases, quals })
    }

    /// Creates a read with one quality byte repeated across all bases.
    #[must_use]
    pub fn with_uniform_quality(bases: &[u8], qual: PhredScore) -> Self {
        Self { bases: bases.to_vec(), quals: vec![qual; bases.len()] }
    }

    /// Base sequence.
    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// Per-base quality bytes.
    #[must_use]
    pub fn quals(&self) -> &[PhredScore] {
        &self.quals
    }

    /// Read length in bases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// True for a zero-length read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

/// Read layout of a group: one stream or two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigReads {
    /// Single-end reads.
    Single(Vec<SeqRead>),
    /// Paired-end reads, first and second of each pair.
    Paired(Vec<(SeqRead, SeqRead)>),
}

impl MigReads {
    /// Number of reads (single-end) or read pairs (paired-end).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            MigReads::Single(reads) => reads.len(),
            MigReads::Paired(pairs) => pairs.len(),
        }
    }

    /// True when the group holds no reads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A UMI group: the reads sharing one molecular identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mig {
    umi: Vec<u8>,
    reads: MigReads,
}

impl Mig {
    /// Builds a single-end group.
    #[must_use]
    pub fn single(umi: &[u8], reads: Vec<SeqRead>) -> Self {
        Self { umi: umi.to_vec(), reads: MigReads::Single(reads) }
    }

    /// Builds a paired-end group.
    #[must_use]
    pub fn paired(umi: &[u8], pairs: Vec<(SeqRead, SeqRead)>) -> Self {
        Self { umi: umi.to_vec(), reads: MigReads::Paired(pairs) }
    }

    /// The group's UMI tag.
    #[must_use]
    pub fn umi(&self) -> &[u8] {
        &self.umi
    }

    /// UMI rendered for logs and read names.
    #[must_use]
    pub fn umi_string(&self) -> String {
        String::from_utf8_lossy(&self.umi).into_owned()
    }

    /// Group size: reads for single-end, pairs for paired-end.
    #[must_use]
    pub fn size(&self) -> usize {
        self.reads.len()
    }

    /// The read layout.
    #[must_use]
    pub fn reads(&self) -> &MigReads {
        &self.reads
    }

    /// True for paired-end groups.
    #[must_use]
    pub fn is_paired(&self) -> bool {
        matches!(self.reads, MigReads::Paired(_))
    }
}
