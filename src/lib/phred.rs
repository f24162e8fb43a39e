//! Phred quality score utilities.
//!
//! Read qualities arrive as raw Phred bytes (no ASCII offset). Consensus
//! column qualities are expressed on a 0-40 byte scale derived from the
//! within-group agreement fraction, which is what the downstream
//! major-mutation filtering thresholds against.

/// Type alias for Phred quality scores stored as raw bytes.
pub type PhredScore = u8;

/// Maximum consensus column quality (unanimous agreement).
pub const MAX_CONSENSUS_QUAL: PhredScore = 40;

/// Offset between a raw Phred byte and its ASCII encoding in FASTQ.
pub const FASTQ_QUAL_OFFSET: u8 = 33;

/// Mean of a read's quality bytes; 0.0 for an empty slice.
///
/// # Examples
///
/// ```
/// use umivar_lib::phred::mean_quality;
///
/// assert_eq!(mean_quality(&[30, 30, 30]), 30.0);
/// assert_eq!(mean_quality(&[10, 20, 30, 40]), 25.0);
/// assert_eq!(mean_quality(&[]), 0.0);
/// ```
#[must_use]
pub fn mean_quality(quals: &[u8]) -> f64 {
    if quals.is_empty() {
        return 0.0;
    }
    let sum: u64 = quals.iter().map(|&q| u64::from(q)).sum();
    sum as f64 / quals.len() as f64
}

/// Scales a consensus column's agreement into a quality byte.
///
/// `supporting` good-quality bases agree with the consensus call out of
/// `total` good-quality observations at the column. The byte is
/// `40 * (2f - 1)` clamped to `[0, 40]`, so unanimity maps to 40, a 75%
/// majority to 20, and an even split (or no evidence) to 0.
///
/// # Examples
///
/// ```
/// use umivar_lib::phred::agreement_to_qual;
///
/// assert_eq!(agreement_to_qual(4, 4), 40);
/// assert_eq!(agreement_to_qual(3, 4), 20);
/// assert_eq!(agreement_to_qual(2, 4), 0);
/// assert_eq!(agreement_to_qual(0, 0), 0);
/// ```
#[inline]
#[must_use]
pub fn agreement_to_qual(supporting: usize, total: usize) -> PhredScore {
    if total == 0 {
        return 0;
    }
    let fraction = supporting as f64 / total as f64;
    let scaled = f64::from(MAX_CONSENSUS_QUAL) * (2.0 * fraction - 1.0);
    scaled.clamp(0.0, f64::from(MAX_CONSENSUS_QUAL)).round() as PhredScore
}

/// Converts a raw Phred byte to its FASTQ ASCII character.
#[inline]
#[must_use]
pub const fn to_fastq_ascii(qual: PhredScore) -> u8 {
    qual + FASTQ_QUAL_OFFSET
}

/// Converts a FASTQ ASCII quality character back to a raw Phred byte.
///
/// Characters below the offset clamp to zero rather than wrapping.
#[inline]
#[must_use]
pub const fn from_fastq_ascii(ascii: u8) -> PhredScore {
    ascii.saturating_sub(FASTQ_QUAL_OFFSET)
}
