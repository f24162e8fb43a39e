//! DNA sequence utilities.
//!
//! Base complementation, base-code lookup tables shared by the consensus
//! and counting code, and the 2-bit packing used by the k-mer index.

/// The four unambiguous bases in base-code order (A < C < G < T).
///
/// Deterministic tie-breaks elsewhere in the crate rely on this order.
pub const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Lookup table mapping ASCII base to index (A=0, C=1, G=2, T=3, other=4).
///
/// Table lookup avoids branch misprediction in per-column hot loops.
pub const BASE_TO_INDEX: [u8; 256] = {
    let mut table = [4u8; 256];
    table[b'A' as usize] = 0;
    table[b'a' as usize] = 0;
    table[b'C' as usize] = 1;
    table[b'c' as usize] = 1;
    table[b'G' as usize] = 2;
    table[b'g' as usize] = 2;
    table[b'T' as usize] = 3;
    table[b't' as usize] = 3;
    table
};

/// Maps a base to its index, or `None` for ambiguous bases.
#[inline]
#[must_use]
pub fn base_index(base: u8) -> Option<usize> {
    let idx = BASE_TO_INDEX[base as usize];
    if idx < 4 { Some(idx as usize) } else { None }
}

/// Complements a single DNA base, normalizing to uppercase.
///
/// Returns the Watson-Crick complement: A<->T, C<->G. 'N' and any other
/// ambiguity code pass through unchanged.
#[inline]
#[must_use]
pub const fn complement_base(base: u8) -> u8 {
    match base {
        b'A' | b'a' => b'T',
        b'T' | b't' => b'A',
        b'C' | b'c' => b'G',
        b'G' | b'g' => b'C',
        _ => base,
    }
}

/// Reverse complements a DNA sequence.
///
/// # Examples
///
/// ```
/// use umivar_lib::dna::reverse_complement;
///
/// assert_eq!(reverse_complement(b"ACGT"), b"ACGT".to_vec());
/// assert_eq!(reverse_complement(b"AAAA"), b"TTTT".to_vec());
/// assert_eq!(reverse_complement(b"ACGTN"), b"NACGT".to_vec());
/// ```
#[must_use]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&base| complement_base(base)).collect()
}

/// Packs a k-mer into a `u64`, two bits per base.
///
/// Returns `None` if the window contains a base outside A/C/G/T, so
/// ambiguous windows are simply skipped during indexing and lookup.
/// Supports k up to 32.
///
/// # Examples
///
/// ```
/// use umivar_lib::dna::pack_kmer;
///
/// assert_eq!(pack_kmer(b"AAAA"), Some(0));
/// assert_eq!(pack_kmer(b"AAAT"), Some(3));
/// assert_eq!(pack_kmer(b"ACGN"), None);
/// ```
#[inline]
#[must_use]
pub fn pack_kmer(window: &[u8]) -> Option<u64> {
    debug_assert!(window.len() <= 32);
    let mut packed = 0u64;
    for &base in window {
        let code = BASE_TO_INDEX[base as usize];
        if code >= 4 {
            return None;
        }
        packed = (packed << 2) | u64::from(code);
    }
    Some(packed)
}

/// Iterates all packed k-mers of `seq`, skipping windows with ambiguous bases.
///
/// Yields `(offset, packed)` pairs. Sequences shorter than k yield nothing.
pub fn packed_kmers(seq: &[u8], k: usize) -> impl Iterator<Item = (usize, u64)> + '_ {
    seq.windows(k).enumerate().filter_map(|(offset, window)| {
        pack_kmer(window).map(|packed| (offset, packed))
    })
}
