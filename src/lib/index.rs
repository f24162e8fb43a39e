//! K-mer index over the reference library.
//!
//! Maps a query sequence to its best-matching library entry by summing
//! information scores over shared k-mers. Rare k-mers carry more evidence:
//! each hit contributes `-ln(count(kmer) / N)` where `count(kmer)` is the
//! k-mer's total occurrence count in the index and `N` the total number of
//! indexed k-mer instances. The index is built once and read concurrently
//! without locking.

use std::f64::consts::LN_10;

use ahash::AHashMap;

use crate::dna::packed_kmers;
use crate::errors::{Result, UmivarError};
use crate::genomic::ReferenceLibrary;

/// Largest k that fits the 2-bit packing.
pub const MAX_K: usize = 32;

/// Default k-mer size.
pub const DEFAULT_K: usize = 11;

/// Per-reference occurrence counter within one posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Posting {
    reference: u32,
    count: u32,
}

/// Posting list for one k-mer: entries per reference plus the total count.
#[derive(Debug, Clone, Default)]
struct PostingList {
    total: u64,
    entries: Vec<Posting>,
}

/// Result of mapping one query against the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KmerMapResult {
    /// Library index of the winning entry.
    pub reference_index: usize,
    /// True when the winning entry is a reverse-complement entry.
    pub reverse_complement: bool,
    /// Raw accumulated information score of the winner (nats).
    pub score: f64,
    /// Winner score normalized by the number of query k-mers.
    pub information: f64,
    /// Mapping-quality analogue: `10 * (best - max(0, second)) / ln(10)`.
    pub confidence: f64,
}

/// Immutable k-mer → reference postings over a [`ReferenceLibrary`].
#[derive(Debug, Clone)]
pub struct KmerIndex {
    k: usize,
    postings: AHashMap<u64, PostingList>,
    total_instances: u64,
    library: ReferenceLibrary,
}

impl KmerIndex {
    /// Builds the index over every library entry (forward and RC).
    ///
    /// Repeated k-mers within one entry bump that entry's counter in the
    /// posting list rather than appending duplicates.
    ///
    /// # Errors
    ///
    /// [`UmivarError::InvalidParameter`] for k outside `1..=32`;
    /// [`UmivarError::ReferencesTooShort`] when every entry is shorter than
    /// k; [`UmivarError::InvalidRecord`] when no entry yields an
    /// unambiguous k-mer.
    pub fn build(library: &ReferenceLibrary, k: usize) -> Result<Self> {
        if k == 0 || k > MAX_K {
            return Err(UmivarError::InvalidParameter {
                parameter: "k".to_string(),
                reason: format!("must be between 1 and {MAX_K}, got {k}"),
            });
        }

        let mut postings: AHashMap<u64, PostingList> = AHashMap::new();
        let mut total_instances = 0u64;

        for reference in library.iter() {
            let reference_id = reference.index() as u32;
            for (_, packed) in packed_kmers(reference.bases(), k) {
                let list = postings.entry(packed).or_default();
                list.total += 1;
                total_instances += 1;
                match list.entries.last_mut() {
                    Some(last) if last.reference == reference_id => last.count += 1,
                    _ => list.entries.push(Posting { reference: reference_id, count: 1 }),
                }
            }
        }

        if total_instances == 0 {
            let longest = library.iter().map(|r| r.len()).max().unwrap_or(0);
            if longest < k {
                return Err(UmivarError::ReferencesTooShort {
                    count: library.num_forward(),
                    k,
                });
            }
            return Err(UmivarError::InvalidRecord {
                record_type: "reference".to_string(),
                name: "<panel>".to_string(),
                reason: "no unambiguous k-mers in any reference".to_string(),
            });
        }

        Ok(Self { k, postings, total_instances, library: library.clone() })
    }

    /// The k-mer size the index was built with.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Total number of indexed k-mer instances (`N` in the score formula).
    #[must_use]
    pub fn total_instances(&self) -> u64 {
        self.total_instances
    }

    /// The library this index was built over.
    #[must_use]
    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    /// Maps a query sequence to its best library entry.
    ///
    /// Returns `None` for queries shorter than k, queries whose windows are
    /// all ambiguous, and queries sharing no k-mer with the index. Scores
    /// accumulate in a dense per-entry vector scanned in index order with a
    /// strict comparison, so exact ties resolve to the lowest entry index.
    #[must_use]
    pub fn find(&self, seq: &[u8]) -> Option<KmerMapResult> {
        if seq.len() < self.k {
            return None;
        }

        let mut scores = vec![0.0f64; self.library.len()];
        let mut num_kmers = 0usize;
        let mut any_hit = false;
        let ln_total = (self.total_instances as f64).ln();

        for (_, packed) in packed_kmers(seq, self.k) {
            num_kmers += 1;
            if let Some(list) = self.postings.get(&packed) {
                any_hit = true;
                let information = ln_total - (list.total as f64).ln();
                for posting in &list.entries {
                    scores[posting.reference as usize] += information;
                }
            }
        }

        if num_kmers == 0 || !any_hit {
            return None;
        }

        let mut best = 0.0f64;
        let mut second = 0.0f64;
        let mut winner = None;
        for (index, &score) in scores.iter().enumerate() {
            if score > best {
                second = best;
                best = score;
                winner = Some(index);
            } else if score > second {
                second = score;
            }
        }

        let winner = winner?;
        let reverse_complement = self.library.get(winner).strand().is_reverse();
        Some(KmerMapResult {
            reference_index: winner,
            reverse_complement,
            score: best,
            information: best / num_kmers as f64,
            confidence: 10.0 * (best - second.max(0.0)) / LN_10,
        })
    }
}
