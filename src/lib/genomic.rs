//! Reference panel model.
//!
//! A panel is loaded once into an ordered, immutable [`ReferenceLibrary`].
//! Every input sequence contributes two entries: the forward sequence and
//! its reverse complement, so the k-mer mapper can detect orientation by
//! which entry wins. Entries are shared read-only across worker threads
//! after construction.

use std::sync::Arc;

use crate::dna::reverse_complement;
use crate::errors::{Result, UmivarError};

/// Orientation of a library entry relative to its input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    /// The sequence as loaded.
    Forward,
    /// The reverse complement entry derived from a loaded sequence.
    ReverseComplement,
}

impl Strand {
    /// True for reverse-complement entries.
    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(self, Strand::ReverseComplement)
    }
}

/// Optional genomic placement of a reference, carried through to reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicInfo {
    /// Contig or chromosome name.
    pub contig: String,
    /// 1-based genomic coordinate of the first reference base.
    pub start: u64,
}

/// One entry of the reference library.
///
/// Immutable after library construction. `parent` is the library index of
/// the forward twin; forward entries point at themselves.
#[derive(Debug, Clone)]
pub struct Reference {
    index: usize,
    parent: usize,
    name: String,
    strand: Strand,
    bases: Vec<u8>,
    genomic: Option<GenomicInfo>,
}

impl Reference {
    /// Library index of this entry.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Library index of the forward twin (self for forward entries).
    #[must_use]
    pub fn parent(&self) -> usize {
        self.parent
    }

    /// Name of the reference as loaded.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry orientation.
    #[must_use]
    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// Uppercase nucleotide sequence.
    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// Sequence length in bases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// True if the sequence is empty (never the case after construction).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Genomic placement, if the loader supplied one.
    #[must_use]
    pub fn genomic(&self) -> Option<&GenomicInfo> {
        self.genomic.as_ref()
    }
}

/// An input sequence destined for the library.
#[derive(Debug, Clone)]
pub struct PanelEntry {
    /// Reference name (unique within the panel).
    pub name: String,
    /// Nucleotide sequence; case-insensitive on input.
    pub bases: Vec<u8>,
    /// Optional genomic placement.
    pub genomic: Option<GenomicInfo>,
}

impl PanelEntry {
    /// Convenience constructor without genomic placement.
    #[must_use]
    pub fn new(name: &str, bases: &[u8]) -> Self {
        Self { name: name.to_string(), bases: bases.to_vec(), genomic: None }
    }
}

/// Ordered, immutable set of references (forward + reverse-complement pairs).
///
/// Construction is the only place panel problems abort the run: duplicate
/// names, duplicate sequences, empty sequences, and an empty panel are all
/// fatal here, before any group processing starts.
#[derive(Debug, Clone)]
pub struct ReferenceLibrary {
    references: Arc<Vec<Reference>>,
}

impl ReferenceLibrary {
    /// Builds the library from panel entries.
    ///
    /// Entry `i` of the input produces library entries `2i` (forward) and
    /// `2i + 1` (reverse complement), preserving panel order.
    ///
    /// # Errors
    ///
    /// [`UmivarError::EmptyLibrary`] when no entries are given,
    /// [`UmivarError::InvalidRecord`] for an empty sequence, and
    /// [`UmivarError::DuplicateReference`] when two entries share a name or
    /// an (uppercased) sequence.
    pub fn new(entries: Vec<PanelEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(UmivarError::EmptyLibrary);
        }

        let mut references = Vec::with_capacity(entries.len() * 2);
        let mut seen_names: ahash::AHashMap<String, usize> = ahash::AHashMap::new();
        let mut seen_seqs: ahash::AHashMap<Vec<u8>, usize> = ahash::AHashMap::new();

        for (entry_idx, entry) in entries.into_iter().enumerate() {
            if entry.bases.is_empty() {
                return Err(UmivarError::InvalidRecord {
                    record_type: "reference".to_string(),
                    name: entry.name,
                    reason: "empty sequence".to_string(),
                });
            }

            let bases: Vec<u8> = entry.bases.iter().map(u8::to_ascii_uppercase).collect();

            if let Some(&other) = seen_names.get(&entry.name) {
                return Err(UmivarError::DuplicateReference {
                    name: entry.name,
                    reason: format!("name already used by panel entry {other}"),
                });
            }
            seen_names.insert(entry.name.clone(), entry_idx);

            if let Some(&other) = seen_seqs.get(&bases) {
                return Err(UmivarError::DuplicateReference {
                    name: entry.name,
                    reason: format!("sequence identical to panel entry {other}"),
                });
            }
            seen_seqs.insert(bases.clone(), entry_idx);

            let forward_index = references.len();
            let rc_bases = reverse_complement(&bases);
            references.push(Reference {
                index: forward_index,
                parent: forward_index,
                name: entry.name.clone(),
                strand: Strand::Forward,
                bases,
                genomic: entry.genomic.clone(),
            });
            references.push(Reference {
                index: forward_index + 1,
                parent: forward_index,
                name: entry.name,
                strand: Strand::ReverseComplement,
                bases: rc_bases,
                genomic: entry.genomic,
            });
        }

        Ok(Self { references: Arc::new(references) })
    }

    /// Total entry count (twice the panel size).
    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// True only before construction, which cannot be observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Number of forward references (the panel size).
    #[must_use]
    pub fn num_forward(&self) -> usize {
        self.references.len() / 2
    }

    /// Entry by library index.
    #[must_use]
    pub fn get(&self, index: usize) -> &Reference {
        &self.references[index]
    }

    /// All entries in library order.
    pub fn iter(&self) -> impl Iterator<Item = &Reference> {
        self.references.iter()
    }

    /// Forward entries only, in panel order.
    pub fn forward(&self) -> impl Iterator<Item = &Reference> {
        self.references.iter().filter(|r| !r.strand().is_reverse())
    }
}
