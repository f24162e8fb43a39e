//! Mutation representation.
//!
//! Mutations are reference-relative with 0-based positions internally and
//! 1-based positions in any textual form. A consensus's mutations live in a
//! [`MutationArray`]: a flat arena of mutations plus a separate bit mask of
//! filtered flags addressed by index, so filter bookkeeping never needs a
//! back-pointer from a mutation into its parent collection.

use std::fmt;

/// A single mutation relative to a reference sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mutation {
    /// Base change at `position`.
    Substitution {
        /// 0-based reference position.
        position: usize,
        /// Reference base.
        from: u8,
        /// Observed base.
        to: u8,
    },
    /// Bases inserted before `position`.
    Insertion {
        /// 0-based reference position the run is anchored in front of.
        position: usize,
        /// Inserted bases, in order.
        bases: Vec<u8>,
    },
    /// Reference bases deleted starting at `position`.
    Deletion {
        /// 0-based reference position of the first deleted base.
        position: usize,
        /// The deleted reference bases.
        bases: Vec<u8>,
    },
}

impl Mutation {
    /// 0-based reference position of the event.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Mutation::Substitution { position, .. }
            | Mutation::Insertion { position, .. }
            | Mutation::Deletion { position, .. } => *position,
        }
    }

    /// True for substitutions.
    #[must_use]
    pub fn is_substitution(&self) -> bool {
        matches!(self, Mutation::Substitution { .. })
    }
}

impl fmt::Display for Mutation {
    /// Compact textual form with 1-based positions: `S3:A>G`, `I27:AG`,
    /// `D48:TTC`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Substitution { position, from, to } => {
                write!(f, "S{}:{}>{}", position + 1, *from as char, *to as char)
            }
            Mutation::Insertion { position, bases } => {
                write!(f, "I{}:{}", position + 1, String::from_utf8_lossy(bases))
            }
            Mutation::Deletion { position, bases } => {
                write!(f, "D{}:{}", position + 1, String::from_utf8_lossy(bases))
            }
        }
    }
}

/// Bit set addressed by mutation index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FilterMask {
    words: Vec<u64>,
}

impl FilterMask {
    fn with_len(len: usize) -> Self {
        Self { words: vec![0; len.div_ceil(64)] }
    }

    fn get(&self, index: usize) -> bool {
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    fn set(&mut self, index: usize, value: bool) {
        let word = &mut self.words[index / 64];
        let bit = 1u64 << (index % 64);
        if value {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }

    fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// The mutations assigned to one consensus, with per-entry filtered flags.
///
/// Entries keep the order they were extracted in (ascending reference
/// position). Filtering marks an entry without removing it, so reports can
/// show both what was seen and what survived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationArray {
    mutations: Vec<Mutation>,
    filtered: FilterMask,
}

impl MutationArray {
    /// Wraps extracted mutations; all entries start unfiltered.
    #[must_use]
    pub fn new(mutations: Vec<Mutation>) -> Self {
        let filtered = FilterMask::with_len(mutations.len());
        Self { mutations, filtered }
    }

    /// Number of entries, filtered or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// True when no mutations were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Entry by index.
    #[must_use]
    pub fn get(&self, index: usize) -> &Mutation {
        &self.mutations[index]
    }

    /// All entries in extraction order.
    pub fn iter(&self) -> impl Iterator<Item = &Mutation> {
        self.mutations.iter()
    }

    /// Sets or clears the filtered flag of one entry.
    pub fn set_filtered(&mut self, index: usize, filtered: bool) {
        assert!(index < self.mutations.len());
        self.filtered.set(index, filtered);
    }

    /// True when the entry has been filtered out.
    #[must_use]
    pub fn is_filtered(&self, index: usize) -> bool {
        self.filtered.get(index)
    }

    /// Number of filtered entries.
    #[must_use]
    pub fn num_filtered(&self) -> usize {
        self.filtered.count_ones()
    }

    /// Entries that survived filtering, with their indices.
    pub fn unfiltered(&self) -> impl Iterator<Item = (usize, &Mutation)> {
        self.mutations.iter().enumerate().filter(|(index, _)| !self.filtered.get(*index))
    }

    /// Renders the surviving entries as a comma-separated summary.
    #[must_use]
    pub fn summary(&self) -> String {
        self.unfiltered().map(|(_, m)| m.to_string()).collect::<Vec<_>>().join(",")
    }
}
