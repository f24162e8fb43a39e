//! Shared mutation count accumulation.
//!
//! One table per forward reference, shaped reference-length by four bases
//! and never resized. Worker threads append coverage and mutation counts
//! through relaxed atomic adds, so the final table depends only on the
//! set of aligned consensuses, not on processing order.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::aligner::{AlignedConsensus, MinorMutation};
use crate::dna::{base_index, BASES};
use crate::genomic::{Reference, ReferenceLibrary};
use crate::mutations::{Mutation, MutationArray};

/// The six counters backing one (position, base) cell.
///
/// Coverage is a property of the position; it is repeated across the
/// position's four cells so a cell read is self-contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellCounts {
    /// Reads covering the position.
    pub coverage_reads: u64,
    /// Groups covering the position.
    pub coverage_migs: u64,
    /// Reads in groups whose consensus carried this base as a major.
    pub major_reads: u64,
    /// Groups whose consensus carried this base as a major.
    pub major_migs: u64,
    /// Reads carrying this base as within-group noise.
    pub minor_reads: u64,
    /// Groups in which this base appeared as within-group noise.
    pub minor_migs: u64,
}

/// Mutation counts for one forward reference.
#[derive(Debug)]
pub struct MutationsTable {
    reference_index: usize,
    length: usize,
    coverage_reads: Vec<AtomicU64>,
    coverage_migs: Vec<AtomicU64>,
    major_reads: Vec<AtomicU64>,
    major_migs: Vec<AtomicU64>,
    minor_reads: Vec<AtomicU64>,
    minor_migs: Vec<AtomicU64>,
}

impl MutationsTable {
    fn new(reference: &Reference) -> Self {
        let length = reference.len();
        let zeros = |n: usize| (0..n).map(|_| AtomicU64::new(0)).collect::<Vec<_>>();
        Self {
            reference_index: reference.index(),
            length,
            coverage_reads: zeros(length),
            coverage_migs: zeros(length),
            major_reads: zeros(length * 4),
            major_migs: zeros(length * 4),
            minor_reads: zeros(length * 4),
            minor_migs: zeros(length * 4),
        }
    }

    /// Library index of the forward reference this table covers.
    #[must_use]
    pub fn reference_index(&self) -> usize {
        self.reference_index
    }

    /// Reference length in positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    /// True for a zero-length reference; never occurs for a built library.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn cell_slot(&self, position: usize, base_code: usize) -> usize {
        debug_assert!(position < self.length);
        debug_assert!(base_code < 4);
        position * 4 + base_code
    }

    /// Reads one cell. Counter loads are relaxed; a consistent snapshot
    /// requires appends to have quiesced.
    #[must_use]
    pub fn cell(&self, position: usize, base_code: usize) -> CellCounts {
        let slot = self.cell_slot(position, base_code);
        CellCounts {
            coverage_reads: self.coverage_reads[position].load(Ordering::Relaxed),
            coverage_migs: self.coverage_migs[position].load(Ordering::Relaxed),
            major_reads: self.major_reads[slot].load(Ordering::Relaxed),
            major_migs: self.major_migs[slot].load(Ordering::Relaxed),
            minor_reads: self.minor_reads[slot].load(Ordering::Relaxed),
            minor_migs: self.minor_migs[slot].load(Ordering::Relaxed),
        }
    }

    /// Group and read coverage at a position.
    #[must_use]
    pub fn coverage(&self, position: usize) -> (u64, u64) {
        (
            self.coverage_reads[position].load(Ordering::Relaxed),
            self.coverage_migs[position].load(Ordering::Relaxed),
        )
    }

    fn add_coverage(&self, range: (usize, usize), assembled_size: usize) {
        let end = range.1.min(self.length);
        for position in range.0..end {
            self.coverage_reads[position].fetch_add(assembled_size as u64, Ordering::Relaxed);
            self.coverage_migs[position].fetch_add(1, Ordering::Relaxed);
        }
    }

    fn add_major(&self, position: usize, base_code: usize, assembled_size: usize) {
        let slot = self.cell_slot(position, base_code);
        self.major_reads[slot].fetch_add(assembled_size as u64, Ordering::Relaxed);
        self.major_migs[slot].fetch_add(1, Ordering::Relaxed);
    }

    fn add_minor(&self, position: usize, base_code: usize, reads: usize) {
        let slot = self.cell_slot(position, base_code);
        self.minor_reads[slot].fetch_add(reads as u64, Ordering::Relaxed);
        self.minor_migs[slot].fetch_add(1, Ordering::Relaxed);
    }
}

/// One TSV row of a table dump.
#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    /// Reference name.
    pub reference: String,
    /// 1-based reference position.
    pub position: usize,
    /// The reference base at the position.
    pub ref_base: char,
    /// The cell's base.
    pub base: char,
    pub coverage_reads: u64,
    pub coverage_migs: u64,
    pub major_reads: u64,
    pub major_migs: u64,
    pub minor_reads: u64,
    pub minor_migs: u64,
}

/// The tables for every forward reference of a library.
#[derive(Debug)]
pub struct MutationsTableSet {
    library: ReferenceLibrary,
    tables: Vec<MutationsTable>,
    slots: ahash::AHashMap<usize, usize>,
}

impl MutationsTableSet {
    /// Builds zeroed tables for each forward reference.
    #[must_use]
    pub fn new(library: &ReferenceLibrary) -> Self {
        let mut tables = Vec::with_capacity(library.num_forward());
        let mut slots = ahash::AHashMap::with_capacity(library.num_forward());
        for reference in library.forward() {
            slots.insert(reference.index(), tables.len());
            tables.push(MutationsTable::new(reference));
        }
        Self { library: library.clone(), tables, slots }
    }

    /// The library the tables were built for.
    #[must_use]
    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    /// The table for a forward reference index.
    #[must_use]
    pub fn get(&self, reference_index: usize) -> Option<&MutationsTable> {
        self.slots.get(&reference_index).map(|&slot| &self.tables[slot])
    }

    /// Tables in library order.
    pub fn iter(&self) -> impl Iterator<Item = &MutationsTable> {
        self.tables.iter()
    }

    /// Adds one group's coverage over its aligned interval.
    pub fn append_coverage(
        &self,
        reference_index: usize,
        range: (usize, usize),
        assembled_size: usize,
    ) {
        if let Some(&slot) = self.slots.get(&reference_index) {
            self.tables[slot].add_coverage(range, assembled_size);
        }
    }

    /// Adds one group's surviving major substitutions and its minor
    /// mutations. Indel majors have no (position, base) cell and are
    /// left to the per-consensus outputs.
    pub fn append_mutations(
        &self,
        reference_index: usize,
        majors: &MutationArray,
        minors: &[MinorMutation],
        assembled_size: usize,
    ) {
        let Some(&slot) = self.slots.get(&reference_index) else {
            return;
        };
        let table = &self.tables[slot];
        for (_, mutation) in majors.unfiltered() {
            if let Mutation::Substitution { position, to, .. } = mutation {
                if let Some(code) = base_index(*to) {
                    table.add_major(*position, code, assembled_size);
                }
            }
        }
        for minor in minors {
            if let Some(code) = base_index(minor.base) {
                table.add_minor(minor.position, code, minor.reads);
            }
        }
    }

    /// Records an aligned consensus: coverage plus mutation counts, each
    /// applied exactly once.
    pub fn record(&self, aligned: &AlignedConsensus) {
        self.append_coverage(
            aligned.reference_index(),
            aligned.reference_range(),
            aligned.assembled_size(),
        );
        self.append_mutations(
            aligned.reference_index(),
            aligned.mutations(),
            aligned.minor_mutations(),
            aligned.assembled_size(),
        );
    }

    /// Snapshots every cell as dump rows, reference by reference.
    #[must_use]
    pub fn rows(&self) -> Vec<TableRow> {
        let mut rows = Vec::new();
        for table in &self.tables {
            let reference = self.library.get(table.reference_index());
            for position in 0..table.len() {
                for (code, &base) in BASES.iter().enumerate() {
                    let cell = table.cell(position, code);
                    rows.push(TableRow {
                        reference: reference.name().to_string(),
                        position: position + 1,
                        ref_base: reference.bases()[position] as char,
                        base: base as char,
                        coverage_reads: cell.coverage_reads,
                        coverage_migs: cell.coverage_migs,
                        major_reads: cell.major_reads,
                        major_migs: cell.major_migs,
                        minor_reads: cell.minor_reads,
                        minor_migs: cell.minor_migs,
                    });
                }
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomic::PanelEntry;

    const REF: &[u8] = b"ACGTGACCTTAGCAAGTCCG";

    fn table_set() -> MutationsTableSet {
        let library = ReferenceLibrary::new(vec![PanelEntry::new("amp", REF)]).unwrap();
        MutationsTableSet::new(&library)
    }

    #[test]
    fn test_coverage_accumulates_over_interval() {
        let tables = table_set();
        tables.append_coverage(0, (2, 6), 5);
        tables.append_coverage(0, (4, 8), 3);

        let table = tables.get(0).unwrap();
        assert_eq!(table.coverage(1), (0, 0));
        assert_eq!(table.coverage(2), (5, 1));
        assert_eq!(table.coverage(5), (8, 2));
        assert_eq!(table.coverage(7), (3, 1));
    }

    #[test]
    fn test_major_substitutions_count_under_their_cell() {
        let tables = table_set();
        let majors = MutationArray::new(vec![Mutation::Substitution {
            position: 4,
            from: b'G',
            to: b'T',
        }]);
        tables.append_mutations(0, &majors, &[], 6);

        let cell = tables.get(0).unwrap().cell(4, 3);
        assert_eq!(cell.major_migs, 1);
        assert_eq!(cell.major_reads, 6);
        // The other bases at the position stay untouched
        assert_eq!(tables.get(0).unwrap().cell(4, 0).major_migs, 0);
    }

    #[test]
    fn test_filtered_majors_are_not_counted() {
        let tables = table_set();
        let mut majors = MutationArray::new(vec![Mutation::Substitution {
            position: 4,
            from: b'G',
            to: b'T',
        }]);
        majors.set_filtered(0, true);
        tables.append_mutations(0, &majors, &[], 6);

        assert_eq!(tables.get(0).unwrap().cell(4, 3).major_migs, 0);
    }

    #[test]
    fn test_indel_majors_have_no_cell() {
        let tables = table_set();
        let majors = MutationArray::new(vec![
            Mutation::Insertion { position: 3, bases: b"AT".to_vec() },
            Mutation::Deletion { position: 7, bases: b"CT".to_vec() },
        ]);
        tables.append_mutations(0, &majors, &[], 4);

        let table = tables.get(0).unwrap();
        for position in 0..table.len() {
            for code in 0..4 {
                assert_eq!(table.cell(position, code).major_migs, 0);
            }
        }
    }

    #[test]
    fn test_minor_mutations_count_reads_and_migs() {
        let tables = table_set();
        tables.append_mutations(
            0,
            &MutationArray::new(vec![]),
            &[MinorMutation { position: 9, base: b'A', reads: 3 }],
            10,
        );
        tables.append_mutations(
            0,
            &MutationArray::new(vec![]),
            &[MinorMutation { position: 9, base: b'A', reads: 1 }],
            4,
        );

        let cell = tables.get(0).unwrap().cell(9, 0);
        assert_eq!(cell.minor_migs, 2);
        assert_eq!(cell.minor_reads, 4);
    }

    #[test]
    fn test_unknown_reference_is_ignored() {
        let tables = table_set();
        tables.append_coverage(17, (0, 5), 2);
        assert_eq!(tables.get(0).unwrap().coverage(0), (0, 0));
    }

    #[test]
    fn test_concurrent_appends_match_sequential() {
        let concurrent = table_set();
        let sequential = table_set();
        let minor = [MinorMutation { position: 3, base: b'C', reads: 2 }];

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        concurrent.append_coverage(0, (0, 10), 3);
                        let majors = MutationArray::new(vec![Mutation::Substitution {
                            position: 6,
                            from: b'C',
                            to: b'G',
                        }]);
                        concurrent.append_mutations(0, &majors, &minor, 3);
                    }
                });
            }
        });
        for _ in 0..1000 {
            sequential.append_coverage(0, (0, 10), 3);
            let majors = MutationArray::new(vec![Mutation::Substitution {
                position: 6,
                from: b'C',
                to: b'G',
            }]);
            sequential.append_mutations(0, &majors, &minor, 3);
        }

        for position in 0..REF.len() {
            for code in 0..4 {
                assert_eq!(
                    concurrent.get(0).unwrap().cell(position, code),
                    sequential.get(0).unwrap().cell(position, code)
                );
            }
        }
    }

    #[test]
    fn test_rows_cover_every_cell() {
        let tables = table_set();
        tables.append_coverage(0, (0, REF.len()), 2);
        let rows = tables.rows();

        assert_eq!(rows.len(), REF.len() * 4);
        assert_eq!(rows[0].reference, "amp");
        assert_eq!(rows[0].position, 1);
        assert_eq!(rows[0].ref_base, 'A');
        assert_eq!(rows[0].base, 'A');
        assert!(rows.iter().all(|row| row.coverage_migs == 2));
    }
}
