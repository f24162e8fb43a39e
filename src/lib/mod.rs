#![deny(unsafe_code)]
// Clippy lint configuration for CI
// These lints are allowed because:
// - cast_*: Scientific/bioinformatics code intentionally casts between numeric types
// - missing_*_doc: Documentation improvements tracked separately
// - needless_pass_by_value: Some APIs designed for ownership transfer
// - items_after_statements: Some test code uses late item declarations
// - unused_self: Trait implementations may not use self
// - match_same_arms: Sometimes clearer to list arms explicitly
// - unnecessary_wraps: Some Result returns are for API consistency
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::items_after_statements,
    clippy::unused_self,
    clippy::match_same_arms,
    clippy::unnecessary_wraps,
    clippy::too_many_lines,
    clippy::redundant_closure_for_method_calls,
    clippy::explicit_iter_loop,
    clippy::struct_excessive_bools,
    clippy::map_unwrap_or,
    clippy::uninlined_format_args
)]

//! # umivar - UMI-Based Variant Calling Library
//!
//! This library turns UMI-grouped amplicon reads into error-corrected
//! consensuses and rare-variant calls. Reads sharing a molecular
//! identifier are assembled into one consensus per molecule, consensuses
//! are mapped and aligned against a reference panel, and the aggregated
//! per-position counts feed a beta-binomial background model that scores
//! candidate variants.
//!
//! ## Overview
//!
//! ### Core Functionality
//!
//! - **[`index`]** - K-mer reference mapping with information scoring
//! - **[`assemble`]** - Quality-aware per-molecule consensus assembly
//! - **[`aligner`]** - Local alignment and mutation extraction
//! - **[`table`]** - Concurrent per-position mutation count tables
//! - **[`model`]** - Beta-binomial sequencing-error background model
//! - **[`variant`]** - Candidate scoring and the filter chain
//! - **[`pipeline`]** - End-to-end orchestration across worker threads
//!
//! ### Utilities
//!
//! - **[`dna`]** - Base encoding, complementing, and k-mer packing
//! - **[`phred`]** - Phred quality arithmetic and FASTQ encoding
//! - **[`genomic`]** - Reference panels and genomic coordinates
//! - **[`mig`]** - Reads grouped by molecular identifier
//! - **[`io`]** - FASTA panels, FASTQ groups, and report writers
//! - **[`logging`]** - Formatted progress and summary logging
//! - **[`metrics`]** - Structured metrics types and file writing utilities
//!
//! ## Quick Start
//!
//! ### Running the Pipeline
//!
//! ```no_run
//! use umivar_lib::genomic::PanelEntry;
//! use umivar_lib::mig::{Mig, SeqRead};
//! use umivar_lib::pipeline::{Pipeline, PipelineOptions};
//!
//! # fn main() -> umivar_lib::errors::Result<()> {
//! let panel = vec![PanelEntry::new("BRAF_e15", b"TCATAATGCTTGCTCTGATAGGAAAATGAGATCTACTGTTTTCCTTTACTTACTACACCTCAGA")];
//! let pipeline = Pipeline::new(panel, PipelineOptions::default())?;
//!
//! let reads = vec![SeqRead::with_uniform_quality(b"TCATAATGCTTGCTCTGATAGGAAAATGAGATCTACTGT", 30)];
//! let migs = vec![Mig::single(b"ACGTACGT", reads)];
//! let output = pipeline.run(&migs)?;
//! println!("{} candidate variants", output.variants.len());
//! # Ok(())
//! # }
//! ```
//!
//! ### Mapping a Sequence Against a Panel
//!
//! ```
//! use umivar_lib::genomic::{PanelEntry, ReferenceLibrary};
//! use umivar_lib::index::{KmerIndex, DEFAULT_K};
//!
//! # fn main() -> umivar_lib::errors::Result<()> {
//! let library = ReferenceLibrary::new(vec![PanelEntry::new(
//!     "amplicon",
//!     b"ACGTGACCTTAGCAAGTCCGATAAGCTTGCGC",
//! )])?;
//! let index = KmerIndex::build(&library, DEFAULT_K)?;
//!
//! let hit = index.find(b"GACCTTAGCAAGTCCGATAAG").unwrap();
//! assert_eq!(index.library().get(hit.reference_index).name(), "amplicon");
//! # Ok(())
//! # }
//! ```
//!
//! ## See Also
//!
//! - [MAGERI](https://github.com/mikessh/mageri) - the UMI-guided error
//!   correction approach this library follows
//! - [noodles](https://github.com/zaeleus/noodles) - Rust bioinformatics I/O

pub mod aligner;
pub mod assemble;
pub mod dna;
pub mod errors;
pub mod genomic;
pub mod index;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod mig;
pub mod model;
pub mod mutations;
pub mod phred;
pub mod pipeline;
pub mod table;
pub mod variant;
