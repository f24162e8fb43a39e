//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::Args;
use read_structure::ReadStructure;

use umivar_lib::assemble::AssemblerOptions;
use umivar_lib::io::validate_read_layout;

/// Input FASTQ files and their read structures.
#[derive(Debug, Clone, Args)]
pub struct FastqInputOptions {
    /// Input FASTQ files, one per sequencing read (e.g. R1, R2), optionally gzipped
    #[arg(short = 'i', long = "inputs", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Read structures, one per input FASTQ (e.g. 8M+T +T)
    #[arg(short = 'r', long = "read-structures", required = true, num_args = 1..)]
    pub read_structures: Vec<ReadStructure>,
}

impl FastqInputOptions {
    /// Validates that the inputs exist and the layout carries a UMI plus
    /// one or two template reads.
    ///
    /// # Errors
    ///
    /// Returns an error when an input is missing or the layout is unusable.
    pub fn validate(&self) -> Result<()> {
        for input in &self.inputs {
            ensure!(input.exists(), "Input FASTQ does not exist: {}", input.display());
        }
        validate_read_layout(&self.inputs, &self.read_structures)
    }
}

/// Consensus assembly thresholds shared by the assembling commands.
#[derive(Debug, Clone, Args)]
pub struct AssemblyArgs {
    /// Minimum reads surviving the quality gate for a group to assemble
    #[arg(long = "min-reads", default_value_t = 1)]
    pub min_reads: usize,

    /// Reads with mean quality below this do not vote
    #[arg(long = "min-read-quality", default_value_t = 20.0)]
    pub min_read_quality: f64,

    /// Per-base quality at or above this counts as a good observation
    #[arg(long = "good-quality", default_value_t = 25)]
    pub good_quality: u8,

    /// Minimum fraction of a column's good observations for a losing base
    /// to be kept as a minor site
    #[arg(long = "minor-frequency-threshold", default_value_t = 0.0)]
    pub minor_frequency_threshold: f64,

    /// Consensus columns with agreement quality below this are masked
    #[arg(long = "consensus-quality", default_value_t = 20)]
    pub consensus_quality: u8,
}

impl AssemblyArgs {
    /// Maps the CLI arguments onto assembler options.
    #[must_use]
    pub fn to_options(&self) -> AssemblerOptions {
        AssemblerOptions {
            min_read_quality: self.min_read_quality,
            good_quality_threshold: self.good_quality,
            min_reads: self.min_reads,
            minor_frequency_threshold: self.minor_frequency_threshold,
            consensus_quality_threshold: self.consensus_quality,
        }
    }
}

/// Threading and reproducibility options.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Worker threads for group processing (0 = one per core)
    #[arg(short = 't', long = "threads", default_value_t = 0)]
    pub threads: usize,

    /// Seed for reproducible runs; omit to draw entropy from the OS
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}
