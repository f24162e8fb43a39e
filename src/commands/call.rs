//! Call variants from UMI-tagged amplicon reads.
//!
//! This module implements the `call` command, the full error-correction
//! pipeline: reads are grouped by UMI, each group is assembled into a
//! consensus, consensuses are mapped and aligned against the reference
//! panel, and the aggregated mutation counts feed the beta-binomial
//! background model that scores candidate variants.
//!
//! # Read Structure
//!
//! The read structure uses fgbio-style notation (e.g. `8M+T` meaning an
//! 8bp molecular barcode followed by template bases to the end of the
//! read). One structure is required per input FASTQ.

use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::Parser;
use log::{debug, info};

use crate::commands::command::Command;
use crate::commands::common::{AssemblyArgs, FastqInputOptions, RunArgs};
use umivar_lib::aligner::AlignerOptions;
use umivar_lib::index::DEFAULT_K;
use umivar_lib::io::{
    load_reference_panel, read_migs, write_consensus_fastq, write_table_dump, write_variant_report,
};
use umivar_lib::logging::{log_pipeline_summary, log_variant_summary, OperationTimer};
use umivar_lib::metrics::{write_metrics_auto, PipelineMetrics};
use umivar_lib::model::{ErrorModelMode, ErrorModelOptions};
use umivar_lib::pipeline::{Pipeline, PipelineOptions};
use umivar_lib::variant::VariantCallerOptions;

#[derive(Parser, Debug)]
#[command(
    name = "call",
    author,
    version,
    about = "\x1b[38;5;30m[VARIANT CALLING]\x1b[0m \x1b[36mAssemble UMI groups and call variants against a reference panel\x1b[0m",
    long_about = r#"
Calls rare variants from UMI-tagged amplicon reads.

Takes one or more FASTQ files (optionally gzipped), each representing a different sequencing
read (e.g. R1, R2), and a read structure per file describing which bases form the unique
molecular identifier and which are template. Reads sharing a UMI are assembled into one
error-corrected consensus per molecule; each consensus is mapped to the reference panel with a
k-mer index, locally aligned, and its mismatches are counted into per-position tables. A
beta-binomial background model fitted from within-group noise then scores every candidate
variant, and a chain of filters decides the final verdict.

## Read Structures

Read structures are made up of `<number><operator>` pairs much like the CIGAR string in BAM
files. The operators recognized here are `M` (unique molecular index), `T` (template), and `S`
(skip). The last pair may use `+` instead of a number to denote "all remaining bases".

For a paired-end run where the first 8 bases of R1 are the UMI:

  umivar call --inputs r1.fq.gz r2.fq.gz --read-structures 8M+T +T --panel panel.fa -o out.tsv

## Outputs

The variant report is a TSV with one row per candidate, carrying counts, frequency, the
background estimate, a Phred-like score, failed filter names, and the verdict (PASS, FAIL or
UNTESTABLE). Optional outputs cover the consensus reads as FASTQ, a full dump of the mutation
tables, and a single-row run metrics file.
"#
)]
#[command(verbatim_doc_comment)]
pub(crate) struct Call {
    #[command(flatten)]
    pub input: FastqInputOptions,

    /// Reference panel FASTA, optionally gzipped. Descriptions of the form
    /// `contig:start` place an entry on genomic coordinates
    #[arg(short = 'p', long = "panel")]
    panel: PathBuf,

    /// Output variant report TSV
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Optional FASTQ output with one record per assembled consensus
    #[arg(short = 'c', long = "consensus-out")]
    consensus_out: Option<PathBuf>,

    /// Optional TSV dump of the full mutation tables
    #[arg(long = "table-out")]
    table_out: Option<PathBuf>,

    /// Optional TSV with run metrics
    #[arg(short = 'm', long = "metrics")]
    metrics: Option<PathBuf>,

    /// K-mer size for the reference mapper
    #[arg(short = 'k', long = "kmer-size", default_value_t = DEFAULT_K)]
    kmer_size: usize,

    #[command(flatten)]
    pub assembly: AssemblyArgs,

    /// Minimum alignment identity for a consensus to be counted
    #[arg(long = "min-identity", default_value_t = 0.9)]
    min_identity: f64,

    /// Realign reads dropped during assembly and fold their disagreements
    /// into the minor counts (single-end input only)
    #[arg(long = "backalign-dropped")]
    backalign_dropped: bool,

    /// How the error model pools table cells
    #[arg(long = "model-mode", value_enum, default_value_t = ErrorModelMode::default())]
    model_mode: ErrorModelMode,

    /// Minimum group coverage for a cell to contribute to the model fit
    #[arg(long = "min-model-coverage", default_value_t = 10)]
    min_model_coverage: u64,

    /// Minimum Phred-like score for the quality filter
    #[arg(short = 'q', long = "quality-threshold", default_value_t = 20.0)]
    quality_threshold: f64,

    /// Frequency bound the singleton filter applies to single-group variants
    #[arg(long = "singleton-frequency-threshold", default_value_t = 1e-3)]
    singleton_frequency_threshold: f64,

    /// Minimum group coverage for the coverage filter
    #[arg(long = "min-coverage", default_value_t = 5)]
    min_coverage: u64,

    #[command(flatten)]
    pub run: RunArgs,
}

impl Call {
    fn validate(&self) -> Result<()> {
        self.input.validate()?;
        ensure!(self.panel.exists(), "Panel FASTA does not exist: {}", self.panel.display());
        ensure!(
            self.min_identity > 0.0 && self.min_identity <= 1.0,
            "--min-identity must be within (0, 1], got {}",
            self.min_identity
        );
        Ok(())
    }

    fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            k: self.kmer_size,
            assembler: self.assembly.to_options(),
            aligner: AlignerOptions {
                min_identity: self.min_identity,
                backalign_dropped: self.backalign_dropped,
                ..AlignerOptions::default()
            },
            model: ErrorModelOptions {
                mode: self.model_mode,
                min_model_coverage: self.min_model_coverage,
            },
            caller: VariantCallerOptions {
                quality_threshold: self.quality_threshold,
                singleton_frequency_threshold: self.singleton_frequency_threshold,
                min_coverage: self.min_coverage,
            },
            threads: self.run.threads,
            seed: self.run.seed,
        }
    }
}

impl Command for Call {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.validate()?;
        debug!("command line: {command_line}");

        let timer = OperationTimer::new("Calling variants");

        let panel = load_reference_panel(&self.panel)?;
        let pipeline = Pipeline::new(panel, self.pipeline_options())?;
        info!(
            "panel ready: {} reference(s), k-mer size {}",
            pipeline.library().num_forward(),
            self.kmer_size
        );

        let migs = read_migs(&self.input.inputs, &self.input.read_structures)?;
        let output = pipeline.run(&migs)?;

        log_pipeline_summary(&output.stats);
        log_variant_summary(&output.variants);

        write_variant_report(&self.output, &output.variants, pipeline.library())?;
        info!("wrote variant report: {}", self.output.display());

        if let Some(path) = &self.consensus_out {
            write_consensus_fastq(path, &output.consensuses)?;
            info!("wrote consensus FASTQ: {}", path.display());
        }
        if let Some(path) = &self.table_out {
            write_table_dump(path, &output.tables)?;
            info!("wrote table dump: {}", path.display());
        }
        if let Some(path) = &self.metrics {
            let row = PipelineMetrics::collect(
                &output.stats,
                pipeline.library().num_forward(),
                &output.variants,
            );
            write_metrics_auto(path, &[row])?;
            info!("wrote run metrics: {}", path.display());
        }

        timer.log_completion(output.stats.groups_in);
        Ok(())
    }
}
