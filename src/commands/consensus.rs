//! Assemble UMI groups into consensus reads.
//!
//! This module implements the `consensus` command: the assembly stage of
//! the pipeline run on its own, without a reference panel. Reads sharing
//! a UMI are collapsed into one error-corrected consensus per molecule
//! and written out as FASTQ, with the group's assembled and total read
//! counts recorded in each record head.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::commands::command::Command;
use crate::commands::common::{AssemblyArgs, FastqInputOptions, RunArgs};
use umivar_lib::assemble::{Assembler, ConsensusOutcome};
use umivar_lib::io::{read_migs, write_consensus_fastq};
use umivar_lib::logging::OperationTimer;
use umivar_lib::pipeline::group_rng;

#[derive(Parser, Debug)]
#[command(
    name = "consensus",
    author,
    version,
    about = "\x1b[38;5;30m[CONSENSUS]\x1b[0m \x1b[36mAssemble UMI groups into consensus reads\x1b[0m",
    long_about = r#"
Assembles UMI groups into error-corrected consensus reads.

Takes one or more FASTQ files (optionally gzipped) plus a read structure per file describing
which bases form the unique molecular identifier and which are template. Reads sharing a UMI
vote column by column, weighted by base quality; the winning base and an agreement-derived
quality are written per column, and groups with too few usable reads are dropped.

For paired-end input each molecule yields two consensus records, written interleaved with
`/1` and `/2` name suffixes.

Example:

  umivar consensus --inputs r1.fq.gz r2.fq.gz --read-structures 8M+T +T -o consensus.fq.gz
"#
)]
#[command(verbatim_doc_comment)]
pub(crate) struct Consensus {
    #[command(flatten)]
    pub input: FastqInputOptions,

    /// Output FASTQ of consensus reads, gzipped when the path ends in .gz
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    #[command(flatten)]
    pub assembly: AssemblyArgs,

    #[command(flatten)]
    pub run: RunArgs,
}

impl Command for Consensus {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.input.validate()?;
        debug!("command line: {command_line}");

        let timer = OperationTimer::new("Assembling consensus reads");
        let migs = read_migs(&self.input.inputs, &self.input.read_structures)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.run.threads)
            .build()
            .context("Failed to build the worker thread pool")?;
        let assembler = Assembler::new(self.assembly.to_options());
        let seed = self.run.seed;
        let collected: Mutex<Vec<(usize, ConsensusOutcome)>> = Mutex::new(Vec::new());
        let dropped = AtomicU64::new(0);

        pool.install(|| {
            migs.par_iter().enumerate().for_each(|(group_index, mig)| {
                let mut rng = group_rng(seed, group_index);
                match assembler.assemble(mig, &mut rng) {
                    Some(outcome) => collected.lock().push((group_index, outcome)),
                    None => {
                        dropped.fetch_add(1, Ordering::Relaxed);
                        debug!("group {} dropped: too few usable reads", mig.umi_string());
                    }
                }
            });
        });

        let mut collected = collected.into_inner();
        collected.sort_unstable_by_key(|(group_index, _)| *group_index);
        let outcomes: Vec<ConsensusOutcome> =
            collected.into_iter().map(|(_, outcome)| outcome).collect();

        let dropped = dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            info!("dropped {dropped} group(s) below the read threshold");
        }
        write_consensus_fastq(&self.output, &outcomes)?;
        info!("wrote consensus FASTQ: {}", self.output.display());

        timer.log_completion(outcomes.len() as u64);
        Ok(())
    }
}
