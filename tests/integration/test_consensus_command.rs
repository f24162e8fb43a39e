//! Integration tests for the consensus command.
//!
//! Tests end-to-end assembly workflows with different compression formats.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use crate::helpers::{
    create_gzip_fastq, create_plain_fastq, read_text, tagged_records, FastqRecord,
};

const TEMPLATE: &[u8] = b"CCATGATTCGGAAGCTTGCAACGGTTAGCATC";

fn umivar() -> Command {
    Command::new(env!("CARGO_BIN_EXE_umivar"))
}

/// One three-read group and one two-read group over the same template.
fn two_groups() -> Vec<FastqRecord> {
    let mut records = tagged_records("AAAA", TEMPLATE, 3);
    records.extend(tagged_records("CCCC", TEMPLATE, 2));
    records
}

fn run_consensus(input: &Path, output: &Path, extra: &[&str]) {
    let status = umivar()
        .args([
            "consensus",
            "--inputs",
            input.to_str().unwrap(),
            "--read-structures",
            "4M+T",
            "--output",
            output.to_str().unwrap(),
        ])
        .args(extra)
        .status()
        .expect("Failed to execute consensus command");
    assert!(status.success(), "consensus command failed");
}

#[test]
fn test_consensus_writes_one_record_per_group() {
    let tmp = TempDir::new().unwrap();
    let input = create_plain_fastq(&tmp, "r1.fq", &two_groups());
    let output = tmp.path().join("consensus.fq");

    run_consensus(&input, &output, &[]);

    let text = read_text(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 8, "two groups, four FASTQ lines each");
    assert_eq!(lines[0], "@AAAA assembled=3 true=3");
    assert_eq!(lines[1].as_bytes(), TEMPLATE);
    assert_eq!(lines[4], "@CCCC assembled=2 true=2");
    assert_eq!(lines[5].as_bytes(), TEMPLATE);
}

#[test]
fn test_consensus_gzip_input_and_output_round_trip() {
    let tmp = TempDir::new().unwrap();
    let records = two_groups();
    let plain = create_plain_fastq(&tmp, "r1.fq", &records);
    let gzipped = create_gzip_fastq(&tmp, "r1.fq.gz", &records);

    let plain_out = tmp.path().join("plain.fq");
    let gzip_out = tmp.path().join("compressed.fq.gz");
    run_consensus(&plain, &plain_out, &[]);
    run_consensus(&gzipped, &gzip_out, &[]);

    assert_eq!(
        read_text(&plain_out),
        read_text(&gzip_out),
        "compression must not change the assembled records"
    );
}

#[test]
fn test_consensus_min_reads_drops_small_groups() {
    let tmp = TempDir::new().unwrap();
    let input = create_plain_fastq(&tmp, "r1.fq", &two_groups());
    let output = tmp.path().join("consensus.fq");

    run_consensus(&input, &output, &["--min-reads", "3"]);

    let text = read_text(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4, "the two-read group falls below the floor");
    assert_eq!(lines[0], "@AAAA assembled=3 true=3");
}

#[test]
fn test_consensus_paired_inputs_interleave_mates() {
    let tmp = TempDir::new().unwrap();
    let first_template = "GATTACAGGCATCGTTAACGGTCCAGT";
    let second_template = "TTCGAACCGGTTAACGCATGCA";

    let r1: Vec<FastqRecord> = (0..2)
        .map(|i| {
            (
                format!("p{i}/1"),
                format!("AAAA{first_template}"),
                "I".repeat(4 + first_template.len()),
            )
        })
        .collect();
    let r2: Vec<FastqRecord> = (0..2)
        .map(|i| (format!("p{i}/2"), second_template.to_string(), "I".repeat(second_template.len())))
        .collect();

    let r1_path = create_plain_fastq(&tmp, "r1.fq", &r1);
    let r2_path = create_plain_fastq(&tmp, "r2.fq", &r2);
    let output = tmp.path().join("consensus.fq");

    let status = umivar()
        .args([
            "consensus",
            "--inputs",
            r1_path.to_str().unwrap(),
            r2_path.to_str().unwrap(),
            "--read-structures",
            "4M+T",
            "+T",
            "--output",
            output.to_str().unwrap(),
        ])
        .status()
        .expect("Failed to execute consensus command");
    assert!(status.success(), "consensus command failed");

    let text = read_text(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 8, "one pair of records for the single group");
    assert_eq!(lines[0], "@AAAA/1 assembled=2 true=2");
    assert_eq!(lines[1], first_template);
    assert_eq!(lines[4], "@AAAA/2 assembled=2 true=2");
    assert_eq!(lines[5], second_template);
}
