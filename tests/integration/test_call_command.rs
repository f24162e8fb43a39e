//! Integration tests for the call command.
//!
//! Runs the binary end to end over FASTQ and panel files and checks the
//! written reports.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use crate::helpers::{
    create_gzip_fastq, create_panel_fasta, create_plain_fastq, read_text, tagged_records,
    FastqRecord,
};

/// 60 bp amplicon shared by these tests; offset 25 is a G.
const REFERENCE: &[u8] = b"GATTCGAACCGTGGCTAAGCTTACGGTCAATCGGTACCAGTTCGAAGGCTTAACGGATCC";

fn umivar() -> Command {
    Command::new(env!("CARGO_BIN_EXE_umivar"))
}

fn mutated_reference() -> Vec<u8> {
    let mut bases = REFERENCE.to_vec();
    bases[25] = b'A';
    bases
}

/// Four clean groups of three reads plus two groups carrying G>A at
/// offset 25.
fn standard_records() -> Vec<FastqRecord> {
    let mut records = Vec::new();
    for umi in ["AAAA", "CCGG", "GGTT", "TTCC"] {
        records.extend(tagged_records(umi, REFERENCE, 3));
    }
    for umi in ["ACAC", "GTGT"] {
        records.extend(tagged_records(umi, &mutated_reference(), 3));
    }
    records
}

fn run_call(input: &Path, panel: &Path, report: &Path, extra: &[&str]) {
    let status = umivar()
        .args([
            "call",
            "--inputs",
            input.to_str().unwrap(),
            "--read-structures",
            "4M+T",
            "--panel",
            panel.to_str().unwrap(),
            "--output",
            report.to_str().unwrap(),
            "--seed",
            "11",
        ])
        .args(extra)
        .status()
        .expect("Failed to execute call command");
    assert!(status.success(), "call command failed");
}

#[test]
fn test_call_reports_the_injected_variant() {
    let tmp = TempDir::new().unwrap();
    let input = create_plain_fastq(&tmp, "r1.fq", &standard_records());
    let panel = create_panel_fasta(&tmp, "panel.fa", &[("amplicon", REFERENCE)]);
    let report = tmp.path().join("variants.tsv");

    run_call(&input, &panel, &report, &[]);

    let text = read_text(&report);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2, "expected a header and exactly one variant row");
    assert!(lines[0].starts_with("reference\tcontig\tposition"));

    let fields: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(fields[0], "amplicon");
    assert_eq!(fields[1], "amplicon", "no genomic placement, local coordinates");
    assert_eq!(fields[2], "26", "1-based position of offset 25");
    assert_eq!(fields[3], "G");
    assert_eq!(fields[4], "A");
    assert_eq!(fields[5], "2", "two groups carried the alternate");
    assert_eq!(fields[6], "6", "six groups covered the position");
    assert_eq!(fields[7], "6");
    assert_eq!(fields[8], "18");
    assert_eq!(fields[9], "0");
    assert_eq!(fields[10], "0.333333");
    assert_eq!(fields[13], "qual", "an unscored variant fails the quality filter");
    assert_eq!(fields[14], "UNTESTABLE", "noise-free input gives a degenerate fit");
}

#[test]
fn test_call_gzip_input_matches_plain_input() {
    let tmp = TempDir::new().unwrap();
    let records = standard_records();
    let plain = create_plain_fastq(&tmp, "r1.fq", &records);
    let gzipped = create_gzip_fastq(&tmp, "r1.fq.gz", &records);
    let panel = create_panel_fasta(&tmp, "panel.fa", &[("amplicon", REFERENCE)]);

    let plain_report = tmp.path().join("plain.tsv");
    let gzip_report = tmp.path().join("gzip.tsv");
    run_call(&plain, &panel, &plain_report, &[]);
    run_call(&gzipped, &panel, &gzip_report, &[]);

    assert_eq!(
        read_text(&plain_report),
        read_text(&gzip_report),
        "compression of the input must not change the report"
    );
}

#[test]
fn test_call_genomic_panel_description_shifts_coordinates() {
    let tmp = TempDir::new().unwrap();
    let input = create_plain_fastq(&tmp, "r1.fq", &standard_records());
    let panel = create_panel_fasta(&tmp, "panel.fa", &[("amplicon chr7:55242410", REFERENCE)]);
    let report = tmp.path().join("variants.tsv");

    run_call(&input, &panel, &report, &[]);

    let text = read_text(&report);
    let fields: Vec<&str> = text.lines().nth(1).unwrap().split('\t').collect();
    assert_eq!(fields[1], "chr7");
    assert_eq!(fields[2], "55242435", "start 55242410 plus offset 25");
}

#[test]
fn test_call_writes_optional_outputs() {
    let tmp = TempDir::new().unwrap();
    let input = create_plain_fastq(&tmp, "r1.fq", &standard_records());
    let panel = create_panel_fasta(&tmp, "panel.fa", &[("amplicon", REFERENCE)]);
    let report = tmp.path().join("variants.tsv");
    let consensus = tmp.path().join("consensus.fq");
    let table = tmp.path().join("table.tsv");
    let metrics = tmp.path().join("metrics.tsv");

    run_call(
        &input,
        &panel,
        &report,
        &[
            "--consensus-out",
            consensus.to_str().unwrap(),
            "--table-out",
            table.to_str().unwrap(),
            "--metrics",
            metrics.to_str().unwrap(),
        ],
    );

    let consensus_text = read_text(&consensus);
    assert_eq!(consensus_text.lines().count(), 24, "six groups, four FASTQ lines each");
    assert!(consensus_text.starts_with("@AAAA assembled=3 true=3"), "groups sorted by UMI");

    let table_text = read_text(&table);
    assert_eq!(
        table_text.lines().count(),
        REFERENCE.len() * 4 + 1,
        "one row per (position, base) cell plus a header"
    );

    let metrics_text = read_text(&metrics);
    let lines: Vec<&str> = metrics_text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("references\tgroups_in"));
}

#[test]
fn test_call_rejects_mismatched_read_structure_count() {
    let tmp = TempDir::new().unwrap();
    let input = create_plain_fastq(&tmp, "r1.fq", &standard_records());
    let panel = create_panel_fasta(&tmp, "panel.fa", &[("amplicon", REFERENCE)]);

    let output = umivar()
        .args([
            "call",
            "--inputs",
            input.to_str().unwrap(),
            "--read-structures",
            "4M+T",
            "+T",
            "--panel",
            panel.to_str().unwrap(),
            "--output",
            tmp.path().join("variants.tsv").to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute call command");

    assert!(!output.status.success(), "mismatched structure count must fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("counts must match"), "unexpected stderr: {stderr}");
}
