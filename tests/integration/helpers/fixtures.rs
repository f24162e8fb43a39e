//! On-disk FASTQ and FASTA fixtures for command tests.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

/// A FASTQ test record: name, sequence, quality.
pub type FastqRecord = (String, String, String);

/// Create a plain (uncompressed) FASTQ file.
pub fn create_plain_fastq(dir: &TempDir, name: &str, records: &[FastqRecord]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    for (name, seq, qual) in records {
        writeln!(file, "@{name}").unwrap();
        writeln!(file, "{seq}").unwrap();
        writeln!(file, "+").unwrap();
        writeln!(file, "{qual}").unwrap();
    }
    path
}

/// Create a gzip-compressed FASTQ file.
pub fn create_gzip_fastq(dir: &TempDir, name: &str, records: &[FastqRecord]) -> PathBuf {
    let path = dir.path().join(name);
    let file = File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    for (name, seq, qual) in records {
        writeln!(encoder, "@{name}").unwrap();
        writeln!(encoder, "{seq}").unwrap();
        writeln!(encoder, "+").unwrap();
        writeln!(encoder, "{qual}").unwrap();
    }
    encoder.finish().unwrap();
    path
}

/// Create a reference panel FASTA file.
pub fn create_panel_fasta(dir: &TempDir, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    for (header, bases) in entries {
        writeln!(file, ">{header}").unwrap();
        writeln!(file, "{}", std::str::from_utf8(bases).unwrap()).unwrap();
    }
    path
}

/// UMI-tagged reads over a template: `reads` copies of `umi + template`
/// at uniform quality 40.
pub fn tagged_records(umi: &str, template: &[u8], reads: usize) -> Vec<FastqRecord> {
    (0..reads)
        .map(|i| {
            (
                format!("{umi}:{i}"),
                format!("{umi}{}", std::str::from_utf8(template).unwrap()),
                "I".repeat(umi.len() + template.len()),
            )
        })
        .collect()
}

/// Read a file to a string, decompressing gzip when the path ends in `.gz`.
pub fn read_text(path: &Path) -> String {
    let bytes = std::fs::read(path).unwrap();
    if path.extension().is_some_and(|ext| ext == "gz") {
        let mut decoder = MultiGzDecoder::new(&bytes[..]);
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        text
    } else {
        String::from_utf8(bytes).unwrap()
    }
}
