//! Report fixtures: CSV bodies and zip archives.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;

/// Header used by most fixtures.
pub const HEADER: &str = "RecordId,ProductName,user:scalr-meta,Cost";

/// One billing row with the tag and cost in the `HEADER` layout.
pub fn row(record: usize, tag: &str, cost: &str) -> String {
    format!("{record},Amazon Elastic Compute Cloud,{tag},{cost}")
}

/// A CSV body with `HEADER` and the given rows.
pub fn report_csv(rows: &[String]) -> String {
    let mut body = String::from(HEADER);
    body.push('\n');
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    body
}

/// Three rows for `v2:e1:f1:fr1:s1` costing 7.0 in total, plus one
/// malformed tag worth 100.
pub fn sample_report() -> String {
    report_csv(&[
        row(1, "v2:e1:f1:fr1:s1", "1.5"),
        row(2, "v2:e1:f1:fr1:s1", "2.5"),
        row(3, "v2:e1:f1:fr1:s1", "3.0"),
        row(4, "v2:broken", "100"),
    ])
}

/// `rows` rows spread over `envs` envs, each costing 0.25.
pub fn wide_report(rows: usize, envs: usize) -> String {
    let rows: Vec<String> = (0..rows)
        .map(|i| {
            let env = i % envs;
            row(i, &format!("v2:env{env}:farm{env}:role{env}:srv{}", i % 7), "0.25")
        })
        .collect();
    report_csv(&rows)
}

/// Writes a zip archive with one entry per `(name, body)`.
pub fn write_archive(path: &Path, entries: &[(&str, &str)]) {
    let raw: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, body)| (*name, body.as_bytes()))
        .collect();
    write_archive_bytes(path, &raw);
}

/// Like [`write_archive`], for entries that are not valid UTF-8.
pub fn write_archive_bytes(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("Failed to create archive");
    let mut zip = zip::ZipWriter::new(file);
    for (name, body) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        zip.write_all(body)
            .expect("Failed to write zip entry");
    }
    zip.finish().expect("Failed to finish archive");
}
