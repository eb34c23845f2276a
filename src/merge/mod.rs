//! Citation merge and audit
//!
//! Merging is a pure transformation from an expected title list and a set of
//! RIS blobs to one merged RIS text plus an [`AuditReport`]. Records keep
//! blob order, then in-blob order, and are never deduplicated.
//!
//! # Example
//!
//! ```
//! use cite_harvest::merge::merge;
//!
//! let titles = vec!["A".to_string(), "B".to_string()];
//! let blobs = ["TY  - JOUR\nTI  - A\nER  - \n"];
//! let result = merge(&titles, &blobs);
//!
//! assert_eq!(result.report.missing_titles, vec!["B".to_string()]);
//! ```

mod audit;
mod ris;

pub use audit::{parse_title_list, AuditReport};
pub use ris::{parse_blobs, CitationRecord, ParsedRecords, RECORD_START, TITLE_FIELD};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the file-level merge command
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No RIS files given")]
    NoInputs,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Merged bundle plus its audit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// All records, separated by exactly one blank line
    pub merged_text: String,

    /// Expected-versus-recovered comparison
    pub report: AuditReport,

    /// Number of records in `merged_text`
    pub record_count: usize,

    /// Lines dropped because they preceded any record in their blob
    pub orphan_lines: usize,
}

/// Merges record blobs and audits them against the expected titles
pub fn merge<S: AsRef<str>>(titles: &[String], blobs: &[S]) -> MergeResult {
    let parsed = parse_blobs(blobs);

    let merged_text = parsed
        .records
        .iter()
        .map(CitationRecord::to_text)
        .collect::<Vec<_>>()
        .join("\n");

    MergeResult {
        merged_text,
        report: AuditReport::build(titles, &parsed.recovered_titles),
        record_count: parsed.records.len(),
        orphan_lines: parsed.orphan_lines,
    }
}

/// Reads RIS files and a numbered title file, merges them, and writes the
/// merged bundle and the verification report
pub fn merge_files(
    ris_files: &[PathBuf],
    title_file: &Path,
    merged_out: &Path,
    report_out: &Path,
) -> Result<MergeResult, MergeError> {
    if ris_files.is_empty() {
        return Err(MergeError::NoInputs);
    }

    let titles = parse_title_list(&read(title_file)?);

    let blobs = ris_files
        .iter()
        .map(|path| read(path))
        .collect::<Result<Vec<_>, _>>()?;

    let result = merge(&titles, &blobs);

    if result.orphan_lines > 0 {
        tracing::warn!(
            "Dropped {} lines that appeared before any record",
            result.orphan_lines
        );
    }

    write(merged_out, &result.merged_text)?;
    write(report_out, &result.report.render())?;

    tracing::info!(
        "Merged {} records from {} files; {} of {} titles missing",
        result.record_count,
        ris_files.len(),
        result.report.missing_titles.len(),
        result.report.expected_count
    );

    Ok(result)
}

/// Lists the `.ris` files directly inside `dir`, sorted by file name
pub fn collect_ris_files(dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let entries = fs::read_dir(dir).map_err(|source| MergeError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("ris"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();

    Ok(files)
}

fn read(path: &Path) -> Result<String, MergeError> {
    fs::read_to_string(path).map_err(|source| MergeError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, contents: &str) -> Result<(), MergeError> {
    let result = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
    .and_then(|()| fs::write(path, contents));

    result.map_err(|source| MergeError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_missing_title_reported() {
        let blobs = [
            "TY  - JOUR\nTI  - A\nER  - \n",
            "TY  - JOUR\nTI  - C\nER  - \n",
        ];
        let result = merge(&titles(&["A", "B", "C"]), &blobs);

        assert_eq!(result.report.missing_titles, vec!["B"]);
        assert_eq!(result.report.success_count, 2);
        assert_eq!(result.report.expected_count, 3);
    }

    #[test]
    fn test_blob_order_wins_over_title_order() {
        let blobs = [
            "TY  - JOUR\nTI  - Zeta\nER  - \n",
            "TY  - JOUR\nTI  - Alpha\nER  - \n",
        ];
        let result = merge(&titles(&["Alpha", "Zeta"]), &blobs);

        let zeta = result.merged_text.find("Zeta").unwrap();
        let alpha = result.merged_text.find("Alpha").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn test_records_separated_by_one_blank_line() {
        let blobs = ["TY  - JOUR\nTI  - A\nER  - \n\n\n", "TY  - BOOK\nTI  - B\nER  - "];
        let result = merge(&titles(&[]), &blobs);

        assert_eq!(
            result.merged_text,
            "TY  - JOUR\nTI  - A\nER  - \n\nTY  - BOOK\nTI  - B\nER  - \n"
        );
        assert_eq!(result.record_count, 2);
    }

    #[test]
    fn test_no_blobs() {
        let blobs: [&str; 0] = [];
        let result = merge(&titles(&["A"]), &blobs);

        assert_eq!(result.merged_text, "");
        assert_eq!(result.report.missing_titles, vec!["A"]);
        assert_eq!(result.report.success_count, 0);
    }

    #[test]
    fn test_merge_files_requires_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let result = merge_files(
            &[],
            &dir.path().join("titles.txt"),
            &dir.path().join("merged.ris"),
            &dir.path().join("report.txt"),
        );
        assert!(matches!(result, Err(MergeError::NoInputs)));
    }

    #[test]
    fn test_collect_ris_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.ris"), "").unwrap();
        fs::write(dir.path().join("a.RIS"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = collect_ris_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.RIS", "b.ris"]);
    }
}
