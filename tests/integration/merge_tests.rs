//! Integration tests for the file-level merge command

use cite_harvest::merge::{merge_files, MergeError};
use cite_harvest::output::write_title_list;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

#[test]
fn test_merge_reports_missing_titles() {
    let ws = Workspace::new();
    let titles = ws.path("titles.txt");
    write_title_list(
        &["A".to_string(), "B".to_string(), "C".to_string()],
        &titles,
    )
    .unwrap();

    let first = ws.file("1.ris", "TY  - JOUR\nTI  - A\nER  - \n");
    let second = ws.file("2.ris", "TY  - JOUR\nTI  - C\nER  - \n");

    let result = merge_files(
        &[first, second],
        &titles,
        &ws.path("out/merged.ris"),
        &ws.path("out/report.txt"),
    )
    .unwrap();

    assert_eq!(result.report.missing_titles, vec!["B".to_string()]);
    assert_eq!(result.report.success_count, 2);

    let report = fs::read_to_string(ws.path("out/report.txt")).unwrap();
    assert!(report.contains("Records downloaded: 2"));
    assert!(report.contains("Titles expected: 3"));
    assert!(report.ends_with("1. B"));
}

#[test]
fn test_merge_keeps_file_order() {
    let ws = Workspace::new();
    let titles = ws.file("titles.txt", "1. Alpha\n2. Zeta\n");

    // Files are merged in the order given, not by title
    let zeta = ws.file("z.ris", "TY  - BOOK\nTI  - Zeta\nER  - \n");
    let alpha = ws.file("a.ris", "TY  - JOUR\nTI  - Alpha\nER  - \n");

    let result = merge_files(
        &[zeta, alpha],
        &titles,
        &ws.path("merged.ris"),
        &ws.path("report.txt"),
    )
    .unwrap();

    let merged = fs::read_to_string(ws.path("merged.ris")).unwrap();
    assert_eq!(merged, result.merged_text);
    assert_eq!(
        merged,
        "TY  - BOOK\nTI  - Zeta\nER  - \n\nTY  - JOUR\nTI  - Alpha\nER  - \n"
    );
    assert!(result.report.missing_titles.is_empty());
}

#[test]
fn test_merge_counts_orphan_lines() {
    let ws = Workspace::new();
    let titles = ws.file("titles.txt", "1. Only\n");
    let blob = ws.file(
        "x.ris",
        "Provider: Example Catalog\nDatabase: Demo\n\nTY  - JOUR\nTI  - Only\nER  - \n",
    );

    let result = merge_files(
        &[blob],
        &titles,
        &ws.path("merged.ris"),
        &ws.path("report.txt"),
    )
    .unwrap();

    assert_eq!(result.orphan_lines, 2);
    assert_eq!(result.record_count, 1);
    assert!(!result.merged_text.contains("Provider"));
}

#[test]
fn test_merge_missing_title_file() {
    let ws = Workspace::new();
    let blob = ws.file("x.ris", "TY  - JOUR\nER  - \n");

    let result = merge_files(
        &[blob],
        &ws.path("absent.txt"),
        &ws.path("merged.ris"),
        &ws.path("report.txt"),
    );

    assert!(matches!(result, Err(MergeError::Read { .. })));
    assert!(!ws.path("merged.ris").exists());
}
