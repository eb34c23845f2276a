//! RIS record parsing
//!
//! Only two tags matter: `TY` opens a record and `TI` carries its title.
//! Every other non-blank line is opaque metadata kept verbatim.

use std::collections::HashSet;

/// Prefix of the line that opens a record
pub const RECORD_START: &str = "TY  -";

/// Prefix of the line carrying the record title
pub const TITLE_FIELD: &str = "TI  -";

/// One bibliographic entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationRecord {
    /// Value of the `TY` line (e.g. `JOUR`, `CHAP`)
    pub kind: String,

    /// Value of the first `TI` line, if any
    pub title: Option<String>,

    /// Every line of the record, `TY` line included, in source order
    pub lines: Vec<String>,
}

impl CitationRecord {
    fn open(type_line: &str) -> Self {
        Self {
            kind: field_value(type_line, RECORD_START).to_string(),
            title: None,
            lines: vec![type_line.to_string()],
        }
    }

    /// Renders the record as text, each line terminated by a newline
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

/// Records parsed from one or more blobs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecords {
    /// Records in blob order, then in-blob order
    pub records: Vec<CitationRecord>,

    /// Distinct trimmed titles seen on `TI` lines
    pub recovered_titles: HashSet<String>,

    /// Non-blank lines found before the first `TY` line of a blob
    pub orphan_lines: usize,
}

impl ParsedRecords {
    /// Scans one blob and appends its records
    ///
    /// A record still open at the end of the blob is emitted; records never
    /// continue across blobs.
    pub fn scan_blob(&mut self, blob: &str) {
        let mut current: Option<CitationRecord> = None;

        for line in blob.lines() {
            if line.starts_with(RECORD_START) {
                if let Some(done) = current.take() {
                    self.records.push(done);
                }
                current = Some(CitationRecord::open(line));
                continue;
            }

            if line.trim().is_empty() {
                continue;
            }

            let Some(record) = current.as_mut() else {
                self.orphan_lines += 1;
                continue;
            };

            if line.starts_with(TITLE_FIELD) {
                let title = field_value(line, TITLE_FIELD).to_string();
                if record.title.is_none() {
                    record.title = Some(title.clone());
                }
                self.recovered_titles.insert(title);
            }

            record.lines.push(line.to_string());
        }

        if let Some(done) = current {
            self.records.push(done);
        }
    }
}

/// Parses blobs in order
pub fn parse_blobs<S: AsRef<str>>(blobs: &[S]) -> ParsedRecords {
    let mut parsed = ParsedRecords::default();
    for blob in blobs {
        parsed.scan_blob(blob.as_ref());
    }
    parsed
}

fn field_value<'a>(line: &'a str, tag: &str) -> &'a str {
    line.strip_prefix(tag).unwrap_or(line).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOB: &str = "TY  - JOUR\nTI  - Alpha\nAU  - Doe, J.\nER  - \n\nTY  - CHAP\nTI  - Beta\nER  - \n";

    #[test]
    fn test_two_records() {
        let parsed = parse_blobs(&[BLOB]);

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].kind, "JOUR");
        assert_eq!(parsed.records[0].title.as_deref(), Some("Alpha"));
        assert_eq!(
            parsed.records[0].lines,
            vec!["TY  - JOUR", "TI  - Alpha", "AU  - Doe, J.", "ER  - "]
        );
        assert_eq!(parsed.records[1].kind, "CHAP");
        assert!(parsed.recovered_titles.contains("Beta"));
    }

    #[test]
    fn test_crlf_lines() {
        let parsed = parse_blobs(&["TY  - JOUR\r\nTI  - Windows  \r\nER  - \r\n"]);
        assert!(parsed.recovered_titles.contains("Windows"));
        assert_eq!(parsed.records[0].lines[1], "TI  - Windows  ");
    }

    #[test]
    fn test_record_does_not_span_blobs() {
        let parsed = parse_blobs(&["TY  - JOUR\nTI  - Open", "AU  - Later, A.\n"]);

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].lines.len(), 2);
        assert_eq!(parsed.orphan_lines, 1);
    }

    #[test]
    fn test_orphan_lines_before_first_record() {
        let parsed = parse_blobs(&["Provider: Example\n\nTY  - JOUR\nER  - \n"]);
        assert_eq!(parsed.orphan_lines, 1);
        assert_eq!(parsed.records.len(), 1);
    }

    #[test]
    fn test_duplicate_records_are_kept() {
        let parsed = parse_blobs(&[BLOB, BLOB]);
        assert_eq!(parsed.records.len(), 4);
        assert_eq!(parsed.recovered_titles.len(), 2);
    }

    #[test]
    fn test_to_text() {
        let parsed = parse_blobs(&["TY  - JOUR\nER  - "]);
        assert_eq!(parsed.records[0].to_text(), "TY  - JOUR\nER  - \n");
    }
}
