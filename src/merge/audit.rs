//! Cross-checking expected titles against recovered ones

use std::collections::HashSet;

/// Outcome of comparing the expected title list with the recovered titles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Distinct titles recovered from the records
    pub success_count: usize,

    /// Length of the expected title list
    pub expected_count: usize,

    /// Expected titles with no recovered match, in title-list order
    pub missing_titles: Vec<String>,
}

impl AuditReport {
    /// Builds the report by exact match after trimming both sides
    pub fn build(expected: &[String], recovered: &HashSet<String>) -> Self {
        let missing_titles = expected
            .iter()
            .filter(|title| !recovered.contains(title.trim()))
            .cloned()
            .collect();

        Self {
            success_count: recovered.len(),
            expected_count: expected.len(),
            missing_titles,
        }
    }

    /// Renders the plain-text verification report
    pub fn render(&self) -> String {
        let mut text = String::from("Verification report\n\n");
        text.push_str(&format!("Records downloaded: {}\n", self.success_count));
        text.push_str(&format!("Titles expected: {}\n\n", self.expected_count));
        text.push_str(&format!(
            "Titles without a record ({}):\n",
            self.missing_titles.len()
        ));

        let listed: Vec<String> = self
            .missing_titles
            .iter()
            .enumerate()
            .map(|(index, title)| format!("{}. {}", index + 1, title))
            .collect();
        text.push_str(&listed.join("\n"));

        text
    }
}

/// Strips a leading `N.` and the whitespace after it
fn strip_numbering(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == line.len() {
        return line;
    }
    rest.strip_prefix('.').map(str::trim_start).unwrap_or(line)
}

/// Parses a numbered title list (`1. Title` per line)
///
/// The leading number is optional; blank lines are skipped.
pub fn parse_title_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| strip_numbering(line.trim()).trim().to_string())
        .filter(|title| !title.is_empty())
        .collect()
}
