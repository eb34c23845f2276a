//! Title ledger file
//!
//! The ledger is written as a numbered list, one title per line
//! (`1. First title`), which is the format the merge step reads back.

use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Formats titles as a numbered list
pub fn format_title_list(titles: &[String]) -> String {
    let mut text = String::new();
    for (index, title) in titles.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", index + 1, title));
    }
    text
}

/// Writes the numbered title list to `path`, creating parent directories
pub fn write_title_list(titles: &[String], path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(format_title_list(titles).as_bytes())?;
    writer.flush()?;

    Ok(())
}
