//! Utility functions for reading URL lists.
//!
//! URL lists hold one URL per line. Lines are trimmed; blank lines and lines
//! starting with `#` are skipped. No further validation happens here:
//! malformed URLs are left for the HTTP layer to reject.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ProbeError;

/// Path meaning "read the URL list from standard input".
pub const STDIN_SOURCE: &str = "-";

/// Extract URLs from text, one per line.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines().filter_map(clean_line).collect()
}

/// Read URLs from any buffered reader.
///
/// Stops at the first I/O error and reports it with `source` as the path.
pub fn read_urls_from_reader<R: BufRead>(reader: R, source: &str) -> Result<Vec<String>, ProbeError> {
    let mut urls = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            ProbeError::file_error(source, format!("Error reading line {}: {}", index + 1, e))
        })?;
        if let Some(url) = clean_line(&line) {
            urls.push(url);
        }
    }
    Ok(urls)
}

/// Read URLs from a file, or from stdin when `path` is `-`.
pub fn read_urls_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ProbeError> {
    let path = path.as_ref();
    let display = path.to_string_lossy();

    if display == STDIN_SOURCE {
        let stdin = std::io::stdin();
        return read_urls_from_reader(stdin.lock(), "<stdin>");
    }

    if !path.exists() {
        return Err(ProbeError::file_error(display, "File not found"));
    }

    let file = File::open(path)
        .map_err(|e| ProbeError::file_error(display.clone(), format!("Failed to open: {}", e)))?;
    read_urls_from_reader(BufReader::new(file), &display)
}

fn clean_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        None
    } else {
        Some(trimmed.to_string())
    }
}
