//! Input helpers for batch package lists.
//!
//! Batch input is newline-separated text. Lines are kept as-is, blanks
//! included, so that progress totals match the number of input lines; the
//! orchestrator trims each line and skips blank ones.

use crate::error::ExpiryCheckError;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Split batch text into package lines.
pub fn split_package_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

/// Number of lines that name a package.
pub fn count_package_names(lines: &[String]) -> usize {
    lines.iter().filter(|line| !line.trim().is_empty()).count()
}

/// Read package lines from a file.
///
/// # Errors
///
/// Returns `FileError` if the file is missing or unreadable. A file with
/// only blank lines is not an error; it yields lines that produce no rows.
pub fn read_packages_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ExpiryCheckError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ExpiryCheckError::file_error(
            path.to_string_lossy(),
            "File not found",
        ));
    }

    let text = fs::read_to_string(path).map_err(|e| {
        ExpiryCheckError::file_error(path.to_string_lossy(), format!("Failed to read file: {}", e))
    })?;

    Ok(split_package_lines(&text))
}

/// Read package lines from any reader, typically standard input.
pub fn read_packages_from_reader<R: Read>(mut reader: R) -> Result<Vec<String>, ExpiryCheckError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| ExpiryCheckError::file_error("<stdin>", format!("Failed to read input: {}", e)))?;

    Ok(split_package_lines(&text))
}
