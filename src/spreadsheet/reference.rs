//! Conversion between `A1`-style references and 1-based (row, column) positions.

use regex::Regex;
use std::sync::LazyLock;

static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?(\d+)$").expect("Hardcode regex pattern"));

/// Converts column letters to a 1-based column number (A = 1, Z = 26, AA = 27).
pub fn column_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |index, letter| {
        letter
            .is_ascii_alphabetic()
            .then(|| index * 26 + (letter.to_ascii_uppercase() as usize - 'A' as usize + 1))
    })
}

/// Converts a 1-based column number to column letters.
pub fn index_to_column(column: usize) -> String {
    let mut column = column;
    let mut letters = Vec::new();
    while column > 0 {
        column -= 1;
        letters.push((b'A' + (column % 26) as u8) as char);
        column /= 26;
    }
    letters.iter().rev().collect()
}

/// Parses a cell reference such as `B7` or `$B$7` into 1-based (row, column).
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = REFERENCE_PATTERN.captures(reference)?;
    let column = column_to_index(captures.get(1)?.as_str())?;
    let row = captures.get(2)?.as_str().parse::<usize>().ok().filter(|row| *row > 0)?;
    Some((row, column))
}

/// Renders 1-based (row, column) as a cell reference.
pub fn index_to_reference(row: usize, column: usize) -> String {
    format!("{}{}", index_to_column(column), row)
}
