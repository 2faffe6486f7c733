use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt::Display;

/// Turns raw header values into usable, unique column names.
///
/// Each value is trimmed; empty ones become `Col{n}` (1-based position). Repeats get
/// ` (1)`, ` (2)`, ... in order of appearance, skipping any name already taken, so the
/// result is always pairwise distinct and normalizing it again changes nothing.
pub fn normalize_columns<T: Display>(values: &[T]) -> Vec<String> {
    let mut used = HashSet::<String>::with_capacity(values.len());
    let mut counters = HashMap::<String, usize>::new();
    let mut columns = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        let text = value.to_string();
        let trimmed = text.trim();
        let base = if trimmed.is_empty() {
            format!("Col{}", index + 1)
        } else {
            trimmed.to_owned()
        };
        if used.insert(base.clone()) {
            columns.push(base);
            continue;
        }
        let counter = counters.entry(base.clone()).or_insert(0);
        let name = loop {
            *counter += 1;
            let candidate = format!("{} ({})", base, counter);
            if !used.contains(&candidate) {
                break candidate;
            }
        };
        used.insert(name.clone());
        columns.push(name);
    }
    columns
}
