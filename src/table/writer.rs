use crate::error::CampaignSheetError;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::GridMut;
use crate::table::column::normalize_columns;
use crate::table::extract::find_header_row;
use crate::table::Record;
use crate::table::Table;
use std::collections::HashMap;

/// Rows cleared beyond the table length by a positional write.
pub const CLEAR_MARGIN: usize = 10;

/// Data row used when the header row can no longer be found.
const FALLBACK_START_ROW: usize = 2;

/// Outcome of a key-matched write.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteReport {
    /// Number of sheet rows overwritten
    pub updated: usize,
    /// Keys of records with no matching sheet row; those records were not written
    pub dropped: Vec<String>,
}

/// Writes a table back into the grid region below the sentinel header, by position.
///
/// Rows `R..R + len + CLEAR_MARGIN` are cleared first, across the wider of the table
/// and the grid. Record `i` then lands in row `R + i`, columns in table order from
/// column 1. Returns the first data row `R`.
pub fn write_positional<G: GridMut + ?Sized>(grid: &mut G, table: &Table, sentinel: &str) -> usize {
    let start_row = match find_header_row(grid, sentinel) {
        Some(header_row) => header_row + 1,
        None => {
            log::warn!(
                "Header '{}' not found while writing back; writing from row {}",
                sentinel,
                FALLBACK_START_ROW
            );
            FALLBACK_START_ROW
        }
    };
    let width = table.width().max(grid.max_column());
    for row in start_row..start_row + table.len() + CLEAR_MARGIN {
        for column in 1..=width {
            grid.set_value(row, column, CellValue::Empty);
        }
    }
    for (index, record) in table.records().enumerate() {
        log::trace!("Writing record {} to row {}", index, start_row + index);
        write_record(grid, start_row + index, &record);
    }
    log::debug!("Wrote {} records from row {}", table.len(), start_row);
    start_row
}

/// Writes edited records back onto the sheet rows holding the same key.
///
/// The key index covers the rows below the header up to the first empty row. Records
/// whose key is not found are dropped and reported; no rows are ever inserted.
pub fn write_by_key<G: GridMut + ?Sized>(
    grid: &mut G,
    table: &Table,
    sentinel: &str,
    key_column: &str,
) -> Result<WriteReport, CampaignSheetError> {
    let header_row = find_header_row(grid, sentinel)
        .ok_or_else(|| CampaignSheetError::HeaderNotFound { sentinel: sentinel.to_owned() })?;
    let headers = normalize_columns(&grid.row_values(header_row));
    let sheet_key = headers
        .iter()
        .position(|name| name == key_column)
        .map(|position| position + 1)
        .ok_or_else(|| CampaignSheetError::ColumnNotFound(key_column.to_owned()))?;
    if table.column_index(key_column).is_none() {
        return Err(CampaignSheetError::ColumnNotFound(key_column.to_owned()));
    }

    let mut rows_by_key = HashMap::<String, usize>::new();
    for row in header_row + 1..=grid.max_row() {
        if grid.is_row_empty(row) {
            break;
        }
        let key = grid.value(row, sheet_key).to_string();
        if !key.is_empty() {
            rows_by_key.entry(key).or_insert(row);
        }
    }

    let mut report = WriteReport::default();
    for record in table.records() {
        let key = record.get(key_column).map(ToString::to_string).unwrap_or_default();
        match rows_by_key.get(&key) {
            Some(row) if !key.is_empty() => {
                log::trace!("Record '{}' goes to row {}", key, row);
                write_record(grid, *row, &record);
                report.updated += 1;
            }
            _ => {
                log::warn!("No row with {} '{}'; record dropped", key_column, key);
                report.dropped.push(key);
            }
        }
    }
    Ok(report)
}

fn write_record<G: GridMut + ?Sized>(grid: &mut G, row: usize, record: &Record) {
    for (index, value) in record.values().iter().enumerate() {
        grid.set_value(row, index + 1, value.clone());
    }
}
