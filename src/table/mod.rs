//! # Table Module
//!
//! Projection of semi-structured sheets into tables: header location, column name
//! normalization, row extraction and writing edited tables back into a grid.

pub mod column;
pub mod criteria;
pub mod extract;
pub mod writer;

pub use column::normalize_columns;
pub use criteria::Criteria;
pub use criteria::HeaderLocator;
pub use extract::extract;
pub use extract::find_header_row;
pub use writer::write_by_key;
pub use writer::write_positional;
pub use writer::WriteReport;

use crate::error::CampaignSheetError;
use crate::spreadsheet::CellValue;

/// Ordered unique column names plus records of exactly that width.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, 0-based.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Appends a record, padding short rows with empty values and cutting long ones.
    pub fn push_row(&mut self, mut values: Vec<CellValue>) {
        values.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(values);
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// Edits one field of a record.
    pub fn set(&mut self, index: usize, column: &str, value: impl Into<CellValue>) -> Result<(), CampaignSheetError> {
        let position = self
            .column_index(column)
            .ok_or_else(|| CampaignSheetError::ColumnNotFound(column.to_owned()))?;
        if let Some(field) = self.rows.get_mut(index).and_then(|values| values.get_mut(position)) {
            *field = value.into();
        }
        Ok(())
    }

    /// Removes and returns the values of a record.
    pub fn remove_row(&mut self, index: usize) -> Option<Vec<CellValue>> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    /// Keeps the records matching a predicate.
    pub fn filter<F>(&self, mut predicate: F) -> Table
    where
        F: FnMut(&Record) -> bool,
    {
        let rows = self
            .records()
            .filter(|record| predicate(record))
            .map(|record| record.values.to_vec())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// One record of a [`Table`], accessible by column name.
#[derive(Clone, Copy, Debug)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [CellValue],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a CellValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|position| self.values.get(position))
    }

    pub fn values(&self) -> &'a [CellValue] {
        self.values
    }

    /// Pairs of (column name, value) in column order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a CellValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn territories() -> Table {
        let mut table = Table::new(vec!["RegionName".to_owned(), "TerritoryState".to_owned()]);
        table.push_row(vec![CellValue::from("Ashvale")]);
        table.push_row(vec![
            CellValue::from("Ghostwood"),
            CellValue::from("Lost"),
            CellValue::from("overflow"),
        ]);
        table
    }

    #[test]
    fn rows_are_padded_to_width() {
        let table = territories();
        assert_eq!(table.len(), 2);
        assert_eq!(table.record(0).map(|record| record.values().len()), Some(2));
        assert_eq!(table.record(0).and_then(|record| record.get("TerritoryState")), Some(&CellValue::Empty));
        assert_eq!(table.record(1).and_then(|record| record.get("TerritoryState")), Some(&CellValue::from("Lost")));
        assert_eq!(table.record(1).and_then(|record| record.get("Owner")), None);
    }

    #[test]
    fn edit_and_filter() -> Result<(), CampaignSheetError> {
        let mut table = territories();
        table.set(0, "TerritoryState", "Controlled")?;
        assert!(matches!(table.set(0, "Owner", "x"), Err(CampaignSheetError::ColumnNotFound(_))));
        let controlled = table.filter(|record| record.get("TerritoryState") == Some(&CellValue::from("Controlled")));
        assert_eq!(controlled.len(), 1);
        assert_eq!(
            controlled.records().flat_map(|record| record.fields().map(|(name, value)| format!("{}={}", name, value)).collect::<Vec<_>>()).collect::<Vec<_>>(),
            vec!["RegionName=Ashvale", "TerritoryState=Controlled"]
        );
        assert_eq!(table.remove_row(5), None);
        assert_eq!(table.remove_row(1).map(|values| values.len()), Some(2));
        assert_eq!(table.len(), 1);
        Ok(())
    }
}
