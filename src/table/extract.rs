use crate::error::CampaignSheetError;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::Grid;
use crate::table::column::normalize_columns;
use crate::table::criteria::Criteria;
use crate::table::Table;

/// Finds the first row whose column-A text matches the sentinel.
///
/// Only text cells are considered; the value is trimmed and compared case-insensitively.
pub fn find_header_row<G: Grid + ?Sized>(grid: &G, sentinel: &str) -> Option<usize> {
    let sentinel = sentinel.to_lowercase();
    (1..=grid.max_row()).find(|row| match grid.value(*row, 1) {
        CellValue::Text(text) => text.trim().to_lowercase() == sentinel,
        _ => false,
    })
}

/// Extracts a table from a grid according to the criteria.
///
/// The header row is normalized into column names; data rows follow it up to the
/// grid's last row, subject to the criteria's blank-row policy.
pub fn extract<G: Grid + ?Sized>(grid: &G, criteria: &Criteria) -> Result<Table, CampaignSheetError> {
    let header_row = criteria.header_row(grid)?;
    let mut table = Table::new(normalize_columns(&grid.row_values(header_row)));
    for row in header_row + 1..=grid.max_row() {
        match criteria.accept_row(grid, row) {
            None => {
                log::trace!("Table ends before empty row {}", row);
                break;
            }
            Some(false) => log::trace!("Skipping blank row {}", row),
            Some(true) => table.push_row(grid.row_values(row)),
        }
    }
    log::debug!(
        "Extracted {} rows x {} columns below header row {}",
        table.len(),
        table.width(),
        header_row
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::fixtures::grid;
    use crate::spreadsheet::Sheet;
    use crate::spreadsheet::GridMut;
    use pretty_assertions::assert_eq;

    fn texts(table: &Table) -> Vec<Vec<String>> {
        table
            .records()
            .map(|record| record.values().iter().map(ToString::to_string).collect())
            .collect()
    }

    #[test]
    fn header_anchored_stops_at_first_empty_row() -> Result<(), CampaignSheetError> {
        let rows = grid(&[
            &["Campaign", ""],
            &["", "notes"],
            &["RegionName", "Owner"],
            &["Ashvale", "Red"],
            &["Brindle", ""],
            &["", ""],
            &["Ghostwood", "Blue"],
        ]);
        let table = extract(&rows, &Criteria::sentinel("RegionName"))?;
        assert_eq!(table.columns(), ["RegionName", "Owner"]);
        assert_eq!(texts(&table), vec![vec!["Ashvale", "Red"], vec!["Brindle", ""]]);
        Ok(())
    }

    #[test]
    fn first_row_skips_blank_rows() -> Result<(), CampaignSheetError> {
        let mut rows = grid(&[
            &["Name", "CR", "Name"],
            &["Goblin", "1", ""],
            &["Ogre", "3", ""],
            &["", "", ""],
            &["Wyvern", "6", ""],
            &["", "", ""],
        ]);
        rows[3][1] = CellValue::Number(0.0);
        let table = extract(&rows, &Criteria::first_row())?;
        assert_eq!(table.columns(), ["Name", "CR", "Name (1)"]);
        assert_eq!(
            texts(&table),
            vec![vec!["Goblin", "1", ""], vec!["Ogre", "3", ""], vec!["Wyvern", "6", ""]]
        );
        Ok(())
    }

    #[test]
    fn missing_sentinel() {
        let rows = grid(&[&["Name"], &["Goblin"]]);
        assert!(matches!(
            extract(&rows, &Criteria::default()),
            Err(CampaignSheetError::HeaderNotFound { sentinel }) if sentinel == "RegionName"
        ));
    }

    #[test]
    fn sentinel_only_matches_text_in_column_a() {
        let mut sheet = Sheet::new("Recon");
        sheet.set_value(1, 2, CellValue::from("RegionName"));
        sheet.set_value(2, 1, CellValue::Number(1.0));
        sheet.set_value(3, 1, CellValue::from("  REGIONNAME\t"));
        assert_eq!(find_header_row(&sheet, "RegionName"), Some(3));
        assert_eq!(find_header_row(&sheet, "Region"), None);
    }

    #[test]
    fn territories_scenario() -> Result<(), CampaignSheetError> {
        let mut sheet = Sheet::new("Territories");
        sheet.set_value(1, 1, CellValue::from("Campaign Map"));
        sheet.set_value(2, 1, CellValue::from("RegionName"));
        sheet.set_value(2, 2, CellValue::from("TerritoryState"));
        sheet.set_value(3, 1, CellValue::from("Ashvale"));
        sheet.set_value(3, 2, CellValue::from("Controlled"));
        sheet.set_value(5, 1, CellValue::from("Ghostwood"));
        sheet.set_value(5, 2, CellValue::from("Lost"));

        let table = extract(&sheet, &Criteria::default())?;
        assert_eq!(table.len(), 1);
        let record = table.record(0).expect("one record");
        assert_eq!(record.get("RegionName"), Some(&CellValue::from("Ashvale")));
        assert_eq!(record.get("TerritoryState"), Some(&CellValue::from("Controlled")));
        Ok(())
    }

    #[test]
    fn header_is_last_row() -> Result<(), CampaignSheetError> {
        let rows = grid(&[&["RegionName", ""]]);
        let table = extract(&rows, &Criteria::default())?;
        assert_eq!(table.columns(), ["RegionName", "Col2"]);
        assert!(table.is_empty());
        Ok(())
    }
}
