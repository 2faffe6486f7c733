use crate::error::CampaignSheetError;
use crate::spreadsheet::Grid;
use crate::table::extract::find_header_row;

/// Literal in column A that marks the header row of a region table.
pub const DEFAULT_SENTINEL: &str = "RegionName";

/// Where the header row of a table lives.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderLocator {
    /// First row whose column-A text equals the sentinel, ignoring case and surrounding whitespace
    Sentinel(String),
    /// Row 1
    FirstRow,
}

/// Criteria for locating a table inside a sheet and deciding which rows belong to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Criteria {
    /// How the header row is found.
    pub header: HeaderLocator,

    /// Skip rows where no column holds a truthy value.
    pub skip_empty_rows: bool,

    /// Stop reading when encountering a completely empty row.
    pub end_at_empty_row: bool,
}

impl Criteria {
    /// Header found by sentinel; the region ends at the first empty row.
    pub fn sentinel(sentinel: &str) -> Self {
        Criteria {
            header: HeaderLocator::Sentinel(sentinel.to_owned()),
            skip_empty_rows: false,
            end_at_empty_row: true,
        }
    }

    /// Header in row 1; blank rows are skipped and reading continues to the last row.
    pub fn first_row() -> Self {
        Criteria {
            header: HeaderLocator::FirstRow,
            skip_empty_rows: true,
            end_at_empty_row: false,
        }
    }

    /// Resolves the header row number in a grid.
    pub fn header_row<G: Grid + ?Sized>(&self, grid: &G) -> Result<usize, CampaignSheetError> {
        match &self.header {
            HeaderLocator::Sentinel(sentinel) => find_header_row(grid, sentinel)
                .ok_or_else(|| CampaignSheetError::HeaderNotFound { sentinel: sentinel.to_owned() }),
            HeaderLocator::FirstRow => Ok(1),
        }
    }

    /// Decides what to do with a data row: `None` ends the table, `Some(false)` skips the row.
    pub(crate) fn accept_row<G: Grid + ?Sized>(&self, grid: &G, row: usize) -> Option<bool> {
        if self.end_at_empty_row && grid.is_row_empty(row) {
            None
        } else if self.skip_empty_rows {
            Some((1..=grid.max_column()).any(|column| grid.value(row, column).is_truthy()))
        } else {
            Some(true)
        }
    }
}

impl Default for Criteria {
    fn default() -> Self {
        Criteria::sentinel(DEFAULT_SENTINEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::fixtures::grid;

    #[test]
    fn presets() {
        assert_eq!(Criteria::default(), Criteria::sentinel("RegionName"));
        assert!(Criteria::sentinel("x").end_at_empty_row);
        assert!(Criteria::first_row().skip_empty_rows);
        assert!(!Criteria::first_row().end_at_empty_row);
    }

    #[test]
    fn header_row_resolution() {
        let rows = grid(&[&["Title"], &[" regionname "], &["Ashvale"]]);
        assert_eq!(Criteria::default().header_row(&rows).ok(), Some(2));
        assert_eq!(Criteria::first_row().header_row(&rows).ok(), Some(1));
        assert!(matches!(
            Criteria::sentinel("Name").header_row(&rows),
            Err(CampaignSheetError::HeaderNotFound { sentinel }) if sentinel == "Name"
        ));
    }

    #[test]
    fn row_acceptance() {
        let rows = grid(&[&["a", "b"], &["", ""], &["0", ""]]);
        let mut zero = rows.clone();
        zero[2][0] = crate::spreadsheet::CellValue::Number(0.0);
        assert_eq!(Criteria::sentinel("a").accept_row(&zero, 2), None);
        assert_eq!(Criteria::sentinel("a").accept_row(&zero, 3), Some(true));
        assert_eq!(Criteria::first_row().accept_row(&zero, 2), Some(false));
        assert_eq!(Criteria::first_row().accept_row(&zero, 3), Some(false));
        assert_eq!(Criteria::first_row().accept_row(&rows, 3), Some(true));
    }
}
