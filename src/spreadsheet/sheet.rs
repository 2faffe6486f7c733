use crate::helpers::xml::XmlError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::Grid;
use crate::spreadsheet::EMPTY;
use crate::spreadsheet::GridMut;
use std::collections::BTreeMap;

/// Worksheet XML written for sheets created in memory, up to and including `<sheetData>`.
const NEW_WORKSHEET_PREFIX: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    r#"<dimension ref="A1"/><sheetData>"#,
);

/// Worksheet XML written after `<sheetData>` for sheets created in memory.
const NEW_WORKSHEET_SUFFIX: &str = "</sheetData></worksheet>";

/// A worksheet: a sparse 1-indexed cell grid plus the XML surrounding its cell data.
///
/// The reported extent (`max_row`, `max_column`) grows whenever a cell is touched,
/// including when it is cleared, and never shrinks unless overridden with
/// [`Sheet::set_extent`].
#[derive(Clone, Debug)]
pub struct Sheet {
    /// Sheet name as shown on the workbook tab
    pub(crate) name: String,
    /// Package part holding this sheet; `None` until first serialized
    pub(crate) part: Option<String>,
    /// Worksheet XML up to and including the `<sheetData>` start tag
    pub(crate) prefix: String,
    /// Worksheet XML from the `</sheetData>` end tag onwards
    pub(crate) suffix: String,
    /// Row attributes other than `r` and `spans`, keyed by row number
    pub(crate) rows: BTreeMap<usize, Vec<(String, String)>>,
    /// Cells keyed by (row, column)
    pub(crate) cells: BTreeMap<(usize, usize), Cell>,
    /// Whether any cell formula was overwritten since loading
    pub(crate) formulas_dropped: bool,
    /// Whether cells or extent changed since loading; clean sheets are written back verbatim
    pub(crate) dirty: bool,
    max_row: usize,
    max_column: usize,
}

impl Sheet {
    /// Creates an empty in-memory sheet reporting an extent of (1, 1).
    pub fn new(name: &str) -> Self {
        Sheet {
            name: name.to_owned(),
            part: None,
            prefix: NEW_WORKSHEET_PREFIX.to_owned(),
            suffix: NEW_WORKSHEET_SUFFIX.to_owned(),
            rows: BTreeMap::new(),
            cells: BTreeMap::new(),
            formulas_dropped: false,
            dirty: true,
            max_row: 1,
            max_column: 1,
        }
    }

    /// Creates a sheet from a worksheet part, keeping the XML around `<sheetData>`.
    /// Returns the sheet together with the raw `<sheetData>` body still to be parsed.
    pub(crate) fn from_part<'a>(name: &str, part: &str, xml: &'a str) -> Result<(Self, &'a str), XmlError> {
        let (prefix, body, suffix) = split_sheet_data(xml)?;
        let mut sheet = Sheet::new(name);
        sheet.part = Some(part.to_owned());
        sheet.prefix = prefix;
        sheet.suffix = suffix;
        sheet.dirty = false;
        Ok((sheet, body))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the cell at a 1-based position, if one has been stored.
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.cells.get(&(row, column))
    }

    /// Iterates stored cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (&(usize, usize), &Cell)> {
        self.cells.iter()
    }

    /// Overrides the reported extent.
    pub fn set_extent(&mut self, max_row: usize, max_column: usize) {
        self.max_row = max_row;
        self.max_column = max_column;
        self.dirty = true;
    }

    /// Stores a cell read from the source workbook.
    pub(crate) fn insert_loaded(&mut self, row: usize, column: usize, cell: Cell) {
        self.touch(row, column);
        self.cells.insert((row, column), cell);
    }

    /// Stores row attributes read from the source workbook.
    pub(crate) fn insert_row_attributes(&mut self, row: usize, attributes: Vec<(String, String)>) {
        if !attributes.is_empty() {
            self.rows.insert(row, attributes);
        }
    }

    fn touch(&mut self, row: usize, column: usize) {
        self.max_row = self.max_row.max(row);
        self.max_column = self.max_column.max(column);
    }
}

impl Grid for Sheet {
    fn max_row(&self) -> usize {
        self.max_row
    }

    fn max_column(&self) -> usize {
        self.max_column
    }

    fn value(&self, row: usize, column: usize) -> &CellValue {
        self.cells
            .get(&(row, column))
            .map(|cell| &cell.value)
            .unwrap_or(&EMPTY)
    }
}

impl GridMut for Sheet {
    /// Writes a value, keeping the cell style and dropping any formula.
    fn set_value(&mut self, row: usize, column: usize, value: CellValue) {
        self.touch(row, column);
        self.dirty = true;
        let cell = self.cells.entry((row, column)).or_default();
        if cell.formula.take().is_some() {
            self.formulas_dropped = true;
        }
        cell.value = value;
    }
}

/// Splits worksheet XML into the text before cell data, the cell data body and the rest.
/// A self-closing `<sheetData/>` is expanded so that rows can be inserted.
fn split_sheet_data(xml: &str) -> Result<(String, &str, String), XmlError> {
    let missing = || XmlError::MissingElement("sheetData".to_owned());
    let open = xml.find("<sheetData").ok_or_else(missing)?;
    let open_end = open + xml[open..].find('>').ok_or_else(missing)?;
    if xml[..open_end].ends_with('/') {
        let prefix = format!("{}<sheetData>", &xml[..open]);
        let suffix = format!("</sheetData>{}", &xml[open_end + 1..]);
        return Ok((prefix, "", suffix));
    }
    let close = open_end + xml[open_end..].find("</sheetData>").ok_or_else(missing)?;
    Ok((
        xml[..=open_end].to_owned(),
        &xml[open_end + 1..close],
        xml[close..].to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::Formula;

    #[test]
    fn sheet_initial_extent() {
        let sheet = Sheet::new("Recon");
        assert_eq!(sheet.max_row(), 1);
        assert_eq!(sheet.max_column(), 1);
        assert_eq!(sheet.value(5, 5), &CellValue::Empty);
    }

    #[test]
    fn clearing_grows_extent() {
        let mut sheet = Sheet::new("Recon");
        sheet.set_value(2, 3, CellValue::from("x"));
        sheet.set_value(9, 1, CellValue::Empty);
        assert_eq!(sheet.max_row(), 9);
        assert_eq!(sheet.max_column(), 3);
        assert!(sheet.cell(9, 1).is_some());
    }

    #[test]
    fn overwrite_drops_formula_keeps_style() {
        let mut sheet = Sheet::new("Territories");
        sheet.insert_loaded(1, 1, Cell {
            value: CellValue::Number(4.0),
            style: Some("3".to_owned()),
            formula: Some(Formula {
                attributes: Vec::new(),
                text: "2+2".to_owned(),
            }),
        });
        sheet.set_value(1, 1, CellValue::Number(5.0));
        let cell = sheet.cell(1, 1).expect("cell present");
        assert_eq!(cell.value, CellValue::Number(5.0));
        assert_eq!(cell.style.as_deref(), Some("3"));
        assert!(!cell.has_formula());
        assert!(sheet.formulas_dropped);
    }

    #[test]
    fn loaded_sheets_start_clean() -> Result<(), XmlError> {
        let (mut sheet, _) = Sheet::from_part("Recon", "xl/worksheets/sheet1.xml", "<worksheet><sheetData/></worksheet>")?;
        sheet.insert_loaded(1, 1, Cell::new(CellValue::from("loaded")));
        assert!(!sheet.dirty);
        sheet.set_value(1, 1, CellValue::from("edited"));
        assert!(sheet.dirty);

        let (mut sheet, _) = Sheet::from_part("Recon", "xl/worksheets/sheet1.xml", "<worksheet><sheetData/></worksheet>")?;
        sheet.set_extent(4, 2);
        assert!(sheet.dirty);
        assert!(Sheet::new("Recon").dirty);
        Ok(())
    }

    #[test]
    fn split_sheet_data_variants() -> Result<(), XmlError> {
        let (prefix, body, suffix) = split_sheet_data("<worksheet><dimension ref=\"A1\"/><sheetData><row r=\"1\"/></sheetData><pageMargins/></worksheet>")?;
        assert_eq!(prefix, "<worksheet><dimension ref=\"A1\"/><sheetData>");
        assert_eq!(body, "<row r=\"1\"/>");
        assert_eq!(suffix, "</sheetData><pageMargins/></worksheet>");

        let (prefix, body, suffix) = split_sheet_data("<worksheet><sheetData/></worksheet>")?;
        assert_eq!(prefix, "<worksheet><sheetData>");
        assert_eq!(body, "");
        assert_eq!(suffix, "</sheetData></worksheet>");

        assert!(split_sheet_data("<worksheet/>").is_err());
        Ok(())
    }
}
