//! # Spreadsheet Document Module
//!
//! In-memory model of an `.xlsx` / `.xlsm` workbook: loading from bytes, sheet lookup,
//! cell access through the [`Grid`] capability and re-encoding back to bytes.
//! Everything outside worksheet cell data (styles, themes, drawings, the VBA project)
//! is carried through untouched.

pub mod cell;
pub mod document;
mod excel;
pub mod reference;
pub mod serializer;
pub mod sheet;
pub mod xlsx;

pub use cell::CellValue;
pub use document::Document;
pub use sheet::Sheet;

static EMPTY: CellValue = CellValue::Empty;

/// Read access to a 1-indexed cell grid with a reported extent.
///
/// Table extraction only depends on this trait, so it runs the same over a loaded
/// [`Sheet`] and over plain in-memory fixtures.
pub trait Grid {
    /// Largest row number the grid reports.
    fn max_row(&self) -> usize;

    /// Largest column number the grid reports.
    fn max_column(&self) -> usize;

    /// Value at a 1-based position; empty when nothing is stored there.
    fn value(&self, row: usize, column: usize) -> &CellValue;

    /// Values of one row across columns `1..=max_column`.
    fn row_values(&self, row: usize) -> Vec<CellValue> {
        (1..=self.max_column())
            .map(|column| self.value(row, column).clone())
            .collect()
    }

    /// Whether every column of the row is empty.
    fn is_row_empty(&self, row: usize) -> bool {
        (1..=self.max_column()).all(|column| self.value(row, column).is_empty())
    }
}

/// Write access to a cell grid.
pub trait GridMut: Grid {
    fn set_value(&mut self, row: usize, column: usize, value: CellValue);
}

impl Grid for Vec<Vec<CellValue>> {
    fn max_row(&self) -> usize {
        self.len()
    }

    fn max_column(&self) -> usize {
        self.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn value(&self, row: usize, column: usize) -> &CellValue {
        row.checked_sub(1)
            .zip(column.checked_sub(1))
            .and_then(|(row, column)| self.get(row)?.get(column))
            .unwrap_or(&EMPTY)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::spreadsheet::CellValue;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Builds grid rows from string literals; `""` is an empty cell.
    pub(crate) fn grid(rows: &[&[&str]]) -> Vec<Vec<CellValue>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|value| match *value {
                        "" => CellValue::Empty,
                        text => CellValue::from(text),
                    })
                    .collect()
            })
            .collect()
    }

    pub(crate) const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="bin" ContentType="application/vnd.ms-office.vbaProject"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.ms-excel.sheet.macroEnabled.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/></Types>"#;

    pub(crate) const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

    pub(crate) const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr codeName="ThisWorkbook"/><sheets><sheet name="Territories" sheetId="1" r:id="rId1"/><sheet name="WarDashboard" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

    pub(crate) const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId5" Type="http://schemas.microsoft.com/office/2006/relationships/vbaProject" Target="vbaProject.bin"/><Relationship Id="rId6" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/></Relationships>"#;

    pub(crate) const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="6" uniqueCount="6"><si><t>Campaign</t></si><si><t>RegionName</t></si><si><t>TerritoryState</t></si><si><t>Ashvale</t></si><si><r><t>Contr</t></r><r><rPr><b/></rPr><t>olled</t></r></si><si><t>Ghostwood</t><rPh sb="0" eb="1"><t>ghost</t></rPh></si></sst>"#;

    pub(crate) const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/></numFmts><cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164" applyNumberFormat="1"/><xf numFmtId="10" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

    /// Territories: title in A1, header in row 2, one record, a blank row, then unreachable data.
    pub(crate) const TERRITORIES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:C5"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetData><row r="1" spans="1:3" ht="24" customHeight="1"><c r="A1" t="s"><v>0</v></c></row><row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2" t="s"><v>2</v></c><c r="C2" t="inlineStr"><is><t>Captured</t></is></c></row><row r="3"><c r="A3" t="s"><v>3</v></c><c r="B3" t="s"><v>4</v></c><c r="C3" s="1"><v>45000</v></c><c r="D3"><f>1+1</f><v>2</v></c></row><row r="5"><c r="A5" t="s"><v>5</v></c><c r="B5" t="str"><f>"Lo"&amp;"st"</f><v>Lost</v></c></row></sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#;

    pub(crate) const DASHBOARD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Total Control %</t></is></c><c r="B1" s="2"><v>0.45</v></c></row><row r="2"><c r="A2" t="inlineStr"><is><t>Next Attack</t></is></c><c r="B2" t="e"><v>#N/A</v></c></row><row r="3"><c r="A3" t="inlineStr"><is><t>Fortified</t></is></c><c r="B3" t="b"><v>1</v></c></row></sheetData></worksheet>"#;

    pub(crate) const CALC_CHAIN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><c r="D3" i="1"/><c r="B5"/></calcChain>"#;

    /// Stand-in VBA project bytes; never interpreted.
    pub(crate) const VBA_PROJECT: &[u8] = b"\xd0\xcf\x11\xe0 opaque macro payload \x00\x01\x02\xff";

    /// Builds a macro-enabled workbook package with a Territories and a WarDashboard sheet.
    pub(crate) fn workbook_bytes() -> Vec<u8> {
        let parts: Vec<(&str, &[u8])> = vec![
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("xl/workbook.xml", WORKBOOK.as_bytes()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
            ("xl/sharedStrings.xml", SHARED_STRINGS.as_bytes()),
            ("xl/styles.xml", STYLES.as_bytes()),
            ("xl/worksheets/sheet1.xml", TERRITORIES.as_bytes()),
            ("xl/worksheets/sheet2.xml", DASHBOARD.as_bytes()),
            ("xl/calcChain.xml", CALC_CHAIN.as_bytes()),
            ("xl/vbaProject.bin", VBA_PROJECT),
        ];
        zip_bytes(&parts)
    }

    pub(crate) fn zip_bytes(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in parts {
            zip.start_file(*name, options).expect("start zip entry");
            zip.write_all(bytes).expect("write zip entry");
        }
        zip.finish().expect("finish zip").into_inner()
    }
}
