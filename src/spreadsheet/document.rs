use crate::error::CampaignSheetError;
use crate::spreadsheet::cell::DateSystem;
use crate::spreadsheet::sheet::Sheet;

const BLANK_CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"</Types>"#,
);

const BLANK_ROOT_RELATIONSHIPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

const BLANK_WORKBOOK: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    r#"<sheets></sheets></workbook>"#,
);

const BLANK_WORKBOOK_RELATIONSHIPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#,
);

/// Name of the single sheet of a blank document.
const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// The VBA project part of a macro-enabled workbook, carried without interpretation.
#[derive(Clone, Debug, PartialEq)]
pub struct MacroPayload {
    pub(crate) path: String,
    pub(crate) bytes: Vec<u8>,
}

impl MacroPayload {
    /// Part name inside the package, usually `xl/vbaProject.bin`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// An in-memory workbook.
///
/// Holds the worksheets in workbook order, the optional macro payload and every
/// other package part as raw bytes so that they survive a round trip untouched.
#[derive(Clone, Debug)]
pub struct Document {
    pub(crate) sheets: Vec<Sheet>,
    /// Package parts in archive order, worksheet parts included, macro payload excluded
    pub(crate) parts: Vec<(String, Vec<u8>)>,
    pub(crate) macro_payload: Option<MacroPayload>,
    pub(crate) date_system: DateSystem,
}

impl Document {
    /// Creates a blank workbook with one empty sheet.
    pub fn new() -> Self {
        let parts = vec![
            ("[Content_Types].xml".to_owned(), BLANK_CONTENT_TYPES.as_bytes().to_vec()),
            ("_rels/.rels".to_owned(), BLANK_ROOT_RELATIONSHIPS.as_bytes().to_vec()),
            ("xl/workbook.xml".to_owned(), BLANK_WORKBOOK.as_bytes().to_vec()),
            ("xl/_rels/workbook.xml.rels".to_owned(), BLANK_WORKBOOK_RELATIONSHIPS.as_bytes().to_vec()),
        ];
        Document {
            sheets: vec![Sheet::new(DEFAULT_SHEET_NAME)],
            parts,
            macro_payload: None,
            date_system: DateSystem::default(),
        }
    }

    pub(crate) fn from_package(
        sheets: Vec<Sheet>,
        parts: Vec<(String, Vec<u8>)>,
        macro_payload: Option<MacroPayload>,
        date_system: DateSystem,
    ) -> Self {
        Document {
            sheets,
            parts,
            macro_payload,
            date_system,
        }
    }

    /// Looks up a sheet by exact name; a missing sheet is a normal condition.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|sheet| sheet.name == name)
    }

    /// Looks up a sheet by name ignoring case, the way a workbook keeps tab names unique.
    pub fn sheet_ignore_case(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| same_sheet_name(&sheet.name, name))
    }

    pub fn sheet_mut_ignore_case(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|sheet| same_sheet_name(&sheet.name, name))
    }

    /// Looks up a sheet, turning absence into [`CampaignSheetError::SheetNotFound`].
    pub fn require_sheet(&self, name: &str) -> Result<&Sheet, CampaignSheetError> {
        self.sheet(name)
            .ok_or_else(|| CampaignSheetError::SheetNotFound(name.to_owned()))
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name()).collect()
    }

    /// Appends a new empty sheet at the end of the workbook.
    ///
    /// Fails with [`CampaignSheetError::SheetExists`] when a sheet of the same name,
    /// compared ignoring case, is already present.
    pub fn create_sheet(&mut self, name: &str) -> Result<&mut Sheet, CampaignSheetError> {
        if let Some(existing) = self.sheet_ignore_case(name) {
            return Err(CampaignSheetError::SheetExists(existing.name.clone()));
        }
        log::debug!("Creating worksheet '{}'", name);
        self.sheets.push(Sheet::new(name));
        let index = self.sheets.len() - 1;
        Ok(&mut self.sheets[index])
    }

    pub fn macro_payload(&self) -> Option<&MacroPayload> {
        self.macro_payload.as_ref()
    }

    pub fn date_system(&self) -> DateSystem {
        self.date_system
    }

    /// Raw bytes of a package part, matched case-insensitively.
    pub(crate) fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(part, _)| part.eq_ignore_ascii_case(name))
            .map(|(_, bytes)| bytes.as_slice())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Sheet names compare case-insensitively.
pub(crate) fn same_sheet_name(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::Grid;

    #[test]
    fn blank_document() {
        let document = Document::new();
        assert_eq!(document.sheet_names(), vec!["Sheet1"]);
        assert!(document.macro_payload().is_none());
        assert!(document.part("XL/WORKBOOK.XML").is_some());
    }

    #[test]
    fn locate_sheets() {
        let mut document = Document::new();
        assert!(document.sheet("Recon").is_none());
        assert!(matches!(
            document.require_sheet("Recon"),
            Err(CampaignSheetError::SheetNotFound(name)) if name == "Recon"
        ));
        assert!(document.sheet("sheet1").is_none());
        assert!(document.sheet_mut("Sheet1").is_some());
    }

    #[test]
    fn create_sheet_once() -> Result<(), CampaignSheetError> {
        let mut document = Document::new();
        let sheet = document.create_sheet("TerritoryEvents")?;
        assert_eq!(sheet.max_row(), 1);
        assert!(matches!(
            document.create_sheet("TerritoryEvents"),
            Err(CampaignSheetError::SheetExists(_))
        ));
        assert_eq!(document.sheet_names(), vec!["Sheet1", "TerritoryEvents"]);
        Ok(())
    }

    #[test]
    fn sheet_names_are_unique_ignoring_case() {
        let mut document = Document::new();
        assert!(matches!(
            document.create_sheet("SHEET1"),
            Err(CampaignSheetError::SheetExists(name)) if name == "Sheet1"
        ));
        assert_eq!(document.sheet_ignore_case("sheet1").map(Sheet::name), Some("Sheet1"));
        assert!(document.sheet_mut_ignore_case("SHEET1").is_some());
        assert_eq!(document.sheet_names(), vec!["Sheet1"]);
    }
}
