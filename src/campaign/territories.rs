use crate::campaign::RECON_SHEET;
use crate::campaign::TERRITORIES_SHEET;
use crate::error::CampaignSheetError;
use crate::spreadsheet::Document;
use crate::table::criteria::DEFAULT_SENTINEL;
use crate::table::extract;
use crate::table::write_by_key;
use crate::table::write_positional;
use crate::table::Criteria;
use crate::table::Table;
use crate::table::WriteReport;

/// How edited territory records go back into the sheet.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteMode {
    /// Rewrite the region by position, clearing a margin below it
    Positional,
    /// Overwrite the rows whose value in the named column matches
    ByKey(String),
}

pub fn load_territories(document: &Document) -> Result<Table, CampaignSheetError> {
    extract(document.require_sheet(TERRITORIES_SHEET)?, &Criteria::sentinel(DEFAULT_SENTINEL))
}

pub fn load_recon(document: &Document) -> Result<Table, CampaignSheetError> {
    extract(document.require_sheet(RECON_SHEET)?, &Criteria::sentinel(DEFAULT_SENTINEL))
}

/// Applies an edited territories table to the workbook.
pub fn apply_territory_edits(
    document: &mut Document,
    table: &Table,
    mode: &WriteMode,
) -> Result<WriteReport, CampaignSheetError> {
    let sheet = document
        .sheet_mut(TERRITORIES_SHEET)
        .ok_or_else(|| CampaignSheetError::SheetNotFound(TERRITORIES_SHEET.to_owned()))?;
    match mode {
        WriteMode::Positional => {
            write_positional(sheet, table, DEFAULT_SENTINEL);
            Ok(WriteReport {
                updated: table.len(),
                dropped: Vec::new(),
            })
        }
        WriteMode::ByKey(key_column) => {
            let report = write_by_key(sheet, table, DEFAULT_SENTINEL, key_column)?;
            if !report.dropped.is_empty() {
                log::warn!(
                    "{} edited territories had no matching row and were not written",
                    report.dropped.len()
                );
            }
            Ok(report)
        }
    }
}
