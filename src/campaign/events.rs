use crate::campaign::upgrades::event_type_codes;
use crate::campaign::EVENTS_SHEET;
use crate::campaign::TERRITORIES_SHEET;
use crate::campaign::UPGRADES_SHEET;
use crate::error::CampaignSheetError;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::Document;
use crate::spreadsheet::Grid;
use crate::spreadsheet::GridMut;
use crate::spreadsheet::Sheet;
use crate::table::criteria::DEFAULT_SENTINEL;
use crate::table::find_header_row;

/// Header row of the event log sheet.
pub const EVENT_HEADER: [&str; 4] = ["RegionName", "EventType", "Value", "Notes"];

/// One entry of the territory event log.
#[derive(Clone, Debug, PartialEq)]
pub struct TerritoryEvent {
    pub region: String,
    pub event_type: String,
    pub value: f64,
    pub notes: String,
}

/// Gets the event log sheet, creating it with its header row when missing.
/// An existing log is found whatever the case of its name.
pub fn ensure_event_sheet(document: &mut Document) -> Result<&mut Sheet, CampaignSheetError> {
    if document.sheet_ignore_case(EVENTS_SHEET).is_none() {
        let sheet = document.create_sheet(EVENTS_SHEET)?;
        for (index, title) in EVENT_HEADER.iter().enumerate() {
            sheet.set_value(1, index + 1, CellValue::from(*title));
        }
    }
    document
        .sheet_mut_ignore_case(EVENTS_SHEET)
        .ok_or_else(|| CampaignSheetError::SheetNotFound(EVENTS_SHEET.to_owned()))
}

/// Appends an event on the row after the sheet's reported last row; returns that row.
pub fn append_event(document: &mut Document, event: &TerritoryEvent) -> Result<usize, CampaignSheetError> {
    let sheet = ensure_event_sheet(document)?;
    let row = sheet.max_row() + 1;
    sheet.set_value(row, 1, CellValue::from(event.region.as_str()));
    sheet.set_value(row, 2, CellValue::from(event.event_type.as_str()));
    sheet.set_value(row, 3, CellValue::Number(event.value));
    sheet.set_value(row, 4, CellValue::from(event.notes.as_str()));
    log::debug!("Appended {} event for '{}' at row {}", event.event_type, event.region, row);
    Ok(row)
}

/// Region names of a territories grid: truthy column-A values of the region range.
pub fn region_names<G: Grid + ?Sized>(grid: &G) -> Result<Vec<String>, CampaignSheetError> {
    let header_row = find_header_row(grid, DEFAULT_SENTINEL)
        .ok_or_else(|| CampaignSheetError::HeaderNotFound { sentinel: DEFAULT_SENTINEL.to_owned() })?;
    let names = (header_row + 1..=grid.max_row())
        .take_while(|row| !grid.is_row_empty(*row))
        .map(|row| grid.value(row, 1))
        .filter(|name| name.is_truthy())
        .map(ToString::to_string)
        .collect();
    Ok(names)
}

/// Region pick list; empty when the territories sheet or its header is missing.
pub fn region_options(document: &Document) -> Vec<String> {
    document
        .sheet(TERRITORIES_SHEET)
        .map(|sheet| region_names(sheet).unwrap_or_default())
        .unwrap_or_default()
}

/// Event type pick list from the upgrades sheet, sorted and de-duplicated.
pub fn event_type_options(document: &Document) -> Vec<String> {
    document
        .sheet(UPGRADES_SHEET)
        .map(|sheet| event_type_codes(sheet))
        .unwrap_or_default()
}
