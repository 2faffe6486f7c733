//! One uploaded workbook and the edits applied to it until it is downloaded again.

use crate::campaign::events;
use crate::campaign::territories;
use crate::campaign::CampaignView;
use crate::campaign::TerritoryEvent;
use crate::campaign::WriteMode;
use crate::spreadsheet::serializer::serialize;
use crate::spreadsheet::xlsx::load;
use crate::spreadsheet::Document;
use crate::table::Table;
use crate::table::WriteReport;
use anyhow::Context;
use anyhow::Result;

const XLSM_MIME_TYPE: &str = "application/vnd.ms-excel.sheet.macroEnabled.12";
const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// An open workbook together with the name it was uploaded under.
#[derive(Debug)]
pub struct Session {
    file_name: String,
    document: Document,
}

/// Bytes ready to hand back to the user.
#[derive(Clone, Debug, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Session {
    pub fn open(file_name: &str, bytes: &[u8]) -> Result<Self> {
        let document = load(bytes).with_context(|| format!("Failed to open '{}'", file_name))?;
        log::info!(
            "Opened '{}' with sheets {:?}",
            file_name,
            document.sheet_names()
        );
        Ok(Session {
            file_name: file_name.to_owned(),
            document,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Rebuilds every campaign section from the current document state.
    pub fn view(&self) -> CampaignView {
        CampaignView::load(&self.document)
    }

    pub fn apply_territory_edits(&mut self, table: &Table, mode: &WriteMode) -> Result<WriteReport> {
        territories::apply_territory_edits(&mut self.document, table, mode)
            .context("Failed to write territory edits")
    }

    /// Appends to the event log and returns the row written.
    pub fn append_event(&mut self, event: &TerritoryEvent) -> Result<usize> {
        let row = events::append_event(&mut self.document, event).context("Failed to log territory event")?;
        log::info!("Logged {} for '{}'", event.event_type, event.region);
        Ok(row)
    }

    /// Serializes the document under the uploaded file name.
    pub fn download(&self) -> Result<Download> {
        let bytes = serialize(&self.document)
            .with_context(|| format!("Failed to save '{}'", self.file_name))?;
        log::info!("Prepared '{}' for download ({} bytes)", self.file_name, bytes.len());
        Ok(Download {
            file_name: self.file_name.clone(),
            mime_type: mime_type(&self.file_name),
            bytes,
        })
    }
}

/// Content type for a download name: macro-enabled for `.xlsm`, plain workbook otherwise.
pub fn mime_type(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".xlsm") {
        XLSM_MIME_TYPE
    } else {
        XLSX_MIME_TYPE
    }
}
