use thiserror::Error;

/// Main error type for the campaign sheet crate.
/// Aggregates errors from the workbook container, the XML layer and the table operations.
#[derive(Error, Debug)]
pub enum CampaignSheetError {
    #[error("{0}")]
    WithContextError(String),

    // Workbook lifecycle errors
    #[error("Failed to load workbook: {0}")]
    LoadError(String),

    #[error("Failed to serialize workbook: {0}")]
    SerializationError(String),

    // Sheet and table errors
    #[error("Worksheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Worksheet '{0}' already exists")]
    SheetExists(String),

    #[error("Header row not found (looking for '{sentinel}' in column A)")]
    HeaderNotFound { sentinel: String },

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),
}

impl CampaignSheetError {
    /// Whether the error only degrades one section of the dashboard.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CampaignSheetError::SheetNotFound(_)
                | CampaignSheetError::HeaderNotFound { .. }
                | CampaignSheetError::ColumnNotFound(_)
        )
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, CampaignSheetError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| CampaignSheetError::WithContextError(format!("{}: {}", message, e)))
    }
}
