//! Microsoft Office Excel package helpers
use crate::error::CampaignSheetError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::NumberFormat;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// XML tag name for relationship elements in Excel files
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Signature of an OLE compound file, used by encrypted OOXML and legacy `.xls`
const COMPOUND_FILE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Relationship type suffix for worksheet parts
pub(super) const WORKSHEET_RELATIONSHIP: &str = "/worksheet";

/// A package relationship: its type URI and resolved part name.
#[derive(Clone, Debug)]
pub(super) struct Relationship {
    pub(super) kind: String,
    pub(super) target: String,
}

/// Loads relationships from a `.rels` part, keyed by relationship ID
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `path` - Path to the relationships XML file within the archive
///
/// # Returns
/// Mapping of relationship IDs to their type and target part
pub(super) fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
) -> Result<HashMap<String, Relationship>, CampaignSheetError> {
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => return Ok(HashMap::new()),
    };
    let mut relationships: HashMap<String, Relationship> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?.unwrap_or_default();
            let target = event.get_attribute_value("Target")?;
            if let Some((id, target)) = id.zip(target) {
                relationships.insert(id.to_string(), Relationship {
                    kind: kind.to_string(),
                    target: to_zip_path(&target),
                });
            }
        }
    });
    Ok(relationships)
}

/// Maps cell format indexes to number format classes using custom and built-in formats
///
/// # Arguments
/// * `format_indexes` - `numFmtId` of each `cellXfs/xf`, in style index order
/// * `custom_formats` - Custom format classes defined in the workbook
pub(super) fn load_number_formats(
    format_indexes: Vec<String>,
    custom_formats: HashMap<String, NumberFormat>,
) -> Vec<NumberFormat> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| NumberFormat::parse_builtin_id(id))
                .unwrap_or_default()
        })
        .collect()
}

/// Normalizes a workbook relationship target to a part name within the archive
pub(crate) fn to_zip_path(path: &str) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{}", path.trim_start_matches("./"))
    }
}

/// Checks whether the bytes are an OLE compound file rather than a ZIP package
pub(super) fn is_compound_file(bytes: &[u8]) -> bool {
    bytes.starts_with(&COMPOUND_FILE_SIGNATURE)
}
