//! Workbook loader for `.xlsx` / `.xlsm` packages
use crate::error::CampaignSheetError;
use crate::error::ResultMessage;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::parse_iso_datetime;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::cell::DateSystem;
use crate::spreadsheet::cell::Formula;
use crate::spreadsheet::cell::NumberFormat;
use crate::spreadsheet::document::Document;
use crate::spreadsheet::document::MacroPayload;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::Relationship;
use crate::spreadsheet::excel::WORKSHEET_RELATIONSHIP;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

// XML tag names for parsing SpreadsheetML parts
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content
const TAG_FORMULA: QName = QName(b"f");               // Cell formula

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";

/// Relationship type suffix for the VBA project part
const VBA_PROJECT_RELATIONSHIP: &str = "/vbaProject";
const DEFAULT_VBA_PROJECT_PART: &str = "xl/vbaProject.bin";

/// Loads a workbook from raw `.xlsx` / `.xlsm` bytes.
///
/// Cell values are read as cached results; formulas are kept but never evaluated.
/// The VBA project, if present, is carried as an opaque payload. Any failure is
/// reported as [`CampaignSheetError::LoadError`].
pub fn load(bytes: &[u8]) -> Result<Document, CampaignSheetError> {
    if excel::is_compound_file(bytes) {
        return Err(CampaignSheetError::LoadError(
            "file is an encrypted or legacy binary workbook, not an xlsx/xlsm package".to_owned(),
        ));
    }
    read_package(bytes).map_err(|error| match error {
        CampaignSheetError::LoadError(_) => error,
        other => CampaignSheetError::LoadError(other.to_string()),
    })
}

fn read_package(bytes: &[u8]) -> Result<Document, CampaignSheetError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let relationships = load_relationships(&mut zip, WORKBOOK_RELATIONSHIPS_PART)?;
    let (entries, is_1904) = load_workbook(&mut zip, &relationships)?;
    let date_system = if is_1904 { DateSystem::Excel1904 } else { DateSystem::Excel1900 };
    let number_formats = load_number_formats(&mut zip)?;
    let shared_strings = load_shared_strings(&mut zip)?;

    let macro_path = relationships
        .values()
        .find(|relationship| relationship.kind.ends_with(VBA_PROJECT_RELATIONSHIP))
        .map(|relationship| relationship.target.to_owned())
        .unwrap_or_else(|| DEFAULT_VBA_PROJECT_PART.to_owned());

    let mut parts = Vec::<(String, Vec<u8>)>::with_capacity(zip.len());
    let mut macro_payload = None::<MacroPayload>;
    for index in 0..zip.len() {
        let mut file = zip.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_owned();
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)?;
        if name.eq_ignore_ascii_case(&macro_path) {
            macro_payload = Some(MacroPayload { path: name, bytes: content });
        } else {
            parts.push((name, content));
        }
    }

    let mut sheets = Vec::<Sheet>::with_capacity(entries.len());
    for (sheet_name, zip_path) in &entries {
        let (part, content) = parts
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(zip_path))
            .ok_or_else(|| CampaignSheetError::LoadError(format!("worksheet part '{}' for '{}' is missing", zip_path, sheet_name)))?;
        let xml = std::str::from_utf8(content)?;
        let (mut sheet, body) = Sheet::from_part(sheet_name, part, xml)?;
        read_cells(&mut sheet, body, &shared_strings, &number_formats, date_system)
            .with_prefix(&format!("worksheet '{}'", sheet_name))?;
        log::debug!(
            "Loaded worksheet '{}' from {} ({} cells)",
            sheet_name,
            part,
            sheet.cells.len()
        );
        sheets.push(sheet);
    }

    log::debug!(
        "Loaded workbook with {} sheets, {} other parts, macro payload: {}",
        sheets.len(),
        parts.len(),
        macro_payload
            .as_ref()
            .map(|payload| format!("{} bytes", payload.bytes.len()))
            .unwrap_or_else(|| "none".to_owned())
    );
    Ok(Document::from_package(sheets, parts, macro_payload, date_system))
}

/// Loads workbook structure and worksheet information
///
/// Parses the workbook.xml file to extract worksheet names and their corresponding
/// part names, and determines the date system (1900 vs 1904) used in the file.
///
/// # Returns
/// Tuple of (worksheets, is_1904_date_system) where worksheets are (name, zip_path) pairs
fn load_workbook<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    relationships: &HashMap<String, Relationship>,
) -> Result<(Vec<(String, String)>, bool), CampaignSheetError> {
    let mut reader = zip.xml_reader(WORKBOOK_PART)?
        .ok_or_else(|| CampaignSheetError::LoadError(format!("{} not found; not a spreadsheet package", WORKBOOK_PART)))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.unescape_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.unescape_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                match relationships.get(id.as_ref()) {
                    Some(relationship) if relationship.kind.ends_with(WORKSHEET_RELATIONSHIP) => {
                        sheets.push((name.to_string(), relationship.target.to_owned()));
                    }
                    // Chartsheets and dialog sheets carry no cell grid
                    Some(relationship) => log::debug!("Skipping sheet '{}' of type {}", name, relationship.kind),
                    None => log::warn!("Sheet '{}' has no relationship '{}'", name, id),
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number format classes indexed by cell style, used to recognise date cells
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<NumberFormat>, CampaignSheetError> {
    let mut reader = match zip.xml_reader(STYLES_PART)? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut has_custom_formats = false;
    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, NumberFormat>::new();

    let mut has_format_indexes = false;
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if !custom_formats_context && event.name() == TAG_CUSTOM_FORMATS => {
            has_custom_formats = true;
            custom_formats_context = true;
        }
        Event::End(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMATS => {
            custom_formats_context = false;
            if has_custom_formats && has_format_indexes {
                break;
            }
        }
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), NumberFormat::parse_custom(&format));
            }
        }

        Event::Start(event) if !format_indexes_context && event.name() == TAG_FORMAT_INDEXES => {
            has_format_indexes = true;
            format_indexes_context = true;
        }
        Event::End(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEXES => {
            format_indexes_context = false;
            if has_custom_formats && has_format_indexes {
                break;
            }
        }
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?.unwrap_or(Cow::Borrowed("0"));
            format_indexes.push(id.to_string());
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats))
}

/// Loads the shared string table; rich-text runs are concatenated
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, CampaignSheetError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader(SHARED_STRINGS_PART)? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
            shared_strings.push(string);
        }
    });
    Ok(shared_strings)
}

/// Parses the body of `<sheetData>` into the sheet's cells and row attributes
fn read_cells(
    sheet: &mut Sheet,
    body: &str,
    shared_strings: &[String],
    number_formats: &[NumberFormat],
    date_system: DateSystem,
) -> Result<(), CampaignSheetError> {
    let mut reader = XmlReader::new(body.as_bytes());
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = String::new();
    let mut style = None::<String>;
    let mut value = String::new();
    let mut formula = None::<Formula>;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_ROW => {
            row_count = event.parse_attribute_value::<usize>("r")?.unwrap_or(row_count + 1);
            col_count = 0;
            let attributes = event.owned_attributes(&["r", "spans"])?;
            sheet.insert_row_attributes(row_count, attributes);
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count + 1));
            col_count = col;
            kind = event.get_attribute_value("t")?.map(|t| t.into_owned()).unwrap_or_default();
            style = event.get_attribute_value("s")?.map(|s| s.into_owned());
            value.clear();
            formula = None;
        }
        Event::Start(event) if event.name() == TAG_FORMULA => {
            let attributes = event.owned_attributes(&[])?;
            let text = read_string_value(&mut reader, TAG_FORMULA, true)?;
            formula = Some(Formula { attributes, text });
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.name() == TAG_CELL => {
            let format = style
                .as_deref()
                .and_then(|index| index.parse::<usize>().ok())
                .and_then(|index| number_formats.get(index))
                .copied()
                .unwrap_or_default();
            let cell_value = to_cell_value(&kind, &value, format, shared_strings, date_system)?;
            sheet.insert_loaded(row, col, Cell {
                value: cell_value,
                style: style.take(),
                formula: formula.take(),
            });
        }
    });
    Ok(())
}

/// Converts the raw `<v>` / `<is>` content of a cell according to its type attribute
fn to_cell_value(
    kind: &str,
    value: &str,
    format: NumberFormat,
    shared_strings: &[String],
    date_system: DateSystem,
) -> Result<CellValue, CampaignSheetError> {
    if value.is_empty() && kind != "inlineStr" {
        return Ok(CellValue::Empty);
    }
    let cell_value = match kind {
        "s" => {
            let index = value.trim().parse::<usize>()?;
            let text = shared_strings
                .get(index)
                .ok_or_else(|| CampaignSheetError::LoadError(format!("shared string {} out of range", index)))?;
            CellValue::Text(text.to_owned())
        }
        "inlineStr" | "str" => CellValue::Text(value.to_owned()),
        "b" => CellValue::Bool(value == "1" || value.eq_ignore_ascii_case("true")),
        "e" => CellValue::Error(value.to_owned()),
        "d" => parse_iso_datetime(value)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(value.to_owned())),
        _ => {
            let number = value.trim().parse::<f64>()?;
            match format.is_temporal().then(|| date_system.to_datetime(number)).flatten() {
                Some(datetime) => CellValue::DateTime(datetime),
                None => CellValue::Number(number),
            }
        }
    };
    Ok(cell_value)
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// Extracts string content from XML elements, skipping phonetic text annotations
/// and properly handling both text nodes and CDATA sections.
///
/// # Arguments
/// * `reader` - XML reader positioned at the start of the string content
/// * `end_tag` - XML tag that marks the end of the string content
/// * `is_text_content` - Whether to treat the content as text by default
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, CampaignSheetError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
