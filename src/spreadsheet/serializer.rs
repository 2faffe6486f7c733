//! Workbook serializer: validates a [`Document`] and re-encodes it as a ZIP package
use crate::error::CampaignSheetError;
use crate::helpers::xml::attributes_to_xml;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::cell::DateSystem;
use crate::spreadsheet::document::same_sheet_name;
use crate::spreadsheet::document::Document;
use crate::spreadsheet::excel::to_zip_path;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Grid;
use quick_xml::escape::escape;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use regex::Captures;
use regex::Regex;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::io::Cursor;
use std::io::Write;
use std::sync::LazyLock;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PART: &str = "xl/_rels/workbook.xml.rels";
const DEFAULT_CALC_CHAIN_PART: &str = "xl/calcChain.xml";

const RELATIONSHIPS_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WORKSHEET_RELATIONSHIP_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const WORKSHEET_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CALC_CHAIN_RELATIONSHIP: &str = "/calcChain";

/// Characters a workbook rejects in sheet names
const INVALID_SHEET_NAME_CHARACTERS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
const MAX_SHEET_NAME_LENGTH: usize = 31;

static DIMENSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<dimension\b[^>]*?\bref=")[^"]*(")"#).expect("Hardcode regex pattern"));

/// A sheet created in memory that needs its own package part.
struct NewSheet<'a> {
    sheet: &'a Sheet,
    part: String,
    relationship_id: String,
    sheet_id: u32,
}

/// Serializes a document back to `.xlsx` / `.xlsm` bytes.
///
/// Every sheet is validated first: names must be unique ignoring case, non-empty
/// cells must lie inside the reported extent and numbers must be finite. Sheets
/// never written to since loading and the macro payload are copied unchanged.
/// Any failure is reported as [`CampaignSheetError::SerializationError`].
pub fn serialize(document: &Document) -> Result<Vec<u8>, CampaignSheetError> {
    for (index, sheet) in document.sheets.iter().enumerate() {
        validate_sheet(sheet)?;
        if document.sheets[..index]
            .iter()
            .any(|earlier| same_sheet_name(earlier.name(), sheet.name()))
        {
            return Err(CampaignSheetError::SerializationError(format!(
                "duplicate sheet name '{}'",
                sheet.name()
            )));
        }
    }
    write_package(document).map_err(|error| match error {
        CampaignSheetError::SerializationError(_) => error,
        other => CampaignSheetError::SerializationError(other.to_string()),
    })
}

/// Checks a sheet can be encoded faithfully.
pub(crate) fn validate_sheet(sheet: &Sheet) -> Result<(), CampaignSheetError> {
    let name = sheet.name();
    if name.trim().is_empty()
        || name.chars().count() > MAX_SHEET_NAME_LENGTH
        || name.contains(INVALID_SHEET_NAME_CHARACTERS)
    {
        return Err(CampaignSheetError::SerializationError(format!("invalid sheet name '{}'", name)));
    }
    for ((row, column), cell) in sheet.cells() {
        if cell.value.is_empty() {
            continue;
        }
        if *row > sheet.max_row() || *column > sheet.max_column() {
            return Err(CampaignSheetError::SerializationError(format!(
                "sheet '{}': cell {} lies outside the reported extent {}",
                name,
                index_to_reference(*row, *column),
                index_to_reference(sheet.max_row(), sheet.max_column()),
            )));
        }
        if let CellValue::Number(number) = cell.value {
            if !number.is_finite() {
                return Err(CampaignSheetError::SerializationError(format!(
                    "sheet '{}': cell {} holds a non-finite number",
                    name,
                    index_to_reference(*row, *column),
                )));
            }
        }
    }
    Ok(())
}

fn write_package(document: &Document) -> Result<Vec<u8>, CampaignSheetError> {
    let new_sheets = plan_new_sheets(document)?;
    let drop_calc_chain = document.sheets.iter().any(|sheet| sheet.formulas_dropped);
    let calc_chain = drop_calc_chain
        .then(|| calc_chain_part(document))
        .transpose()?
        .flatten();

    let mut replaced = HashMap::<String, Vec<u8>>::new();
    if !new_sheets.is_empty() || calc_chain.is_some() {
        for (part, edited) in edit_package_parts(document, &new_sheets, calc_chain.as_deref())? {
            replaced.insert(part.to_ascii_lowercase(), edited);
        }
    }
    let sheet_parts = document
        .sheets
        .iter()
        .filter_map(|sheet| sheet.part.as_ref().map(|part| (part.to_ascii_lowercase(), sheet)))
        .collect::<HashMap<String, &Sheet>>();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut part_count = 0usize;
    for (name, bytes) in &document.parts {
        let key = name.to_ascii_lowercase();
        if calc_chain.as_deref().is_some_and(|part| part.eq_ignore_ascii_case(name)) {
            log::debug!("Dropping {} after formula edits", name);
            continue;
        }
        zip.start_file(name.as_str(), options)?;
        if let Some(sheet) = sheet_parts.get(&key).filter(|sheet| sheet.dirty) {
            zip.write_all(sheet_to_xml(sheet, document.date_system).as_bytes())?;
        } else if let Some(edited) = replaced.get(&key) {
            zip.write_all(edited)?;
        } else {
            zip.write_all(bytes)?;
        }
        part_count += 1;
    }
    for new_sheet in &new_sheets {
        zip.start_file(new_sheet.part.as_str(), options)?;
        zip.write_all(sheet_to_xml(new_sheet.sheet, document.date_system).as_bytes())?;
        part_count += 1;
    }
    if let Some(payload) = document.macro_payload() {
        zip.start_file(payload.path(), options)?;
        zip.write_all(payload.bytes())?;
        part_count += 1;
    }
    let bytes = zip.finish()?.into_inner();
    log::debug!(
        "Serialized workbook: {} sheets ({} new), {} parts, {} bytes",
        document.sheets.len(),
        new_sheets.len(),
        part_count,
        bytes.len()
    );
    Ok(bytes)
}

/// Assigns part names, relationship IDs and sheet IDs to sheets created in memory.
fn plan_new_sheets(document: &Document) -> Result<Vec<NewSheet<'_>>, CampaignSheetError> {
    let created = document
        .sheets
        .iter()
        .filter(|sheet| sheet.part.is_none())
        .collect::<Vec<_>>();
    if created.is_empty() {
        return Ok(Vec::new());
    }

    let mut sheet_id = 0u32;
    if let Some(workbook) = document.part(WORKBOOK_PART) {
        let mut reader = XmlReader::new(workbook);
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == b"sheet" => {
                sheet_id = sheet_id.max(event.parse_attribute_value::<u32>("sheetId")?.unwrap_or(0));
            }
        });
    }
    let mut relationship_id = 0u32;
    if let Some(relationships) = document.part(WORKBOOK_RELATIONSHIPS_PART) {
        let mut reader = XmlReader::new(relationships);
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == b"Relationship" => {
                let id = event
                    .get_attribute_value("Id")?
                    .and_then(|id| id.strip_prefix("rId").and_then(|number| number.parse::<u32>().ok()));
                relationship_id = relationship_id.max(id.unwrap_or(0));
            }
        });
    }

    let mut taken = document
        .parts
        .iter()
        .map(|(name, _)| name.to_ascii_lowercase())
        .collect::<HashSet<String>>();
    let mut number = 1usize;
    let mut planned = Vec::with_capacity(created.len());
    for sheet in created {
        let part = loop {
            let candidate = format!("xl/worksheets/sheet{}.xml", number);
            number += 1;
            if taken.insert(candidate.to_ascii_lowercase()) {
                break candidate;
            }
        };
        sheet_id += 1;
        relationship_id += 1;
        planned.push(NewSheet {
            sheet,
            part,
            relationship_id: format!("rId{}", relationship_id),
            sheet_id,
        });
    }
    Ok(planned)
}

/// Finds the calculation chain part through the workbook relationships.
fn calc_chain_part(document: &Document) -> Result<Option<String>, CampaignSheetError> {
    let mut target = None::<String>;
    if let Some(relationships) = document.part(WORKBOOK_RELATIONSHIPS_PART) {
        let mut reader = XmlReader::new(relationships);
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == b"Relationship" => {
                let kind = event.get_attribute_value("Type")?.unwrap_or_default();
                if kind.ends_with(CALC_CHAIN_RELATIONSHIP) {
                    target = event.get_attribute_value("Target")?.map(|target| to_zip_path(&target));
                }
            }
        });
    }
    let part = target.unwrap_or_else(|| DEFAULT_CALC_CHAIN_PART.to_owned());
    Ok(document.part(&part).map(|_| part))
}

/// Rewrites the workbook, its relationships and the content types to register new
/// sheets and to forget the calculation chain.
fn edit_package_parts(
    document: &Document,
    new_sheets: &[NewSheet<'_>],
    calc_chain: Option<&str>,
) -> Result<Vec<(&'static str, Vec<u8>)>, CampaignSheetError> {
    let mut edited = Vec::new();
    let calc_chain_part_name = calc_chain.map(|part| format!("/{}", part));

    if let Some(workbook) = document.part(WORKBOOK_PART) {
        if !new_sheets.is_empty() {
            let prefix = relationship_prefix(workbook)?;
            let id_attribute = format!("{}:id", prefix.as_deref().unwrap_or("r"));
            let additions = new_sheets
                .iter()
                .map(|new_sheet| {
                    let sheet_id = new_sheet.sheet_id.to_string();
                    let mut element = BytesStart::new("sheet");
                    element.push_attribute(("name", new_sheet.sheet.name()));
                    element.push_attribute(("sheetId", sheet_id.as_str()));
                    if prefix.is_none() {
                        element.push_attribute(("xmlns:r", RELATIONSHIPS_NAMESPACE));
                    }
                    element.push_attribute((id_attribute.as_str(), new_sheet.relationship_id.as_str()));
                    element
                })
                .collect::<Vec<_>>();
            edited.push((WORKBOOK_PART, edit_part(workbook, b"sheets", &additions, |_| Ok(false))?));
        }
    }

    if let Some(relationships) = document.part(WORKBOOK_RELATIONSHIPS_PART) {
        let additions = new_sheets
            .iter()
            .map(|new_sheet| {
                let target = new_sheet.part.trim_start_matches("xl/");
                let mut element = BytesStart::new("Relationship");
                element.push_attribute(("Id", new_sheet.relationship_id.as_str()));
                element.push_attribute(("Type", WORKSHEET_RELATIONSHIP_TYPE));
                element.push_attribute(("Target", target));
                element
            })
            .collect::<Vec<_>>();
        let drop_calc_chain = calc_chain.is_some();
        let updated = edit_part(relationships, b"Relationships", &additions, |element| {
            if !drop_calc_chain || element.local_name().as_ref() != b"Relationship" {
                return Ok(false);
            }
            let kind = element.get_attribute_value("Type")?.unwrap_or_default();
            Ok(kind.ends_with(CALC_CHAIN_RELATIONSHIP))
        })?;
        edited.push((WORKBOOK_RELATIONSHIPS_PART, updated));
    }

    if let Some(content_types) = document.part(CONTENT_TYPES_PART) {
        let additions = new_sheets
            .iter()
            .map(|new_sheet| {
                let part_name = format!("/{}", new_sheet.part);
                let mut element = BytesStart::new("Override");
                element.push_attribute(("PartName", part_name.as_str()));
                element.push_attribute(("ContentType", WORKSHEET_CONTENT_TYPE));
                element
            })
            .collect::<Vec<_>>();
        let updated = edit_part(content_types, b"Types", &additions, |element| {
            if element.local_name().as_ref() != b"Override" {
                return Ok(false);
            }
            let part_name = element.get_attribute_value("PartName")?;
            Ok(part_name
                .zip(calc_chain_part_name.as_deref())
                .is_some_and(|(part_name, calc_chain)| part_name.eq_ignore_ascii_case(calc_chain)))
        })?;
        edited.push((CONTENT_TYPES_PART, updated));
    }

    Ok(edited)
}

/// Streams a package XML part, dropping elements matched by `remove` and inserting
/// `additions` as the last children of the `container` element.
fn edit_part<F>(
    xml: &[u8],
    container: &[u8],
    additions: &[BytesStart<'static>],
    remove: F,
) -> Result<Vec<u8>, CampaignSheetError>
where
    F: Fn(&BytesStart) -> Result<bool, CampaignSheetError>,
{
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256 * additions.len()));
    let mut buffer = Vec::new();
    let mut skipping = 0usize;
    loop {
        let event = reader.read_event_into(&mut buffer)?;
        let removed = match &event {
            Event::Start(element) | Event::Empty(element) if skipping == 0 => remove(element)?,
            _ => false,
        };
        match event {
            Event::Eof => break,
            Event::Start(_) if skipping > 0 => skipping += 1,
            Event::End(_) if skipping > 0 => skipping -= 1,
            _ if skipping > 0 => (),
            Event::Start(_) if removed => skipping = 1,
            Event::Empty(_) if removed => (),
            Event::Empty(element) if element.local_name().as_ref() == container => {
                let end = element.to_end().into_owned();
                writer.write_event(Event::Start(element))?;
                write_additions(&mut writer, additions)?;
                writer.write_event(Event::End(end))?;
            }
            Event::End(element) if element.local_name().as_ref() == container => {
                write_additions(&mut writer, additions)?;
                writer.write_event(Event::End(element))?;
            }
            other => writer.write_event(other)?,
        }
        buffer.clear();
    }
    Ok(writer.into_inner())
}

fn write_additions(writer: &mut Writer<Vec<u8>>, additions: &[BytesStart<'static>]) -> Result<(), CampaignSheetError> {
    for element in additions {
        writer.write_event(Event::Empty(element.borrow()))?;
    }
    Ok(())
}

/// Finds the namespace prefix the workbook root binds to the relationships namespace.
fn relationship_prefix(workbook: &[u8]) -> Result<Option<String>, CampaignSheetError> {
    let mut reader = Reader::from_reader(workbook);
    let mut buffer = Vec::new();
    loop {
        match reader.read_event_into(&mut buffer)? {
            Event::Start(element) | Event::Empty(element) => {
                for attribute in element.attributes() {
                    let attribute = attribute?;
                    let key = std::str::from_utf8(attribute.key.as_ref())?;
                    if let Some(prefix) = key.strip_prefix("xmlns:") {
                        if attribute.unescape_value()? == RELATIONSHIPS_NAMESPACE {
                            return Ok(Some(prefix.to_owned()));
                        }
                    }
                }
                return Ok(None);
            }
            Event::Eof => return Ok(None),
            _ => (),
        }
        buffer.clear();
    }
}

/// Renders a worksheet: preserved prefix with an updated dimension, the cell data, preserved suffix.
fn sheet_to_xml(sheet: &Sheet, date_system: DateSystem) -> String {
    let last = index_to_reference(sheet.max_row(), sheet.max_column());
    let reference = if last == "A1" { last } else { format!("A1:{}", last) };
    let prefix = DIMENSION_PATTERN.replace(&sheet.prefix, |captures: &Captures| {
        format!("{}{}{}", &captures[1], reference, &captures[2])
    });

    // Shared formula groups whose defining cell survived
    let anchors = sheet
        .cells
        .values()
        .filter_map(|cell| cell.formula.as_ref())
        .filter(|formula| formula.is_shared_anchor())
        .filter_map(|formula| formula.shared_index())
        .collect::<HashSet<&str>>();

    let rows = sheet
        .rows
        .keys()
        .copied()
        .chain(sheet.cells.keys().map(|(row, _)| *row))
        .collect::<BTreeSet<usize>>();

    let mut out = String::with_capacity(prefix.len() + sheet.suffix.len() + sheet.cells.len() * 32);
    out.push_str(&prefix);
    for row in rows {
        let cells = sheet
            .cells
            .range((row, 1)..=(row, usize::MAX))
            .filter(|(_, cell)| !cell.value.is_empty() || cell.style.is_some() || cell.formula.is_some())
            .map(|((row, column), cell)| cell_to_xml(*row, *column, cell, &anchors, date_system))
            .collect::<String>();
        let attributes = sheet.rows.get(&row).map(|attributes| attributes_to_xml(attributes)).unwrap_or_default();
        if cells.is_empty() && attributes.is_empty() {
            continue;
        }
        out.push_str(&format!("<row r=\"{}\"{}", row, attributes));
        if cells.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            out.push_str(&cells);
            out.push_str("</row>");
        }
    }
    out.push_str(&sheet.suffix);
    out
}

fn cell_to_xml(row: usize, column: usize, cell: &Cell, anchors: &HashSet<&str>, date_system: DateSystem) -> String {
    let formula = cell.formula.as_ref().filter(|formula| {
        formula.shared_index().map(|index| anchors.contains(index)).unwrap_or(true)
    });
    let mut out = format!("<c r=\"{}\"", index_to_reference(row, column));
    if let Some(style) = &cell.style {
        out.push_str(&format!(" s=\"{}\"", escape(style.as_str())));
    }
    let (kind, value) = match &cell.value {
        CellValue::Empty => (None, None),
        CellValue::Text(text) if formula.is_some() => (Some("str"), Some(escape(text.as_str()).into_owned())),
        CellValue::Text(text) => (Some("inlineStr"), Some(text.to_owned())),
        CellValue::Number(number) => (None, Some(number.to_string())),
        CellValue::Bool(value) => (Some("b"), Some(if *value { "1" } else { "0" }.to_owned())),
        CellValue::DateTime(datetime) => (None, Some(date_system.to_serial(datetime).to_string())),
        CellValue::Error(code) => (Some("e"), Some(escape(code.as_str()).into_owned())),
    };
    if let Some(kind) = kind {
        out.push_str(&format!(" t=\"{}\"", kind));
    }
    if formula.is_none() && value.is_none() {
        out.push_str("/>");
        return out;
    }
    out.push('>');
    if let Some(formula) = formula {
        let attributes = attributes_to_xml(&formula.attributes);
        if formula.text.is_empty() {
            out.push_str(&format!("<f{}/>", attributes));
        } else {
            out.push_str(&format!("<f{}>{}</f>", attributes, escape(formula.text.as_str())));
        }
    }
    match (kind, value) {
        (Some("inlineStr"), Some(text)) => {
            let space = if text.trim() != text { " xml:space=\"preserve\"" } else { "" };
            out.push_str(&format!("<is><t{}>{}</t></is>", space, escape(text.as_str())));
        }
        (_, Some(value)) => out.push_str(&format!("<v>{}</v>", value)),
        (_, None) => (),
    }
    out.push_str("</c>");
    out
}
