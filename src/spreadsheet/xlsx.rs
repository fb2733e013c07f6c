use crate::error::RollforwardError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::PackageReader;
use crate::spreadsheet::reference::cell_reference;
use crate::spreadsheet::reference::parse_cell_reference;
use crate::spreadsheet::reference::parse_range;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::io::BufReader;
use tracing::debug;
use tracing::warn;
use zip::read::ZipFile;
use zip::ZipArchive;

// XML tag names for parsing SpreadsheetML
const TAG_SHARED_STRING_ITEM: QName = QName(b"si"); // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");     // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                // Text content within strings
const TAG_SHEET: QName = QName(b"sheet");           // Worksheet definition
const TAG_ROW: QName = QName(b"row");               // Row in worksheet
const TAG_CELL: QName = QName(b"c");                // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");      // Inline string value
const TAG_VALUE: QName = QName(b"v");               // Cell value content
const TAG_AUTO_FILTER: QName = QName(b"autoFilter"); // Declared filter range
const TAG_MERGE_CELL: QName = QName(b"mergeCell");  // Merged region

/// Represents an Excel XLSX/XLSM workbook file
pub struct XlsxSpreadsheet {
    /// File name of the spreadsheet
    pub name: String,
    /// ZIP archive containing the XLSX file contents
    zip: ZipArchive<PackageReader>,
    /// List of worksheets with (name, zip_path) pairs
    sheets: Vec<(String, String)>,
    /// Shared string table, loaded on first read
    shared_strings: Option<Vec<String>>,
}

impl XlsxSpreadsheet {
    /// Opens an XLSX workbook and parses its worksheet list
    ///
    /// # Arguments
    /// * `file_name` - Path to the XLSX file
    ///
    /// # Returns
    /// Result containing the initialized XlsxSpreadsheet or an error
    pub fn open(file_name: &str) -> Result<XlsxSpreadsheet, RollforwardError> {
        let (zip, sheets) = excel::open(file_name, load_workbook)?;
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            sheets,
            shared_strings: None,
        })
    }

    fn load_shared_strings(&mut self) -> Result<Vec<String>, RollforwardError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
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
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Reads worksheets according to the specified criteria
    ///
    /// Parses worksheet XML parts and extracts cell values with shared strings
    /// resolved, together with the declared auto-filter range and merged regions.
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, RollforwardError> {
        if self.shared_strings.is_none() {
            self.shared_strings = Some(self.load_shared_strings()?);
        }
        let shared_strings = self.shared_strings.as_deref().unwrap_or_default();

        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, zip_path) in &self.sheets {
            if criteria.sheet_limit.map(|limit| sheets.len() >= limit).unwrap_or(false) {
                break;
            } else if !criteria.accept(sheet_name) {
                continue;
            }

            let mut sheet = Sheet::new(&self.name, sheet_name);
            let mut merged_regions = Vec::new();
            let mut row_count = 0usize;
            let mut row = 0usize;
            let mut col = 0usize;
            let mut kind = CellType::default();
            let mut shared = false;
            let mut value = String::new();
            let mut reader = self
                .zip
                .xml_reader(zip_path)?
                .ok_or_else(|| SpreadsheetError::SheetNotFound(sheet_name.to_owned()))?;
            match_xml_events!(reader => {
                Event::Start(event) if event.name() == TAG_ROW => {
                    row_count = match event.get_attribute_value("r")? {
                        Some(number) => number.parse::<usize>()?,
                        None => row_count + 1,
                    };
                    col = 0;
                }
                Event::Start(event) if event.name() == TAG_CELL => {
                    (row, col) = event
                        .get_attribute_value("r")?
                        .and_then(|reference| parse_cell_reference(&reference).ok())
                        .unwrap_or((row_count, col + 1));
                    value.clear();
                    let data_type = event.get_attribute_value("t")?;
                    shared = data_type.as_deref() == Some("s");
                    kind = if criteria.after_rows_limit(row) {
                        CellType::Empty
                    } else {
                        match data_type.as_deref() {
                            Some("inlineStr") | Some("str") | Some("s") => CellType::Text,
                            Some("d") => CellType::IsoDateTime,
                            Some("b") => CellType::Boolean,
                            Some("e") => CellType::Error,
                            _ => CellType::Number,
                        }
                    };
                }
                Event::Start(event) if kind != CellType::Empty && event.name() == TAG_INLINE_STRING => {
                    value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                }
                Event::Start(event) if kind != CellType::Empty && event.name() == TAG_VALUE => {
                    value = read_string_value(&mut reader, TAG_VALUE, true)?;
                }
                Event::End(event) if kind != CellType::Empty && event.name() == TAG_CELL => {
                    if shared && !value.is_empty() {
                        let index = value.trim().parse::<usize>()?;
                        value = shared_strings.get(index).cloned().ok_or_else(|| SpreadsheetError::CellAccess {
                            sheet: sheet_name.to_owned(),
                            reference: cell_reference(row, col),
                            message: format!("shared string {index} out of range"),
                        })?;
                    }
                    if !value.is_empty() {
                        sheet.push(Cell {
                            row,
                            col,
                            kind,
                            value: std::mem::take(&mut value),
                        });
                    }
                    kind = CellType::Empty;
                }
                Event::Start(event) if event.name() == TAG_AUTO_FILTER => {
                    sheet.auto_filter = event.get_attribute_value("ref")?.map(|reference| reference.to_string());
                }
                Event::Start(event) if event.name() == TAG_MERGE_CELL => {
                    let reference = event.require_attribute_value("ref")?;
                    match parse_range(&reference) {
                        Ok(region) => merged_regions.push(region),
                        Err(error) => warn!(sheet = sheet_name.as_str(), %error, "skip merged region"),
                    }
                }
            });
            sheet.merged_regions = Some(merged_regions);
            debug!(
                file = self.name.as_str(),
                sheet = sheet_name.as_str(),
                cells = sheet.cells.len(),
                "worksheet loaded"
            );
            sheets.push(sheet);
        }

        Ok(sheets)
    }
}

/// Loads worksheet names and part paths from `xl/workbook.xml`
fn load_workbook(zip: &mut ZipArchive<PackageReader>) -> Result<Vec<(String, String)>, RollforwardError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
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
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// Skips phonetic annotations. With `is_text_content` the element's own text
/// counts (as in `<v>`), otherwise only `<t>` children are collected.
fn read_string_value(
    reader: &mut XmlReader<BufReader<ZipFile<'_, PackageReader>>>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, RollforwardError> {
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
