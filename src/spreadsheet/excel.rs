//! Office Open XML package helpers
use crate::error::RollforwardError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::ErrorKind;
use std::path::Path;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

pub(crate) type PackageReader = BufReader<File>;

/// Opens a package and loads its worksheet list
///
/// # Arguments
/// * `file_name` - Path to the workbook file
/// * `load_workbook` - Function listing `(sheet name, part path)` pairs
///
/// # Returns
/// Tuple of the zip archive handle and the worksheet list
pub(super) fn open<W>(
    file_name: &str,
    load_workbook: W,
) -> Result<(ZipArchive<PackageReader>, Vec<(String, String)>), RollforwardError>
where
    W: Fn(&mut ZipArchive<PackageReader>) -> Result<Vec<(String, String)>, RollforwardError>,
{
    let file = File::open(Path::new(file_name)).map_err(|error| match error.kind() {
        ErrorKind::PermissionDenied => SpreadsheetError::AccessDenied(file_name.to_owned()).into(),
        ErrorKind::NotFound => SpreadsheetError::FileError(file_name.to_owned()).into(),
        _ => RollforwardError::IoError(error),
    })?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;
    let sheets = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
    }
    Ok((zip, sheets))
}

/// Loads worksheet relationships, mapping relationship ids to part paths
pub(super) fn load_relationships(
    zip: &mut ZipArchive<PackageReader>,
    path: &str,
) -> Result<HashMap<String, String>, RollforwardError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::FileError(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path inside the archive
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path(Cow::from("worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::from("/xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::from("xl/worksheets/sheet2.xml")), "xl/worksheets/sheet2.xml");
    }
}
