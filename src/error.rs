use serde::Serialize;
use thiserror::Error;

/// Main error type for the rollforward crate.
/// Aggregates errors from various sources including standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum RollforwardError {
    #[error("{0}")]
    WithContextError(String),

    #[error("{0}")]
    AnyhowError(#[from] anyhow::Error),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    // Third-party library errors
    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

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

    // Domain module errors
    #[error("{0}")]
    AddressError(#[from] crate::spreadsheet::reference::AddressError),

    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    ExtractionError(#[from] crate::table::header::ExtractionError),

    #[error("{0}")]
    FileOperationError(#[from] crate::rollforward::backup::FileOperationError),

    #[error("{0}")]
    CopyError(#[from] crate::rollforward::copy::CopyError),

    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

/// Coarse classification of failures, used to decide how far a failure propagates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Malformed cell or range reference; local to one range
    InvalidAddress,
    /// Target file cannot be written; fatal to that file's operation
    AccessDenied,
    /// Expected sheet, header row or table absent; skip the unit
    StructureNotFound,
    /// Merge inference unavailable; a simpler extraction is used instead
    ExtractionDegraded,
    /// Anything else
    UnexpectedIo,
}

impl RollforwardError {
    pub fn kind(&self) -> ErrorKind {
        use crate::rollforward::backup::FileOperationError;
        use crate::rollforward::copy::CopyError;
        use crate::spreadsheet::SpreadsheetError;

        match self {
            RollforwardError::AddressError(_) => ErrorKind::InvalidAddress,
            RollforwardError::ExtractionError(_) => ErrorKind::ExtractionDegraded,
            RollforwardError::SpreadsheetError(error) => match error {
                SpreadsheetError::AccessDenied(_) => ErrorKind::AccessDenied,
                SpreadsheetError::SheetNotFound(_) | SpreadsheetError::SpreadsheetEmptyError(_) => {
                    ErrorKind::StructureNotFound
                }
                _ => ErrorKind::UnexpectedIo,
            },
            RollforwardError::FileOperationError(FileOperationError::AccessDenied(_)) => ErrorKind::AccessDenied,
            RollforwardError::CopyError(CopyError::SourceSheetNotFound { .. }) => ErrorKind::StructureNotFound,
            RollforwardError::IoError(error) if error.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorKind::AccessDenied
            }
            _ => ErrorKind::UnexpectedIo,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, RollforwardError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| RollforwardError::WithContextError(format!("{}: {}", message, e)))
    }
}
