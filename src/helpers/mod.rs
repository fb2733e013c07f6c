//! Low-level package and XML helpers shared by the spreadsheet readers.
pub(crate) mod xml;
pub(crate) mod zip;
