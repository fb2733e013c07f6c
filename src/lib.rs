//! # Rusty Rollforward
//!
//! Carries prior-period spreadsheet backdata forward with current-period
//! values. The prior workbook's supporting-detail sheets are located, the
//! tables on them are detected, their headers are matched against tables in
//! the current workbooks, and matched columns are copied across. Every
//! destination cell is tracked so that values left untouched end up in a
//! manual-adjustment report.
//!
//! ## Features
//!
//! - **Table detection**: declared auto-filter ranges and a header/data
//!   density heuristic, ranked by confidence
//! - **Merged headers**: merge metadata when the workbook provides it,
//!   neighbour inference otherwise
//! - **Header matching**: exact or similarity based
//! - **Worksheet matching**: name scoring across several current workbooks
//! - **Status tracking**: pending, completed and failed cells with a
//!   grouped manual-adjustment report
//! - **File guard**: timestamped backups and write checks before mutation
//!
//! Writing values, colouring cells, replacing worksheets and presenting the
//! report belong to the caller, through the traits in [`rollforward`].
pub mod config;
pub mod error;
pub(crate) mod helpers;
pub mod matching;
pub mod rollforward;
pub mod spreadsheet;
pub mod table;

pub use crate::config::Options;
pub use crate::error::ErrorKind;
pub use crate::error::RollforwardError;
pub use crate::matching::header::HeaderMatch;
pub use crate::rollforward::pipeline::Collaborators;
pub use crate::rollforward::pipeline::Rollforward;
pub use crate::rollforward::report::RollforwardReport;
pub use crate::spreadsheet::Worksheet;
pub use crate::table::TableCandidate;
