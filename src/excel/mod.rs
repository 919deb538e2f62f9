//! Workbook decoding, sheet selection, extraction and canonicalization.
//!
//! The flow is: bytes -> [`types::Workbook`] (via [`reader`]) -> selected
//! sheets as structured rows (via [`extractor`]) -> canonical TSV mocks
//! (via [`canonical`]).

pub mod canonical;
pub mod extractor;
pub mod reader;
pub mod types;

pub use canonical::{canonicalize, stringify_with_tabs, Eol};
pub use extractor::{extract_workbook, select_sheets, sheet_to_rows, ExtractOptions};
pub use reader::decode_workbook;
pub use types::{CellValue, Mock, Row, Sheet, SheetRows, Workbook};
