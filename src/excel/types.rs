use std::collections::HashMap;

use chrono::NaiveDate;

/// A cell value with type information, as decoded from the workbook.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    String(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    Error(String),
}

impl CellValue {
    /// Truthiness used by the `_contents` include flag: blanks, zero and
    /// `false` deselect a sheet, anything else selects it.
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::String(s) => !s.is_empty(),
            CellValue::Number(n) => *n != 0.0,
            CellValue::Bool(b) => *b,
            CellValue::Date(_) => true,
            CellValue::Error(_) => false,
        }
    }

    /// Text rendering used in mock artifacts. Dates come out as
    /// `DD.MM.YYYY`, whole numbers without a fraction part.
    pub fn format(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::String(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.format("%d.%m.%Y").to_string(),
            CellValue::Error(e) => e.clone(),
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One sheet as a dense row-major grid of typed cells.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub grid: Vec<Vec<CellValue>>,
}

/// A decoded workbook: ordered sheet names plus a lookup by name.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheet_names: Vec<String>,
    sheets: HashMap<String, Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook::default()
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheet_names.push(sheet.name.clone());
        self.sheets.insert(sheet.name.clone(), sheet);
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }
}

/// One extracted data row: values parallel to the sheet's column list,
/// already formatted as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<String>,
    /// True when every visible cell of the row was blank.
    pub is_empty: bool,
}

/// Structured rows of one selected sheet, plus the header-row column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRows {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Canonical serialization of one sheet, ready to be written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Mock {
    pub data: String,
    pub row_count: usize,
}
