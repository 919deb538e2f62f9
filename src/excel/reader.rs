//! Workbook decoding via calamine.
//!
//! This is the boundary to the raw spreadsheet decoder: bytes go in, a
//! [`Workbook`] of typed cells comes out. Everything downstream works on
//! that model and never touches calamine directly.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};

use crate::error::Result;

use super::types::{CellValue, Sheet, Workbook};

/// Decode workbook bytes into a [`Workbook`].
pub fn decode_workbook(bytes: &[u8]) -> Result<Workbook> {
    let cursor = Cursor::new(bytes);
    let mut source = open_workbook_auto_from_rs(cursor)?;

    let sheet_names = source.sheet_names().to_vec();
    let mut workbook = Workbook::new();

    for name in sheet_names {
        let range = source.worksheet_range(&name)?;
        workbook.add_sheet(Sheet {
            grid: range_to_grid(&range),
            name,
        });
    }

    Ok(workbook)
}

fn range_to_grid(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let (rows, cols) = range.get_size();
    let mut grid = Vec::with_capacity(rows);

    for r in 0..rows {
        let mut row = Vec::with_capacity(cols);
        for c in 0..cols {
            row.push(convert_cell(range.get((r, c))));
        }
        grid.push(row);
    }

    grid
}

fn convert_cell(cell: Option<&Data>) -> CellValue {
    match cell {
        None => CellValue::Empty,
        Some(data) => match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::String(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
            Data::DateTimeIso(s) => CellValue::String(s.clone()),
            Data::DurationIso(s) => CellValue::String(s.clone()),
            Data::Error(e) => CellValue::Error(format!("{e:?}")),
        },
    }
}

/// Excel serial dates count days since 1899-12-30; the time-of-day fraction
/// is irrelevant for mock output and gets dropped.
fn excel_serial_to_date(value: f64) -> CellValue {
    let days = value.floor() as i64;
    let epoch = match chrono::NaiveDate::from_ymd_opt(1899, 12, 30) {
        Some(d) => d,
        None => return CellValue::Empty,
    };
    match epoch.checked_add_signed(chrono::Duration::days(days)) {
        Some(date) => CellValue::Date(date),
        None => CellValue::Empty,
    }
}
