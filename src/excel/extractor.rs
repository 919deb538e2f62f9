//! Sheet selection and grid-to-rows extraction.

use crate::error::{Error, Result};

use super::types::{CellValue, Row, Sheet, SheetRows, Workbook};

const CONTENT_SHEET_NAME: &str = "_contents";
const EXCLUDE_SHEET_NAME: &str = "_exclude";

/// Options controlling how a sheet grid is turned into rows.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Lower-case the header names.
    pub lower_case_columns: bool,
    /// Keep fully blank rows (tagged) instead of dropping them.
    pub keep_empty_rows: bool,
    /// Skip the header row when its first cell starts with this marker.
    pub first_row_comment_char: Option<char>,
    /// Drop all columns from the first blank header cell onward.
    pub trim_on_empty_header: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            lower_case_columns: false,
            keep_empty_rows: false,
            first_row_comment_char: Some('#'),
            trim_on_empty_header: false,
        }
    }
}

impl ExtractOptions {
    /// The options used for mock extraction: empty rows are kept so the
    /// canonicalizer can apply its own truncation policy.
    pub fn for_mocks() -> Self {
        ExtractOptions {
            lower_case_columns: false,
            keep_empty_rows: true,
            first_row_comment_char: Some('#'),
            trim_on_empty_header: true,
        }
    }
}

/// Decide which sheets of a workbook become mocks.
///
/// Precedence: a `_contents` sheet (name column + include flag column)
/// defines an allow-list, otherwise all sheets are candidates; a `_exclude`
/// sheet (name column) is then subtracted, along with `_exclude` itself;
/// sheets whose name starts with `-` are always dropped.
pub fn select_sheets(wb: &Workbook) -> Result<Vec<String>> {
    if wb.sheet_names.is_empty() {
        return Err(Error::source("workbook does not contain sheets"));
    }

    let mut selected: Vec<String> = if let Some(contents) = wb.sheet(CONTENT_SHEET_NAME) {
        contents_allow_list(contents)?
    } else {
        wb.sheet_names.clone()
    };

    if let Some(excludes) = wb.sheet(EXCLUDE_SHEET_NAME) {
        let mut excluded = exclude_list(excludes)?;
        excluded.push(EXCLUDE_SHEET_NAME.to_string());
        selected.retain(|s| !excluded.contains(s));
    }

    selected.retain(|s| !s.starts_with('-'));
    Ok(selected)
}

fn contents_allow_list(sheet: &Sheet) -> Result<Vec<String>> {
    let header_width = sheet.grid.first().map(|h| h.len()).unwrap_or(0);
    if header_width < 2 {
        return Err(Error::source("contents must have at least 2 columns")
            .with_sheet(CONTENT_SHEET_NAME));
    }

    let entries = data_rows(sheet);
    if entries.is_empty() {
        return Err(
            Error::source("contents does not contain entries").with_sheet(CONTENT_SHEET_NAME)
        );
    }

    Ok(entries
        .into_iter()
        .filter(|row| row.get(1).map(CellValue::is_truthy).unwrap_or(false))
        .map(|row| row[0].format())
        .collect())
}

fn exclude_list(sheet: &Sheet) -> Result<Vec<String>> {
    let header_width = sheet.grid.first().map(|h| h.len()).unwrap_or(0);
    if header_width < 1 {
        return Err(Error::source("excludes must have at least 1 column")
            .with_sheet(EXCLUDE_SHEET_NAME));
    }

    let entries = data_rows(sheet);
    if entries.is_empty() {
        return Err(
            Error::source("excludes does not contain entries").with_sheet(EXCLUDE_SHEET_NAME)
        );
    }

    Ok(entries.into_iter().map(|row| row[0].format()).collect())
}

/// Data rows of a control sheet: everything below the header that has at
/// least one non-blank cell.
fn data_rows(sheet: &Sheet) -> Vec<&Vec<CellValue>> {
    sheet
        .grid
        .iter()
        .skip(1)
        .filter(|row| row.iter().any(|c| !matches!(c, CellValue::Empty)))
        .collect()
}

/// Turn one sheet grid into structured rows per [`ExtractOptions`].
pub fn sheet_to_rows(sheet: &Sheet, opts: &ExtractOptions) -> SheetRows {
    let mut start = 0;
    if let Some(marker) = opts.first_row_comment_char {
        if first_cell_starts_with(sheet, marker) {
            start = 1;
        }
    }

    let Some(header) = sheet.grid.get(start) else {
        return SheetRows::default();
    };

    let mut columns: Vec<String> = header
        .iter()
        .map(|c| {
            let name = c.format();
            if opts.lower_case_columns {
                name.to_lowercase()
            } else {
                name
            }
        })
        .collect();

    if opts.trim_on_empty_header {
        if let Some(first_blank) = columns.iter().position(|c| c.is_empty()) {
            if first_blank > 0 {
                columns.truncate(first_blank);
            }
        }
    }

    let mut rows = Vec::new();
    for grid_row in sheet.grid.iter().skip(start + 1) {
        let mut values = Vec::with_capacity(columns.len());
        let mut is_empty = true;

        for c in 0..columns.len() {
            match grid_row.get(c) {
                // Missing and blank cells contribute the default and do not
                // make the row non-empty; error cells behave the same way.
                None | Some(CellValue::Empty) | Some(CellValue::Error(_)) => {
                    values.push(String::new());
                }
                Some(cell) => {
                    values.push(cell.format());
                    is_empty = false;
                }
            }
        }

        if !is_empty || opts.keep_empty_rows {
            rows.push(Row { values, is_empty });
        }
    }

    SheetRows { columns, rows }
}

fn first_cell_starts_with(sheet: &Sheet, marker: char) -> bool {
    matches!(
        sheet.grid.first().and_then(|row| row.first()),
        Some(CellValue::String(s)) if s.starts_with(marker)
    )
}

/// Extract every selected sheet of a workbook into structured rows, keyed by
/// the lower-cased sheet name, in selection order.
pub fn extract_workbook(wb: &Workbook) -> Result<Vec<(String, SheetRows)>> {
    let selected = select_sheets(wb)?;
    let opts = ExtractOptions::for_mocks();

    let mut result = Vec::with_capacity(selected.len());
    for name in selected {
        let sheet = wb
            .sheet(&name)
            .ok_or_else(|| Error::source(format!("sheet [{name}] not found")).with_sheet(&name))?;
        result.push((name.to_lowercase(), sheet_to_rows(sheet, &opts)));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn plain_sheet(name: &str, grid: Vec<Vec<CellValue>>) -> Sheet {
        Sheet {
            name: name.to_string(),
            grid,
        }
    }

    fn workbook(sheets: Vec<Sheet>) -> Workbook {
        let mut wb = Workbook::new();
        for sheet in sheets {
            wb.add_sheet(sheet);
        }
        wb
    }

    fn contents_sheet(rows: Vec<(&str, CellValue)>) -> Sheet {
        let mut grid = vec![vec![s("sheet"), s("save")]];
        for (name, flag) in rows {
            grid.push(vec![s(name), flag]);
        }
        plain_sheet("_contents", grid)
    }

    fn exclude_sheet(names: Vec<&str>) -> Sheet {
        let mut grid = vec![vec![s("sheet")]];
        for name in names {
            grid.push(vec![s(name)]);
        }
        plain_sheet("_exclude", grid)
    }

    #[test]
    fn all_sheets_without_control_sheets() {
        let wb = workbook(vec![
            plain_sheet("Sheet1", vec![]),
            plain_sheet("Sheet2", vec![]),
        ]);
        assert_eq!(select_sheets(&wb).unwrap(), vec!["Sheet1", "Sheet2"]);
    }

    #[test]
    fn contents_defines_allow_list() {
        let wb = workbook(vec![
            plain_sheet("Sheet1", vec![]),
            plain_sheet("Sheet2", vec![]),
            contents_sheet(vec![
                ("Sheet1", CellValue::Bool(true)),
                ("Sheet2", CellValue::Empty),
            ]),
        ]);
        assert_eq!(select_sheets(&wb).unwrap(), vec!["Sheet1"]);
    }

    #[test]
    fn exclude_applies_after_contents() {
        let wb = workbook(vec![
            plain_sheet("Sheet1", vec![]),
            plain_sheet("Sheet2", vec![]),
            contents_sheet(vec![
                ("Sheet1", CellValue::Bool(true)),
                ("Sheet2", CellValue::Bool(false)),
            ]),
            exclude_sheet(vec!["Sheet1"]),
        ]);
        assert!(select_sheets(&wb).unwrap().is_empty());
    }

    #[test]
    fn exclude_removes_itself_and_listed_sheets() {
        let wb = workbook(vec![
            plain_sheet("Sheet1", vec![]),
            plain_sheet("Sheet2", vec![]),
            exclude_sheet(vec!["Sheet2"]),
        ]);
        assert_eq!(select_sheets(&wb).unwrap(), vec!["Sheet1"]);
    }

    #[test]
    fn dash_prefix_always_dropped() {
        let wb = workbook(vec![
            plain_sheet("-Hidden", vec![]),
            plain_sheet("Sheet1", vec![]),
            contents_sheet(vec![
                ("-Hidden", CellValue::Bool(true)),
                ("Sheet1", CellValue::Bool(true)),
            ]),
        ]);
        assert_eq!(select_sheets(&wb).unwrap(), vec!["Sheet1"]);
    }

    #[test]
    fn contents_with_no_entries_fails() {
        let wb = workbook(vec![
            plain_sheet("Sheet1", vec![]),
            plain_sheet("_contents", vec![vec![s("sheet"), s("save")]]),
        ]);
        let err = select_sheets(&wb).unwrap_err();
        assert!(err.to_string().contains("does not contain entries"));
    }

    #[test]
    fn contents_with_one_column_fails() {
        let wb = workbook(vec![
            plain_sheet("Sheet1", vec![]),
            plain_sheet("_contents", vec![vec![s("sheet")], vec![s("Sheet1")]]),
        ]);
        let err = select_sheets(&wb).unwrap_err();
        assert!(err.to_string().contains("at least 2 columns"));
    }

    #[test]
    fn missing_referenced_sheet_is_fatal() {
        let wb = workbook(vec![
            plain_sheet("Sheet1", vec![]),
            contents_sheet(vec![("Ghost", CellValue::Bool(true))]),
        ]);
        let err = extract_workbook(&wb).unwrap_err();
        assert!(err.to_string().contains("[Ghost] not found"));
    }

    #[test]
    fn basic_rows() {
        let sheet = plain_sheet(
            "S",
            vec![
                vec![s("A"), s("B")],
                vec![s("Vasya"), CellValue::Number(15.0)],
                vec![s("Petya"), CellValue::Number(16.37)],
            ],
        );
        let rows = sheet_to_rows(&sheet, &ExtractOptions::default());
        assert_eq!(rows.columns, vec!["A", "B"]);
        assert_eq!(rows.rows[0].values, vec!["Vasya", "15"]);
        assert_eq!(rows.rows[1].values, vec!["Petya", "16.37"]);
    }

    #[test]
    fn commented_first_row_is_skipped() {
        let sheet = plain_sheet(
            "S",
            vec![
                vec![s("#A"), s("B")],
                vec![s("C"), s("D")],
                vec![s("Y"), s("X")],
            ],
        );
        let rows = sheet_to_rows(&sheet, &ExtractOptions::default());
        assert_eq!(rows.columns, vec!["C", "D"]);
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0].values, vec!["Y", "X"]);
    }

    #[test]
    fn trim_on_empty_header_drops_tail_columns() {
        let sheet = plain_sheet(
            "S",
            vec![
                vec![s("A"), s("B"), CellValue::Empty],
                vec![s("C"), s("D"), s("E")],
            ],
        );
        let opts = ExtractOptions {
            trim_on_empty_header: true,
            ..ExtractOptions::default()
        };
        let rows = sheet_to_rows(&sheet, &opts);
        assert_eq!(rows.columns, vec!["A", "B"]);
        assert_eq!(rows.rows[0].values, vec!["C", "D"]);
    }

    #[test]
    fn empty_rows_kept_only_on_request() {
        let grid = vec![
            vec![s("A"), s("B")],
            vec![CellValue::Empty, CellValue::Empty],
            vec![s("C"), s("D")],
        ];
        let sheet = plain_sheet("S", grid);

        let dropped = sheet_to_rows(&sheet, &ExtractOptions::default());
        assert_eq!(dropped.rows.len(), 1);

        let opts = ExtractOptions {
            keep_empty_rows: true,
            ..ExtractOptions::default()
        };
        let kept = sheet_to_rows(&sheet, &opts);
        assert_eq!(kept.rows.len(), 2);
        assert!(kept.rows[0].is_empty);
        assert!(!kept.rows[1].is_empty);
    }

    #[test]
    fn lower_case_columns() {
        let sheet = plain_sheet("S", vec![vec![s("Name"), s("AGE")]]);
        let opts = ExtractOptions {
            lower_case_columns: true,
            ..ExtractOptions::default()
        };
        let rows = sheet_to_rows(&sheet, &opts);
        assert_eq!(rows.columns, vec!["name", "age"]);
    }

    #[test]
    fn extract_lowercases_sheet_keys() {
        let wb = workbook(vec![plain_sheet(
            "Sheet1",
            vec![vec![s("A")], vec![s("x")]],
        )]);
        let mocks = extract_workbook(&wb).unwrap();
        assert_eq!(mocks.len(), 1);
        assert_eq!(mocks[0].0, "sheet1");
    }
}
