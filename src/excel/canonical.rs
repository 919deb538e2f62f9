//! Canonical mock serialization: truncation rules plus tab-joined output.

use serde::Deserialize;

use crate::error::{Error, Result};

use super::types::{Mock, SheetRows};

/// Line terminator used in generated text artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eol {
    #[default]
    Lf,
    Crlf,
}

impl Eol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Eol::Lf => "\n",
            Eol::Crlf => "\r\n",
        }
    }
}

impl std::str::FromStr for Eol {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "lf" => Ok(Eol::Lf),
            "crlf" => Ok(Eol::Crlf),
            other => Err(Error::config(format!(
                "eol must be \"lf\" or \"crlf\", got \"{other}\""
            ))),
        }
    }
}

/// Tab-join `rows` under a header of `columns`, lines joined by `eol`
/// without a trailing terminator. Shared by mocks and the manifest.
pub fn stringify_with_tabs<R: AsRef<[String]>>(
    columns: &[String],
    rows: &[R],
    eol: Eol,
    upper_case_columns: bool,
) -> String {
    let header = if upper_case_columns {
        columns
            .iter()
            .map(|c| c.to_uppercase())
            .collect::<Vec<_>>()
            .join("\t")
    } else {
        columns.join("\t")
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header);
    for row in rows {
        lines.push(row.as_ref().join("\t"));
    }
    lines.join(eol.as_str())
}

/// Apply column and row truncation to one sheet's rows and serialize the
/// result.
///
/// Columns: everything from the first blank header name onward is dropped
/// (a blank first header is an error), then columns starting with
/// `skip_prefix` are dropped. Rows: everything from the first blank row
/// onward is dropped; a blank first row keeps the header only.
pub fn canonicalize(rows: &SheetRows, eol: Eol, skip_prefix: &str) -> Result<Mock> {
    let mut column_limit = rows.columns.len();
    if let Some(first_blank) = rows.columns.iter().position(|c| c.is_empty()) {
        if first_blank == 0 {
            return Err(Error::source("first column is empty").with_loc("R1C1"));
        }
        column_limit = first_blank;
    }

    // Indices of surviving columns, used to project each row.
    let keep: Vec<usize> = (0..column_limit)
        .filter(|&i| !rows.columns[i].starts_with(skip_prefix))
        .collect();
    let columns: Vec<String> = keep.iter().map(|&i| rows.columns[i].clone()).collect();

    let first_empty_row = rows.rows.iter().position(|r| r.is_empty);
    let (data_rows, head_only) = match first_empty_row {
        Some(0) => (&rows.rows[..0], true),
        Some(n) => (&rows.rows[..n], false),
        None => (&rows.rows[..], false),
    };

    let projected: Vec<Vec<String>> = data_rows
        .iter()
        .map(|row| {
            keep.iter()
                .map(|&i| row.values.get(i).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    let data = if head_only {
        stringify_with_tabs::<Vec<String>>(&columns, &[], eol, false)
    } else {
        stringify_with_tabs(&columns, &projected, eol, false)
    };

    Ok(Mock {
        data,
        row_count: projected.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::types::Row;

    fn rows(columns: &[&str], data: &[(&[&str], bool)]) -> SheetRows {
        SheetRows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: data
                .iter()
                .map(|(values, is_empty)| Row {
                    values: values.iter().map(|v| v.to_string()).collect(),
                    is_empty: *is_empty,
                })
                .collect(),
        }
    }

    #[test]
    fn basic_serialization() {
        let input = rows(
            &["A", "B"],
            &[
                (&["Vasya", "15.00"], false),
                (&["Petya", "16.37"], false),
            ],
        );
        let mock = canonicalize(&input, Eol::Crlf, "-").unwrap();
        assert_eq!(mock.data, "A\tB\r\nVasya\t15.00\r\nPetya\t16.37");
        assert_eq!(mock.row_count, 2);
    }

    #[test]
    fn lf_eol() {
        let input = rows(&["A"], &[(&["x"], false)]);
        let mock = canonicalize(&input, Eol::Lf, "-").unwrap();
        assert_eq!(mock.data, "A\nx");
    }

    #[test]
    fn skip_prefix_columns_dropped() {
        let input = rows(
            &["A", "B", "_C", "-D"],
            &[(&["1", "2", "3", "4"], false)],
        );
        let mock = canonicalize(&input, Eol::Lf, "-").unwrap();
        assert_eq!(mock.data, "A\tB\t_C\n1\t2\t3");

        let mock = canonicalize(&input, Eol::Lf, "_").unwrap();
        assert_eq!(mock.data, "A\tB\t-D\n1\t2\t4");
    }

    #[test]
    fn columns_truncated_at_first_blank() {
        let input = rows(
            &["A", "B", "", "D"],
            &[(&["1", "2", "3", "4"], false)],
        );
        let mock = canonicalize(&input, Eol::Lf, "-").unwrap();
        assert_eq!(mock.data, "A\tB\n1\t2");
    }

    #[test]
    fn blank_first_column_is_fatal() {
        let input = rows(&["", "B"], &[]);
        let err = canonicalize(&input, Eol::Lf, "-").unwrap_err();
        assert!(err.to_string().contains("first column is empty"));
    }

    #[test]
    fn rows_truncated_at_first_blank_row() {
        let input = rows(
            &["A", "B"],
            &[
                (&["1", "2"], false),
                (&["", ""], true),
                (&["3", "4"], false),
            ],
        );
        let mock = canonicalize(&input, Eol::Lf, "-").unwrap();
        assert_eq!(mock.data, "A\tB\n1\t2");
        assert_eq!(mock.row_count, 1);
    }

    #[test]
    fn blank_first_row_keeps_header_only() {
        let input = rows(
            &["A", "B"],
            &[(&["", ""], true), (&["1", "2"], false)],
        );
        let mock = canonicalize(&input, Eol::Lf, "-").unwrap();
        assert_eq!(mock.data, "A\tB");
        assert_eq!(mock.row_count, 0);
    }

    #[test]
    fn upper_case_header() {
        let out = stringify_with_tabs(
            &["type".to_string(), "src_file".to_string()],
            &[vec!["X".to_string(), "f1".to_string()]],
            Eol::Lf,
            true,
        );
        assert_eq!(out, "TYPE\tSRC_FILE\nX\tf1");
    }
}
