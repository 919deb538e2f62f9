use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error kinds grouped by the stage that produced them.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Source(String),
    #[error("failed to decode workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("bundle error: {0}")]
    Bundle(String),
    #[error("invalid bundle: {0}")]
    BundleFormat(String),
    #[error("usage error: {0}")]
    Usage(String),
}

/// Crate-wide error carrying optional source context for reporting.
///
/// The context tags mirror what gets printed to the user after the message:
/// the source file, the sheet inside it, and a cell location where known.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub file: Option<String>,
    pub sheet: Option<String>,
    pub loc: Option<String>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        ErrorKind::Config(message.into()).into()
    }

    pub fn source(message: impl Into<String>) -> Self {
        ErrorKind::Source(message.into()).into()
    }

    pub fn bundle(message: impl Into<String>) -> Self {
        ErrorKind::Bundle(message.into()).into()
    }

    pub fn bundle_format(message: impl Into<String>) -> Self {
        ErrorKind::BundleFormat(message.into()).into()
    }

    pub fn usage(message: impl Into<String>) -> Self {
        ErrorKind::Usage(message.into()).into()
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        if self.file.is_none() {
            self.file = Some(file.into());
        }
        self
    }

    pub fn with_path(self, path: &PathBuf) -> Self {
        self.with_file(path.display().to_string())
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        if self.sheet.is_none() {
            self.sheet = Some(sheet.into());
        }
        self
    }

    pub fn with_loc(mut self, loc: impl Into<String>) -> Self {
        if self.loc.is_none() {
            self.loc = Some(loc.into());
        }
        self
    }

    /// Context lines shown under the main message, one per known tag.
    pub fn context_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(f) = &self.file {
            lines.push(format!("  @file: {f}"));
        }
        if let Some(s) = &self.sheet {
            lines.push(format!("  @sheet: {s}"));
        }
        if let Some(l) = &self.loc {
            lines.push(format!("  @loc: {l}"));
        }
        lines
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl<K: Into<ErrorKind>> From<K> for Error {
    fn from(kind: K) -> Self {
        Error {
            kind: kind.into(),
            file: None,
            sheet: None,
            loc: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tags_attach_once() {
        let err = Error::source("sheet [x] not found")
            .with_sheet("x")
            .with_sheet("y")
            .with_file("book.xlsx");
        assert_eq!(err.sheet.as_deref(), Some("x"));
        assert_eq!(
            err.context_lines(),
            vec!["  @file: book.xlsx".to_string(), "  @sheet: x".to_string()]
        );
    }

    #[test]
    fn display_uses_kind_message() {
        let err = Error::config("sourceDir is required");
        assert_eq!(err.to_string(), "configuration error: sourceDir is required");
    }
}
