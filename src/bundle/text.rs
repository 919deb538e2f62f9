//! Plain-text bundle container.
//!
//! Layout: a format header, then one block per file (a `!!FILE` tag line
//! followed by the file's lines), and a final `!!FILE-COUNT` line. Blocks
//! are separated by a single blank line; trailing blank lines of each file
//! are dropped so the line count in the tag is exact.

use std::path::Path;

use crate::error::{Error, Result};

pub const FORMAT_HEADER: &str = "!!MOCKUP-LOADER-FORMAT";
pub const FORMAT_VERSION: &str = "1.0";

pub struct TextBundler {
    out: String,
    file_count: usize,
}

impl TextBundler {
    pub fn new() -> Self {
        TextBundler {
            out: String::new(),
            file_count: 0,
        }
    }

    pub fn append(&mut self, name: &str, content: &str) {
        if self.file_count == 0 {
            self.out.push_str(FORMAT_HEADER);
            self.out.push(' ');
            self.out.push_str(FORMAT_VERSION);
            self.out.push('\n');
        }

        let mut lines: Vec<&str> = content.split('\n').collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        let line_count = lines.len();

        self.out
            .push_str(&format!("\n!!FILE {name} text {line_count}\n"));
        lines.push("");
        self.out.push_str(&lines.join("\n"));
        self.file_count += 1;
    }

    pub fn finish(mut self) -> String {
        self.out
            .push_str(&format!("\n!!FILE-COUNT {}", self.file_count));
        self.out
    }
}

impl Default for TextBundler {
    fn default() -> Self {
        Self::new()
    }
}

/// Read each named file from `source_dir` and pack them into one text
/// container. Names are expected normalized (forward slashes) and sorted
/// by the caller.
pub fn build_text_bundle(source_dir: &Path, names: &[String]) -> Result<String> {
    let mut bundler = TextBundler::new();
    for name in names {
        let content = std::fs::read_to_string(source_dir.join(name))
            .map_err(|e| Error::from(e).with_file(name.clone()))?;
        // Windows line ends would corrupt the per-block line counts.
        bundler.append(name, &content.replace("\r\n", "\n"));
    }
    Ok(bundler.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_layout() {
        let mut b = TextBundler::new();
        b.append("doc/head.txt", "A\tB\n1\t2");
        assert_eq!(
            b.finish(),
            "!!MOCKUP-LOADER-FORMAT 1.0\n\
             \n!!FILE doc/head.txt text 2\n\
             A\tB\n1\t2\n\
             \n!!FILE-COUNT 1"
        );
    }

    #[test]
    fn trailing_blank_lines_are_trimmed() {
        let mut b = TextBundler::new();
        b.append("a.txt", "x\n\n  \n");
        let out = b.finish();
        assert!(out.contains("!!FILE a.txt text 1\n"));
        assert!(out.contains("\nx\n\n!!FILE-COUNT 1"));
    }

    #[test]
    fn two_files_count() {
        let mut b = TextBundler::new();
        b.append("a.txt", "1");
        b.append("b.txt", "2\n3");
        let out = b.finish();
        assert!(out.starts_with("!!MOCKUP-LOADER-FORMAT 1.0\n"));
        assert!(out.contains("!!FILE a.txt text 1\n"));
        assert!(out.contains("!!FILE b.txt text 2\n"));
        assert!(out.ends_with("\n!!FILE-COUNT 2"));
    }
}
