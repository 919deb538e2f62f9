//! Structural validation of text bundles.
//!
//! Checks the format header, every `!!FILE` tag, the per-block line
//! counts and the `!!FILE-COUNT` total. Diagnostics carry 1-based line
//! numbers.

use crate::error::{Error, Result};

use super::text::{FORMAT_HEADER, FORMAT_VERSION};

/// One parsed file block, returned so callers can round-trip contents.
#[derive(Debug, PartialEq)]
pub struct BundleFile {
    pub name: String,
    pub file_type: String,
    pub lines: Vec<String>,
}

/// Parse and validate a text bundle, returning its file blocks.
pub fn validate_text_bundle(text: &str) -> Result<Vec<BundleFile>> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.is_empty() || lines[0].trim().is_empty() {
        return Err(Error::bundle_format("missing format header at line 1"));
    }

    let header: Vec<&str> = lines[0].split_whitespace().collect();
    if header.len() != 2 || header[0] != FORMAT_HEADER {
        return Err(Error::bundle_format(format!(
            "line 1: expected \"{FORMAT_HEADER} <version>\", got \"{}\"",
            lines[0]
        )));
    }
    if header[1] != FORMAT_VERSION {
        return Err(Error::bundle_format(format!(
            "line 1: unsupported format version \"{}\"",
            header[1]
        )));
    }

    let mut files = Vec::new();
    let mut declared_count: Option<usize> = None;
    let mut i = 1;

    while i < lines.len() {
        let line = lines[i];
        let line_no = i + 1;
        i += 1;

        if line.trim().is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("!!FILE-COUNT") {
            if declared_count.is_some() {
                return Err(Error::bundle_format(format!(
                    "line {line_no}: duplicate !!FILE-COUNT"
                )));
            }
            let count = rest.trim().parse::<usize>().map_err(|_| {
                Error::bundle_format(format!(
                    "line {line_no}: invalid file count \"{}\"",
                    rest.trim()
                ))
            })?;
            declared_count = Some(count);
            continue;
        }

        if line.starts_with("!!FILE") {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 4 {
                return Err(Error::bundle_format(format!(
                    "line {line_no}: malformed !!FILE tag \"{line}\""
                )));
            }
            let (name, file_type, count_str) = (tokens[1], tokens[2], tokens[3]);
            if file_type != "text" {
                return Err(Error::bundle_format(format!(
                    "line {line_no}: unsupported file type \"{file_type}\""
                )));
            }
            let line_count = count_str.parse::<usize>().map_err(|_| {
                Error::bundle_format(format!(
                    "line {line_no}: invalid line count \"{count_str}\""
                ))
            })?;
            // The declared count is untrusted input; the addition itself
            // can overflow.
            let end = i.checked_add(line_count).filter(|&end| end <= lines.len());
            let Some(end) = end else {
                return Err(Error::bundle_format(format!(
                    "line {line_no}: file \"{name}\" declares {line_count} lines but the bundle ends early"
                )));
            };
            let body: Vec<String> = lines[i..end]
                .iter()
                .map(|l| l.to_string())
                .collect();
            i = end;
            files.push(BundleFile {
                name: name.to_string(),
                file_type: file_type.to_string(),
                lines: body,
            });
            continue;
        }

        return Err(Error::bundle_format(format!(
            "line {line_no}: unexpected content outside of a file block"
        )));
    }

    match declared_count {
        None => Err(Error::bundle_format("missing !!FILE-COUNT")),
        Some(n) if n != files.len() => Err(Error::bundle_format(format!(
            "!!FILE-COUNT says {n} but the bundle contains {} files",
            files.len()
        ))),
        Some(_) => Ok(files),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::text::TextBundler;

    fn bundle(files: &[(&str, &str)]) -> String {
        let mut b = TextBundler::new();
        for (name, content) in files {
            b.append(name, content);
        }
        b.finish()
    }

    #[test]
    fn round_trips_writer_output() {
        let text = bundle(&[("doc/head.txt", "A\tB\n1\t2"), ("doc/lines.txt", "C")]);
        let files = validate_text_bundle(&text).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "doc/head.txt");
        assert_eq!(files[0].lines, vec!["A\tB".to_string(), "1\t2".to_string()]);
        assert_eq!(files[1].lines, vec!["C".to_string()]);
    }

    #[test]
    fn count_before_blocks_is_accepted() {
        let text = "!!MOCKUP-LOADER-FORMAT 1.0\n\
                    !!FILE-COUNT 1\n\
                    \n!!FILE a.txt text 1\nx\n";
        let files = validate_text_bundle(text).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn bad_header() {
        let err = validate_text_bundle("!!SOMETHING 1.0\n!!FILE-COUNT 0").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn unsupported_version() {
        let err = validate_text_bundle("!!MOCKUP-LOADER-FORMAT 2.0\n!!FILE-COUNT 0").unwrap_err();
        assert!(err.to_string().contains("unsupported format version"));
    }

    #[test]
    fn malformed_file_tag() {
        let text = "!!MOCKUP-LOADER-FORMAT 1.0\n\n!!FILE a.txt text\n\n!!FILE-COUNT 1";
        let err = validate_text_bundle(text).unwrap_err();
        assert!(err.to_string().contains("malformed !!FILE tag"));
    }

    #[test]
    fn count_mismatch() {
        let text = "!!MOCKUP-LOADER-FORMAT 1.0\n\n!!FILE a.txt text 1\nx\n\n!!FILE-COUNT 2";
        let err = validate_text_bundle(text).unwrap_err();
        assert!(err.to_string().contains("contains 1 files"));
    }

    #[test]
    fn absurd_line_count_is_an_error_not_a_panic() {
        let text = format!(
            "!!MOCKUP-LOADER-FORMAT 1.0\n\n!!FILE a.txt text {}\nx\n\n!!FILE-COUNT 1",
            usize::MAX
        );
        let err = validate_text_bundle(&text).unwrap_err();
        assert!(err.to_string().contains("ends early"));
    }

    #[test]
    fn truncated_block() {
        let text = "!!MOCKUP-LOADER-FORMAT 1.0\n\n!!FILE a.txt text 5\nx\n!!FILE-COUNT 1";
        let err = validate_text_bundle(text).unwrap_err();
        assert!(err.to_string().contains("ends early"));
    }

    #[test]
    fn missing_count() {
        let text = "!!MOCKUP-LOADER-FORMAT 1.0\n\n!!FILE a.txt text 1\nx\n";
        let err = validate_text_bundle(text).unwrap_err();
        assert!(err.to_string().contains("missing !!FILE-COUNT"));
    }
}
