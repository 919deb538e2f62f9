//! Zip bundle writers, built into an in-memory buffer so the bundle file
//! is replaced in one write.

use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};

/// Entry name used when the text container is shipped inside a zip.
pub const TEXT_ZIP_ENTRY: &str = "bundle.txt";

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Pack each named file from `source_dir` as its own zip entry.
pub fn build_zip_bundle(source_dir: &Path, names: &[String]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for name in names {
        let bytes = std::fs::read(source_dir.join(name))
            .map_err(|e| Error::from(e).with_file(name.clone()))?;
        writer
            .start_file(name.as_str(), entry_options())
            .map_err(|e| Error::bundle(e.to_string()).with_file(name.clone()))?;
        writer.write_all(&bytes)?;
    }
    let cursor = writer
        .finish()
        .map_err(|e| Error::bundle(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Wrap an already built text container in a single-entry zip.
pub fn build_text_zip_bundle(text: &str) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(TEXT_ZIP_ENTRY, entry_options())
        .map_err(|e| Error::bundle(e.to_string()))?;
    writer.write_all(text.as_bytes())?;
    let cursor = writer
        .finish()
        .map_err(|e| Error::bundle(e.to_string()))?;
    Ok(cursor.into_inner())
}
