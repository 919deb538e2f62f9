//! Source workbook manager: scans the source directory, turns each workbook
//! into mock artifacts and tracks content hashes for the manifest.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::{Error, Result};
use crate::excel::{canonicalize, decode_workbook, extract_workbook, Eol, Mock};
use crate::hashing::sha1_hex;

use super::progress::{emit, ProgressEvent, ProgressReceiver, ProgressSender};

/// Construction parameters for [`ExcelFileManager`].
#[derive(Debug, Clone)]
pub struct ExcelManagerOptions {
    pub src_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub with_hashing: bool,
    pub eol: Eol,
    pub skip_fields_starting_with: String,
    pub source_pattern: String,
}

#[derive(Debug)]
pub struct ExcelFileManager {
    src_dir: PathBuf,
    dest_dir: PathBuf,
    with_hashing: bool,
    eol: Eol,
    skip_prefix: String,
    pattern: Pattern,
    file_hash_map: BTreeMap<String, Option<String>>,
    mock_hash_map: BTreeMap<String, Option<String>>,
    mock_list: BTreeSet<String>,
    scanned: bool,
    events: Option<ProgressSender>,
}

impl ExcelFileManager {
    pub fn new(opts: ExcelManagerOptions) -> Result<Self> {
        if !opts.src_dir.exists() {
            return Err(Error::config(format!(
                "source dir does not exist: {}",
                opts.src_dir.display()
            )));
        }
        if !opts.dest_dir.exists() {
            return Err(Error::config(format!(
                "destination dir does not exist: {}",
                opts.dest_dir.display()
            )));
        }
        let pattern = Pattern::new(&opts.source_pattern).map_err(|e| {
            Error::config(format!(
                "invalid source pattern \"{}\": {e}",
                opts.source_pattern
            ))
        })?;

        Ok(ExcelFileManager {
            src_dir: opts.src_dir,
            dest_dir: opts.dest_dir,
            with_hashing: opts.with_hashing,
            eol: opts.eol,
            skip_prefix: opts.skip_fields_starting_with,
            pattern,
            file_hash_map: BTreeMap::new(),
            mock_hash_map: BTreeMap::new(),
            mock_list: BTreeSet::new(),
            scanned: false,
            events: None,
        })
    }

    /// Subscribe to progress events. Only one subscriber is supported; a
    /// later call replaces the earlier receiver.
    pub fn subscribe(&mut self) -> ProgressReceiver {
        let (tx, rx) = super::progress::progress_channel();
        self.events = Some(tx);
        rx
    }

    pub fn file_hash_map(&self) -> &BTreeMap<String, Option<String>> {
        &self.file_hash_map
    }

    pub fn mock_hash_map(&self) -> &BTreeMap<String, Option<String>> {
        &self.mock_hash_map
    }

    /// Relative paths of all produced mock artifacts.
    pub fn test_object_list(&self) -> Vec<String> {
        self.mock_list.iter().cloned().collect()
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// Whether a directory entry name qualifies as a source workbook.
    pub fn matches_source(&self, file_name: &str) -> bool {
        !file_name.starts_with('~') && self.pattern.matches(file_name)
    }

    /// Process every workbook in the source directory, strictly one file at
    /// a time so progress events stay grouped per file. Entries are taken
    /// in name order for determinism. Calling this on an already populated
    /// manager is a programmer error.
    pub async fn process_all(&mut self) -> Result<()> {
        if self.scanned {
            return Err(Error::usage("cannot process_all twice"));
        }
        self.scanned = true;

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.src_dir)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| self.matches_source(n))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        for file in files {
            self.process_one_file(&file).await?;
        }
        Ok(())
    }

    /// Process a single workbook: read, hash, decode, extract, write one
    /// artifact per selected sheet. Sheets are written concurrently; the
    /// hash maps are updated only after every sheet succeeded.
    pub async fn process_one_file(&mut self, filepath: &Path) -> Result<()> {
        if filepath.parent() != Some(self.src_dir.as_path()) {
            return Err(Error::usage(format!(
                "cannot process files from another directory: {}",
                filepath.display()
            )));
        }

        let stem = filepath
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::source("source file has no name"))?
            .to_string();
        let base_name = filepath
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(&stem)
            .to_string();

        emit(
            &self.events,
            ProgressEvent::FileStarted {
                name: base_name.clone(),
            },
        );

        match self.process_file_inner(filepath, &stem).await {
            Ok((file_hash, mocks)) => {
                for (rel_path, mock_hash) in mocks {
                    self.mock_list.insert(rel_path.clone());
                    self.mock_hash_map.insert(rel_path, mock_hash);
                }
                self.file_hash_map.insert(base_name, file_hash);
                Ok(())
            }
            Err(err) => Err(err.with_file(stem)),
        }
    }

    async fn process_file_inner(
        &self,
        filepath: &Path,
        stem: &str,
    ) -> Result<(Option<String>, Vec<(String, Option<String>)>)> {
        let blob = tokio::fs::read(filepath).await?;
        let file_hash = self.with_hashing.then(|| sha1_hex(&blob));

        let workbook = decode_workbook(&blob)?;
        let parsed = extract_workbook(&workbook)?;

        let target_dir_name = stem.to_lowercase();
        tokio::fs::create_dir_all(self.dest_dir.join(&target_dir_name)).await?;

        let writes = parsed.iter().map(|(sheet_name, rows)| {
            self.write_one_mock(&target_dir_name, sheet_name, rows)
        });
        let mocks = futures::future::try_join_all(writes).await?;
        Ok((file_hash, mocks))
    }

    async fn write_one_mock(
        &self,
        target_dir_name: &str,
        sheet_name: &str,
        rows: &crate::excel::SheetRows,
    ) -> Result<(String, Option<String>)> {
        let mock: Mock = canonicalize(rows, self.eol, &self.skip_prefix)
            .map_err(|e| e.with_sheet(sheet_name))?;

        let mock_filename = format!("{sheet_name}.txt");
        let mock_path = self.dest_dir.join(target_dir_name).join(&mock_filename);
        tokio::fs::write(&mock_path, mock.data.as_bytes())
            .await
            .map_err(|e| Error::from(e).with_sheet(sheet_name))?;

        let mock_hash = self.with_hashing.then(|| sha1_hex(mock.data.as_bytes()));

        emit(
            &self.events,
            ProgressEvent::MockWritten {
                name: mock_filename.clone(),
                row_count: mock.row_count,
            },
        );

        Ok((format!("{target_dir_name}/{mock_filename}"), mock_hash))
    }
}
