//! Asset include manager: mirrors an arbitrary directory tree into the
//! destination, lower-casing each destination path segment and hashing the
//! copied bytes in the same pass.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::hashing::Sha1Writer;

use super::progress::{emit, ProgressEvent, ProgressReceiver, ProgressSender};

#[derive(Debug)]
pub struct IncludeFileManager {
    include_root: PathBuf,
    dest_dir: PathBuf,
    with_hashing: bool,
    /// Relative source path (original case, forward slashes) to hash.
    file_hash_map: BTreeMap<String, Option<String>>,
    /// Source directories that contained at least one copied file.
    include_dirs: BTreeSet<PathBuf>,
    scanned: bool,
    events: Option<ProgressSender>,
}

impl IncludeFileManager {
    pub fn new(include_root: PathBuf, dest_dir: PathBuf, with_hashing: bool) -> Result<Self> {
        if !include_root.exists() {
            return Err(Error::config(format!(
                "include dir does not exist: {}",
                include_root.display()
            )));
        }
        if !dest_dir.exists() {
            return Err(Error::config(format!(
                "destination dir does not exist: {}",
                dest_dir.display()
            )));
        }
        Ok(IncludeFileManager {
            include_root,
            dest_dir,
            with_hashing,
            file_hash_map: BTreeMap::new(),
            include_dirs: BTreeSet::new(),
            scanned: false,
            events: None,
        })
    }

    pub fn subscribe(&mut self) -> ProgressReceiver {
        let (tx, rx) = super::progress::progress_channel();
        self.events = Some(tx);
        rx
    }

    pub fn file_hash_map(&self) -> &BTreeMap<String, Option<String>> {
        &self.file_hash_map
    }

    /// Destination-relative paths of all copied assets (lower-cased).
    pub fn test_object_list(&self) -> Vec<String> {
        self.file_hash_map.keys().map(|k| k.to_lowercase()).collect()
    }

    /// Source directories to register filesystem watches on.
    pub fn src_dirs(&self) -> Vec<PathBuf> {
        self.include_dirs.iter().cloned().collect()
    }

    /// Mirror the whole include tree. Calling this on an already populated
    /// manager is a programmer error.
    pub fn process_all(&mut self) -> Result<()> {
        if self.scanned {
            return Err(Error::usage("cannot process_all twice"));
        }
        self.scanned = true;
        self.copy_dir(&self.include_root.clone(), &self.dest_dir.clone())
    }

    /// Re-include a single file under the include root, overwriting its
    /// previous hash entry.
    pub fn process_one_file(&mut self, filepath: &Path) -> Result<()> {
        let relative = filepath.strip_prefix(&self.include_root).map_err(|_| {
            Error::usage(format!(
                "file path must be under the include root: {}",
                filepath.display()
            ))
        })?;

        let dest_path = self.dest_dir.join(lowercase_path(relative));
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.copy_file(filepath, &dest_path)
    }

    fn copy_dir(&mut self, src_dir: &Path, dest_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dest_dir)?;

        let mut entries: Vec<PathBuf> = std::fs::read_dir(src_dir)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .collect();
        entries.sort();

        for src_path in entries {
            let name = src_path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| Error::source("include entry has no name"))?
                .to_lowercase();
            let dst_path = dest_dir.join(name);
            if src_path.is_dir() {
                self.copy_dir(&src_path, &dst_path)?;
            } else {
                self.copy_file(&src_path, &dst_path)?;
            }
        }
        Ok(())
    }

    fn copy_file(&mut self, src_path: &Path, dst_path: &Path) -> Result<()> {
        let hash = self
            .copy_and_hash(src_path, dst_path)
            .map_err(|e| e.with_path(&src_path.to_path_buf()))?;

        let relative = slash(
            src_path
                .strip_prefix(&self.include_root)
                .unwrap_or(src_path),
        );
        emit(
            &self.events,
            ProgressEvent::AssetCopied {
                name: relative.clone(),
            },
        );
        if let Some(parent) = src_path.parent() {
            self.include_dirs.insert(parent.to_path_buf());
        }
        self.file_hash_map.insert(relative, hash);
        Ok(())
    }

    fn copy_and_hash(&self, src_path: &Path, dst_path: &Path) -> Result<Option<String>> {
        if !self.with_hashing {
            std::fs::copy(src_path, dst_path)?;
            return Ok(None);
        }

        let mut reader = File::open(src_path)?;
        let mut writer = Sha1Writer::new(File::create(dst_path)?);
        std::io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(Some(writer.digest()))
    }
}

/// Lower-case every component of a relative path.
fn lowercase_path(path: &Path) -> PathBuf {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect()
}

/// Normalize separators to forward slashes.
pub(crate) fn slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
