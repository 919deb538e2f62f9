//! Configuration: a JSON config file merged with command-line overrides.
//!
//! Unknown keys in the file are rejected. Relative paths from the file are
//! resolved against the file's directory; paths given on the command line
//! stay relative to the process working directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::bundle::BundleFormat;
use crate::error::{Error, Result};
use crate::excel::Eol;

pub const DEFAULT_CONFIG_FILE: &str = ".mock-config.json";
pub const DEFAULT_SOURCE_PATTERN: &str = "*.xlsx";
pub const DEFAULT_SKIP_PREFIX: &str = "-";

/// Raw shape of the config file. Every field is optional; defaults are
/// resolved once in [`Config::load`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ConfigFile {
    source_dir: Option<String>,
    dest_dir: Option<String>,
    includes: Vec<String>,
    bundle_path: Option<String>,
    no_bundle: Option<bool>,
    eol: Option<Eol>,
    bundle_format: Option<BundleFormat>,
    quiet: Option<bool>,
    with_meta: Option<bool>,
    clean_dest_dir_on_start: Option<bool>,
    skip_fields_starting_with: Option<String>,
    source_pattern: Option<String>,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub source_dir: Option<PathBuf>,
    pub dest_dir: Option<PathBuf>,
    pub include_dir: Option<PathBuf>,
    pub bundle_path: Option<PathBuf>,
    pub no_bundle: bool,
    pub eol: Option<Eol>,
    pub bundle_format: Option<BundleFormat>,
    pub quiet: bool,
    pub with_meta: bool,
    pub clean_dest: bool,
    pub watch: bool,
}

/// Fully resolved configuration the pipeline runs on.
#[derive(Debug, Clone)]
pub struct Config {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub include_dir: Option<PathBuf>,
    pub bundle_path: Option<PathBuf>,
    pub no_bundle: bool,
    pub eol: Eol,
    pub bundle_format: BundleFormat,
    pub quiet: bool,
    pub with_meta: bool,
    pub clean_dest_dir_on_start: bool,
    pub skip_fields_starting_with: String,
    pub source_pattern: String,
    pub watch: bool,
}

impl Config {
    /// Load the config file (explicit path, or the default name if present)
    /// and merge the command-line overrides on top.
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Config> {
        let (file, base_dir) = match config_path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("cannot read config {}: {e}", path.display()))
                })?;
                (parse_config(&text, path)?, parent_dir(path))
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    let text = std::fs::read_to_string(&path).map_err(|e| {
                        Error::config(format!("cannot read config {}: {e}", path.display()))
                    })?;
                    (parse_config(&text, &path)?, parent_dir(&path))
                } else {
                    (ConfigFile::default(), PathBuf::new())
                }
            }
        };

        Config::merge(file, base_dir, overrides)
    }

    fn merge(file: ConfigFile, base_dir: PathBuf, ov: Overrides) -> Result<Config> {
        if file.includes.len() > 1 {
            return Err(Error::config(
                "only one include directory is supported",
            ));
        }

        let source_dir = ov
            .source_dir
            .or_else(|| file.source_dir.as_ref().map(|p| resolve(&base_dir, p)))
            .ok_or_else(|| Error::config("sourceDir is required"))?;
        let dest_dir = ov
            .dest_dir
            .or_else(|| file.dest_dir.as_ref().map(|p| resolve(&base_dir, p)))
            .ok_or_else(|| Error::config("destDir is required"))?;
        let include_dir = ov
            .include_dir
            .or_else(|| file.includes.first().map(|p| resolve(&base_dir, p)));
        let bundle_path = ov
            .bundle_path
            .or_else(|| file.bundle_path.as_ref().map(|p| resolve(&base_dir, p)));

        Ok(Config {
            source_dir,
            dest_dir,
            include_dir,
            bundle_path,
            no_bundle: ov.no_bundle || file.no_bundle.unwrap_or(false),
            eol: ov.eol.or(file.eol).unwrap_or_default(),
            bundle_format: ov.bundle_format.or(file.bundle_format).unwrap_or_default(),
            quiet: ov.quiet || file.quiet.unwrap_or(false),
            with_meta: ov.with_meta || file.with_meta.unwrap_or(false),
            clean_dest_dir_on_start: ov.clean_dest || file.clean_dest_dir_on_start.unwrap_or(false),
            skip_fields_starting_with: file
                .skip_fields_starting_with
                .unwrap_or_else(|| DEFAULT_SKIP_PREFIX.to_string()),
            source_pattern: file
                .source_pattern
                .unwrap_or_else(|| DEFAULT_SOURCE_PATTERN.to_string()),
            watch: ov.watch,
        })
    }
}

fn parse_config(text: &str, path: &Path) -> Result<ConfigFile> {
    serde_json::from_str(text)
        .map_err(|e| Error::config(format!("invalid config {}: {e}", path.display())))
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default()
}

fn resolve(base: &Path, p: &str) -> PathBuf {
    let p = Path::new(p);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
