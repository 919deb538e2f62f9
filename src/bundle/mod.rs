//! Bundle assembly: packs the generated artifacts into a single
//! deliverable in one of three container formats.

pub mod text;
pub mod validator;
pub mod zip;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub use self::text::{build_text_bundle, TextBundler, FORMAT_HEADER, FORMAT_VERSION};
pub use self::validator::{validate_text_bundle, BundleFile};
pub use self::zip::{build_text_zip_bundle, build_zip_bundle, TEXT_ZIP_ENTRY};

/// Container format for the final bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleFormat {
    #[default]
    Zip,
    Text,
    #[serde(rename = "text+zip")]
    TextZip,
}

impl std::str::FromStr for BundleFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "zip" => Ok(BundleFormat::Zip),
            "text" => Ok(BundleFormat::Text),
            "text+zip" => Ok(BundleFormat::TextZip),
            other => Err(Error::config(format!(
                "bundle format must be \"zip\", \"text\" or \"text+zip\", got \"{other}\""
            ))),
        }
    }
}

pub struct Bundler {
    source_dir: PathBuf,
    bundle_path: PathBuf,
    format: BundleFormat,
}

impl Bundler {
    pub fn new(source_dir: PathBuf, bundle_path: PathBuf, format: BundleFormat) -> Self {
        Bundler {
            source_dir,
            bundle_path,
            format,
        }
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }

    /// Pack the named artifacts (paths relative to the source dir) into the
    /// bundle file, replacing any previous bundle. Returns the bundle size
    /// in bytes.
    pub fn bundle(&self, names: &[String]) -> Result<u64> {
        if names.is_empty() {
            return Err(Error::usage("nothing to bundle"));
        }
        let mut names: Vec<String> = names.to_vec();
        names.sort();
        names.dedup();

        // Drop the stale bundle first so a failed build cannot leave the
        // previous one looking current.
        if self.bundle_path.exists() {
            std::fs::remove_file(&self.bundle_path)?;
        }

        let bytes = match self.format {
            BundleFormat::Zip => build_zip_bundle(&self.source_dir, &names)?,
            BundleFormat::Text => build_text_bundle(&self.source_dir, &names)?.into_bytes(),
            BundleFormat::TextZip => {
                let text = build_text_bundle(&self.source_dir, &names)?;
                build_text_zip_bundle(&text)?
            }
        };

        if let Some(parent) = self.bundle_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.bundle_path, &bytes)?;
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_list_is_an_error() {
        let b = Bundler::new(
            std::env::temp_dir(),
            std::env::temp_dir().join("bundle.zip"),
            BundleFormat::Zip,
        );
        let err = b.bundle(&[]).unwrap_err();
        assert!(err.to_string().contains("nothing to bundle"));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("zip".parse::<BundleFormat>().unwrap(), BundleFormat::Zip);
        assert_eq!("TEXT".parse::<BundleFormat>().unwrap(), BundleFormat::Text);
        assert_eq!(
            "text+zip".parse::<BundleFormat>().unwrap(),
            BundleFormat::TextZip
        );
        assert!("tar".parse::<BundleFormat>().is_err());
    }
}
